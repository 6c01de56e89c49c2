//! Command handlers: each one drives the console through a workflow and
//! prints the result.

use std::collections::BTreeSet;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{info, warn};

use sc_app::api::UploadChannel;
use sc_app::usecases::{PollOutcome, ReconcileOutcome};
use sc_app::ContestConsole;
use sc_core::provisioning::{ClientTarget, ProvisioningRequest};
use sc_core::regions::parse_regions;
use sc_core::rules::PrizeStructure;
use sc_core::{
    ClientId, ContestRulesDraft, ProcessingStatus, ProjectId, RulesMode, WinnerRule, WinnerRuleId,
};

use crate::cli::{
    Command, KeywordAction, OutputFormat, ReceiptsAction, RulesAction, RulesEdits, Target,
    WinnersAction,
};

/// Writes command results to stdout.
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(value).context("Failed to encode output")?
                );
            }
            OutputFormat::Text => println!("{}", text()),
        }
        Ok(())
    }
}

pub async fn run(console: &ContestConsole, command: Command, out: &Printer) -> anyhow::Result<()> {
    match command {
        Command::Health => {
            let health = console.health().await?;
            out.emit(&health, || {
                let mark = if health.is_healthy() { "healthy" } else { "unhealthy" };
                format!("backend {mark} ({})", health.status)
            })
        }

        Command::Clients => {
            let clients = console.load_clients().await?;
            out.emit(&clients, || {
                clients
                    .iter()
                    .map(|c| c.name.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }

        Command::Projects { client } => {
            let projects = console.select_client(ClientId::new(client)).await?;
            out.emit(&projects, || {
                projects
                    .iter()
                    .map(|p| match p.flight() {
                        Some(f) => format!("{}  {} .. {}", p.name, f.start, f.end),
                        None => p.name.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }

        Command::Rules { action } => rules(console, action, out).await,

        Command::Process { target, kind } => {
            select(console, &target).await?;
            let trigger = console.trigger_processing(kind.into()).await?;
            out.emit(&trigger, || match &trigger.download_url {
                Some(url) => format!("preview ready: {url}"),
                None => trigger
                    .message
                    .clone()
                    .unwrap_or_else(|| "processing started".to_string()),
            })
        }

        Command::Status { target, watch } => {
            select(console, &target).await?;
            let status = if watch {
                match console.watch_processing().await?.await? {
                    PollOutcome::Done(status) => status,
                    PollOutcome::Failed(err) => return Err(err.into()),
                    PollOutcome::Cancelled => bail!("status watch cancelled"),
                    PollOutcome::TimedOut { attempts } => {
                        bail!("status watch gave up after {attempts} attempts")
                    }
                }
            } else {
                console.refresh_status().await?
            };
            let gate = console.can_select_winners().await;
            out.emit(&status, || describe_status(status.as_ref(), gate))
        }

        Command::Files { target } => {
            select(console, &target).await?;
            let files = console.load_validated_files().await?;
            out.emit(&files, || {
                files
                    .iter()
                    .map(|f| match f.size {
                        Some(size) => format!("{}  {size} bytes", f.key),
                        None => f.key.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }

        Command::Winners { action } => winners(console, action, out).await,

        Command::Keyword { action } => match action {
            KeywordAction::Get { target } => {
                select(console, &target).await?;
                let keyword = console.receipt_keyword().await;
                out.emit(&keyword, || {
                    keyword
                        .clone()
                        .unwrap_or_else(|| "(no keyword set)".to_string())
                })
            }
            KeywordAction::Set { target, keyword } => {
                select(console, &target).await?;
                let saved = console.save_receipt_keyword(&keyword).await?;
                out.emit(&saved, || format!("keyword saved: {saved}"))
            }
        },

        Command::Receipts {
            action: ReceiptsAction::Upload {
                target,
                file,
                partner,
            },
        } => {
            select(console, &target).await?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .with_context(|| format!("Invalid file path: {}", file.display()))?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let channel = if partner {
                UploadChannel::Partner
            } else {
                UploadChannel::Standard
            };
            info!(file = %file_name, size = bytes.len(), "uploading receipts");
            let summary = console.upload_receipts(channel, &file_name, bytes).await?;
            out.emit(&summary, || {
                format!(
                    "{} receipts: {} confirmed, {} unconfirmed, {} errors ({})",
                    summary.total_receipts,
                    summary.confirmed,
                    summary.unconfirmed,
                    summary.errors,
                    summary.confirmation_rate
                )
            })
        }

        Command::Provision(args) => {
            let client = match (args.new_client, args.client) {
                (Some(name), _) => ClientTarget::New { name },
                (None, Some(id)) => ClientTarget::Existing {
                    id: ClientId::new(id),
                },
                (None, None) => bail!("either --new-client or --client is required"),
            };
            let record = console
                .provision(ProvisioningRequest {
                    client,
                    project: args.project,
                    flight_start: Some(args.flight_start),
                    flight_end: Some(args.flight_end),
                })
                .await?;
            let pair = record.pair();
            let rules = console.rules_mode().await;
            out.emit(&pair, || {
                let created = if record.created_client {
                    "client and project"
                } else {
                    "project"
                };
                format!(
                    "created {created} {pair} ({} .. {}); rules: {}",
                    record.flight.start,
                    record.flight.end,
                    describe_mode(&rules)
                )
            })
        }

        Command::Analytics { target, refresh } => {
            select(console, &target).await?;
            let analytics = if refresh {
                console.refresh_analytics().await?
            } else {
                console.analytics().await?
            };
            out.emit(&analytics, || match &analytics {
                None => "no analytics yet".to_string(),
                Some(a) => {
                    let mut lines: Vec<String> = a
                        .metrics
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .collect();
                    if let Some(at) = a.last_updated {
                        lines.push(format!("last updated: {at}"));
                    }
                    lines.join("\n")
                }
            })
        }
    }
}

/// Selects `target` and waits for its rules to reconcile.
async fn select(console: &ContestConsole, target: &Target) -> anyhow::Result<ReconcileOutcome> {
    let projects = console
        .select_client(ClientId::new(target.client.clone()))
        .await?;
    let project = ProjectId::new(target.project.clone());
    if !projects.iter().any(|p| p.name == project) {
        warn!(client = %target.client, project = %project, "project not in catalog");
    }
    let outcome = console.select_project(project).await?;
    if let ReconcileOutcome::Editing {
        warning: Some(warning),
    } = &outcome
    {
        warn!(%warning, "rules reconciliation degraded");
    }
    Ok(outcome)
}

async fn rules(console: &ContestConsole, action: RulesAction, out: &Printer) -> anyhow::Result<()> {
    match action {
        RulesAction::Show { target } => {
            select(console, &target).await?;
            let mode = console.rules_mode().await;
            let flight = console.selection().await.flight;
            let payload = mode.current_rules().map(|r| r.to_submission(flight));
            out.emit(&payload, || match mode.current_rules() {
                Some(rules) => format!("{}\n{}", describe_mode(&mode), describe_rules(rules)),
                None => describe_mode(&mode),
            })
        }
        RulesAction::Submit { target, edits } => {
            select(console, &target).await?;
            if console.rules_mode().await.is_saved() {
                if edits.is_empty() {
                    bail!("rules are already saved; pass at least one field to change");
                }
                console.begin_edit().await?;
            }
            let regions = match &edits.regions {
                Some(codes) => Some(parse_regions(codes.iter().map(String::as_str))?),
                None => None,
            };
            console.edit_rules(|draft| apply_edits(draft, &edits, regions)).await?;
            let saved = console.submit_rules().await?;
            let flight = console.selection().await.flight;
            out.emit(&saved.to_submission(flight), || {
                format!("rules saved\n{}", describe_rules(&saved))
            })
        }
        RulesAction::Delete { target } => {
            select(console, &target).await?;
            console.delete_rules().await?;
            out.emit(&serde_json::json!({"deleted": true}), || "rules deleted".to_string())
        }
    }
}

async fn winners(console: &ContestConsole, action: WinnersAction, out: &Printer) -> anyhow::Result<()> {
    match action {
        WinnersAction::List { target } => {
            select(console, &target).await?;
            let winners = console.load_winners().await?;
            out.emit(&winners, || {
                if winners.is_empty() {
                    return "no winners selected yet".to_string();
                }
                winners
                    .iter()
                    .map(|w| format!("#{} {} {} <{}>", w.rank, w.first_name, w.last_name, w.email))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        WinnersAction::Select { target, count } => {
            select(console, &target).await?;
            console.refresh_status().await?;
            let reload = console.select_winners(count).await?;
            let winners = reload.winners.unwrap_or_default();
            out.emit(&winners, || format!("{} winners selected", winners.len()))
        }
        WinnersAction::Export { target } => {
            select(console, &target).await?;
            let export = console.export_winners().await?;
            out.emit(&export, || export.download_url.clone())
        }
    }
}

fn apply_edits(
    draft: &ContestRulesDraft,
    edits: &RulesEdits,
    regions: Option<BTreeSet<sc_core::RegionCode>>,
) -> ContestRulesDraft {
    let mut next = draft.clone();
    if edits.age_min.is_some() || edits.age_max.is_some() {
        next = next.with_age_range(
            edits.age_min.unwrap_or(next.age_min()),
            edits.age_max.unwrap_or(next.age_max()),
        );
    }
    if let Some(regions) = regions {
        next = next.with_regions(regions);
    }
    if edits.entry_start.is_some() || edits.entry_end.is_some() {
        let current = next.entry_window();
        next = next.with_entry_window(
            edits.entry_start.or(current.start),
            edits.entry_end.or(current.end),
        );
    }
    if let Some(max) = edits.max_entries {
        next = next.with_max_entries_per_person(max);
    }
    if let Some(total) = edits.total_winners {
        next = next.with_total_winners(total);
    }
    if !edits.winner_rules.is_empty() {
        next = next.with_winner_rules(
            edits
                .winner_rules
                .iter()
                .map(|(count, period)| WinnerRule {
                    id: WinnerRuleId::generate(),
                    count: *count,
                    period: *period,
                })
                .collect(),
        );
    }
    if edits.grand_prize.is_some() || !edits.runner_ups.is_empty() {
        let current = next.prize_structure().clone();
        next = next.with_prize_structure(PrizeStructure {
            grand_prize: edits.grand_prize.clone().unwrap_or(current.grand_prize),
            runner_ups: if edits.runner_ups.is_empty() {
                current.runner_ups
            } else {
                edits.runner_ups.clone()
            },
        });
    }
    next
}

fn describe_mode(mode: &RulesMode) -> String {
    match mode {
        RulesMode::Unselected => "no project selected".to_string(),
        RulesMode::Reconciling { pair } => format!("{pair}: checking for saved rules"),
        RulesMode::Saved { pair, .. } => format!("{pair}: saved rules"),
        RulesMode::Editing {
            pair,
            warning: Some(w),
            ..
        } => format!("{pair}: default template ({w})"),
        RulesMode::Editing { pair, .. } => format!("{pair}: unsaved draft"),
    }
}

fn describe_rules(rules: &ContestRulesDraft) -> String {
    let window = rules.entry_window();
    let fmt_date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
    let regions: Vec<_> = rules.eligible_states().iter().map(|r| r.as_str()).collect();
    let timezones: Vec<_> = rules.timezones().iter().map(|t| t.as_str()).collect();
    let winner_rules: Vec<_> = rules
        .winner_rules()
        .iter()
        .map(|r| format!("{} per {:?}", r.count, r.period).to_lowercase())
        .collect();
    format!(
        "age: {}-{}\nentry window: {} .. {}\nregions ({}): {}\ntimezones: {}\nmax entries/person: {}\ntotal winners: {}\nwinner rules: {}",
        rules.age_min(),
        rules.age_max(),
        fmt_date(window.start),
        fmt_date(window.end),
        regions.len(),
        regions.join(","),
        timezones.join(", "),
        rules.max_entries_per_person(),
        rules.total_winners(),
        winner_rules.join("; "),
    )
}

fn describe_status(status: Option<&ProcessingStatus>, gate_open: bool) -> String {
    let Some(status) = status else {
        return "not processed yet".to_string();
    };
    let mut lines = vec![
        format!("state: {:?}", status.state).to_lowercase(),
        format!("eligible contestants: {}", status.eligible_contestants),
    ];
    if let Some(stats) = &status.filter_statistics {
        lines.extend(stats.iter().map(|(k, v)| format!("  {k}: {v}")));
    }
    if let Some(message) = &status.message {
        lines.push(format!("message: {message}"));
    }
    lines.push(format!(
        "winner selection: {}",
        if gate_open { "available" } else { "not available" }
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sc_core::{ProcessingState, TimeZoneLabel, WinnerPeriod};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn edits_only_touch_given_fields() {
        let template = ContestRulesDraft::default_template(None);
        let edits = RulesEdits {
            regions: Some(vec!["CA".into(), "NY".into()]),
            winner_rules: vec![(2, WinnerPeriod::Day)],
            total_winners: Some(10),
            entry_end: Some(date(2024, 12, 20)),
            ..RulesEdits::default()
        };
        let regions = parse_regions(["CA", "NY"]).unwrap();

        let next = apply_edits(&template, &edits, Some(regions));

        assert_eq!(next.age_min(), template.age_min());
        assert_eq!(next.total_winners(), 10);
        assert_eq!(next.winner_rules().len(), 1);
        assert_eq!(next.winner_rules()[0].count, 2);
        assert_eq!(next.entry_window().end, Some(date(2024, 12, 20)));
        assert_eq!(
            next.timezones(),
            BTreeSet::from([TimeZoneLabel::Pacific, TimeZoneLabel::Eastern])
        );
    }

    #[test]
    fn status_text_reports_gate() {
        let status = ProcessingStatus {
            state: ProcessingState::Completed,
            eligible_contestants: 4,
            filter_statistics: None,
            message: None,
        };
        let text = describe_status(Some(&status), true);
        assert!(text.contains("state: completed"));
        assert!(text.contains("winner selection: available"));
        assert_eq!(describe_status(None, false), "not processed yet");
    }
}
