//! Selection context: the (client, project) pair every other slice hangs off.
//!
//! Changes are atomic replacements. Every change bumps a generation counter so
//! that asynchronous work started for an earlier selection can detect that it
//! is stale when it resolves.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationFailure;
use crate::ids::{ClientId, ProjectId};

/// Campaign flight window (active date range set at provisioning time).
/// 活动投放周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FlightWindow {
    /// Builds a window, rejecting `end <= start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationFailure> {
        if end <= start {
            return Err(ValidationFailure::InvalidFlightWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a window from optional bounds; `None` unless both are set and ordered.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end).ok(),
            _ => None,
        }
    }
}

/// A fully-set (client, project) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectPair {
    pub client: ClientId,
    pub project: ProjectId,
}

impl ProjectPair {
    pub fn new(client: impl Into<ClientId>, project: impl Into<ProjectId>) -> Self {
        Self {
            client: client.into(),
            project: project.into(),
        }
    }
}

impl std::fmt::Display for ProjectPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.client, self.project)
    }
}

/// Identity of a selection at a point in time.
///
/// Captured before a remote call and compared against the live context when
/// the call resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub generation: u64,
    pub pair: Option<ProjectPair>,
    pub flight: Option<FlightWindow>,
}

/// Current client/project selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    client: Option<ClientId>,
    project: Option<ProjectId>,
    flight: Option<FlightWindow>,
    generation: u64,
    last_synced: Option<DateTime<Utc>>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> Option<&ClientId> {
        self.client.as_ref()
    }

    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    pub fn flight(&self) -> Option<FlightWindow> {
        self.flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_synced
    }

    /// Returns the pair only when both halves are set.
    pub fn pair(&self) -> Option<ProjectPair> {
        match (&self.client, &self.project) {
            (Some(client), Some(project)) => Some(ProjectPair {
                client: client.clone(),
                project: project.clone(),
            }),
            _ => None,
        }
    }

    pub fn has_full_selection(&self) -> bool {
        self.client.is_some() && self.project.is_some()
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            generation: self.generation,
            pair: self.pair(),
            flight: self.flight,
        }
    }

    /// True when `snapshot` still describes the live selection.
    pub fn is_current(&self, snapshot: &SelectionSnapshot) -> bool {
        self.generation == snapshot.generation && self.pair() == snapshot.pair
    }

    /// Selects a client. The project and flight window are always cleared.
    pub fn select_client(&mut self, client: ClientId) -> SelectionSnapshot {
        self.client = Some(client);
        self.project = None;
        self.flight = None;
        self.last_synced = None;
        self.generation += 1;
        self.snapshot()
    }

    /// Selects a project under the current client.
    pub fn select_project(
        &mut self,
        project: ProjectId,
        flight: Option<FlightWindow>,
        synced_at: DateTime<Utc>,
    ) -> Result<SelectionSnapshot, ValidationFailure> {
        if self.client.is_none() {
            return Err(ValidationFailure::NoClientSelected);
        }
        self.project = Some(project);
        self.flight = flight;
        self.last_synced = Some(synced_at);
        self.generation += 1;
        Ok(self.snapshot())
    }

    /// Replaces client and project in one step (used after provisioning).
    pub fn replace(
        &mut self,
        pair: ProjectPair,
        flight: Option<FlightWindow>,
        synced_at: DateTime<Utc>,
    ) -> SelectionSnapshot {
        self.client = Some(pair.client);
        self.project = Some(pair.project);
        self.flight = flight;
        self.last_synced = Some(synced_at);
        self.generation += 1;
        self.snapshot()
    }

    pub fn clear(&mut self) -> SelectionSnapshot {
        self.client = None;
        self.project = None;
        self.flight = None;
        self.last_synced = None;
        self.generation += 1;
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn selecting_client_clears_project_and_bumps_generation() {
        let mut ctx = SelectionContext::new();
        ctx.select_client("acme".into());
        let flight = FlightWindow::new(date(2024, 12, 1), date(2024, 12, 31)).unwrap();
        ctx.select_project("0007".into(), Some(flight), Utc::now())
            .unwrap();
        let before = ctx.generation();

        ctx.select_client("globex".into());

        assert!(ctx.project().is_none());
        assert!(ctx.flight().is_none());
        assert!(ctx.pair().is_none());
        assert_eq!(ctx.generation(), before + 1);
    }

    #[test]
    fn selecting_project_without_client_is_rejected() {
        let mut ctx = SelectionContext::new();
        let err = ctx
            .select_project("0007".into(), None, Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationFailure::NoClientSelected);
    }

    #[test]
    fn snapshot_goes_stale_after_any_change() {
        let mut ctx = SelectionContext::new();
        ctx.select_client("acme".into());
        let snap = ctx
            .select_project("0007".into(), None, Utc::now())
            .unwrap();
        assert!(ctx.is_current(&snap));

        ctx.select_project("0008".into(), None, Utc::now()).unwrap();
        assert!(!ctx.is_current(&snap));
    }

    #[test]
    fn reselecting_same_pair_still_invalidates_old_snapshot() {
        let mut ctx = SelectionContext::new();
        ctx.select_client("acme".into());
        let first = ctx.select_project("0007".into(), None, Utc::now()).unwrap();
        let second = ctx.select_project("0007".into(), None, Utc::now()).unwrap();
        assert_eq!(first.pair, second.pair);
        assert!(!ctx.is_current(&first));
        assert!(ctx.is_current(&second));
    }

    #[test]
    fn flight_window_requires_end_after_start() {
        assert!(FlightWindow::new(date(2024, 12, 31), date(2024, 12, 1)).is_err());
        assert!(FlightWindow::new(date(2024, 12, 1), date(2024, 12, 1)).is_err());
        assert!(FlightWindow::from_bounds(Some(date(2024, 12, 1)), None).is_none());
    }
}
