//! Client and project catalog.
//!
//! Entries synthesized locally after provisioning are tagged `Optimistic` and
//! survive refreshes until the backend lists an entry with the same name.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClientId, ProjectId};
use crate::selection::FlightWindow;
use crate::wire_dates::{lenient_date, lenient_optional_timestamp};

/// Where a catalog entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Remote,
    Optimistic,
}

/// A client (storage bucket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBucket {
    #[serde(alias = "bucket_name", alias = "Name")]
    pub name: ClientId,
    #[serde(
        default,
        alias = "creation_date",
        alias = "CreationDate",
        deserialize_with = "lenient_optional_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip, default = "remote")]
    pub provenance: Provenance,
}

/// A project under a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(alias = "project_name", alias = "project_id")]
    pub name: ProjectId,
    #[serde(default, deserialize_with = "lenient_date")]
    pub flight_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub flight_end_date: Option<NaiveDate>,
    #[serde(
        default,
        alias = "creation_date",
        deserialize_with = "lenient_optional_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip, default = "remote")]
    pub provenance: Provenance,
}

fn remote() -> Provenance {
    Provenance::Remote
}

impl ClientBucket {
    pub fn optimistic(name: ClientId, created_at: DateTime<Utc>) -> Self {
        Self {
            name,
            created_at: Some(created_at),
            provenance: Provenance::Optimistic,
        }
    }
}

impl ProjectEntry {
    pub fn optimistic(name: ProjectId, flight: FlightWindow, created_at: DateTime<Utc>) -> Self {
        Self {
            name,
            flight_start_date: Some(flight.start),
            flight_end_date: Some(flight.end),
            created_at: Some(created_at),
            provenance: Provenance::Optimistic,
        }
    }

    pub fn flight(&self) -> Option<FlightWindow> {
        FlightWindow::from_bounds(self.flight_start_date, self.flight_end_date)
    }
}

trait Named {
    fn key(&self) -> &str;
    fn provenance(&self) -> Provenance;
}

impl Named for ClientBucket {
    fn key(&self) -> &str {
        self.name.as_str()
    }
    fn provenance(&self) -> Provenance {
        self.provenance
    }
}

impl Named for ProjectEntry {
    fn key(&self) -> &str {
        self.name.as_str()
    }
    fn provenance(&self) -> Provenance {
        self.provenance
    }
}

/// Remote entries win; optimistic entries not yet listed remotely are kept.
fn merge_by_name<T: Named + Clone>(current: &[T], incoming: Vec<T>) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(incoming.len() + current.len());
    for entry in incoming {
        if !merged.iter().any(|m| m.key() == entry.key()) {
            merged.push(entry);
        }
    }
    for pending in current
        .iter()
        .filter(|e| e.provenance() == Provenance::Optimistic)
    {
        if !merged.iter().any(|m| m.key() == pending.key()) {
            merged.push(pending.clone());
        }
    }
    merged
}

/// Insert or replace by name.
fn upsert<T: Named>(entries: &mut Vec<T>, entry: T) {
    match entries.iter_mut().find(|e| e.key() == entry.key()) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

/// Cached catalog for the session.
///
/// 客户端/项目目录缓存
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    clients: Vec<ClientBucket>,
    /// Projects of the currently selected client only.
    projects: Vec<ProjectEntry>,
    projects_owner: Option<ClientId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clients(&self) -> &[ClientBucket] {
        &self.clients
    }

    pub fn projects(&self) -> &[ProjectEntry] {
        &self.projects
    }

    pub fn projects_owner(&self) -> Option<&ClientId> {
        self.projects_owner.as_ref()
    }

    pub fn find_project(&self, project: &ProjectId) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| &p.name == project)
    }

    pub fn apply_client_refresh(&mut self, remote: Vec<ClientBucket>) {
        self.clients = merge_by_name(&self.clients, remote);
    }

    /// Replaces the project list for `owner`. A list for another client
    /// discards optimistic projects of the previous owner.
    pub fn apply_project_refresh(&mut self, owner: &ClientId, remote: Vec<ProjectEntry>) {
        if self.projects_owner.as_ref() == Some(owner) {
            self.projects = merge_by_name(&self.projects, remote);
        } else {
            self.projects = merge_by_name(&[], remote);
            self.projects_owner = Some(owner.clone());
        }
    }

    /// Drops the project list (client deselected or changed).
    pub fn clear_projects(&mut self) {
        self.projects.clear();
        self.projects_owner = None;
    }

    /// Records a freshly provisioned client/project pair.
    pub fn merge_optimistic(&mut self, client: ClientBucket, project: ProjectEntry) {
        let owner = client.name.clone();
        if !self.clients.iter().any(|c| c.name == owner) {
            upsert(&mut self.clients, client);
        }
        if self.projects_owner.as_ref() != Some(&owner) {
            self.projects.clear();
            self.projects_owner = Some(owner);
        }
        upsert(&mut self.projects, project);
    }
}
