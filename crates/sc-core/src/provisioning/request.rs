use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::ids::{ClientId, ProjectId};
use crate::selection::FlightWindow;

static CLIENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("client name pattern"));

static PROJECT_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("project handle pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningValidationError {
    #[error("client name `{0}` may only contain lowercase letters, digits and hyphens")]
    InvalidClientName(String),

    #[error("project handle `{0}` must be numeric")]
    InvalidProjectHandle(String),

    #[error("both flight dates are required")]
    MissingFlightDates,

    #[error("flight end {end} must be after start {start}")]
    InvalidFlightWindow { start: NaiveDate, end: NaiveDate },
}

/// Whether the project goes under a new or an existing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientTarget {
    New { name: String },
    Existing { id: ClientId },
}

/// Raw form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub client: ClientTarget,
    pub project: String,
    pub flight_start: Option<NaiveDate>,
    pub flight_end: Option<NaiveDate>,
}

/// A request that passed the validity gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProvisioning {
    pub client: ClientId,
    pub creates_client: bool,
    pub project: ProjectId,
    pub flight: FlightWindow,
}

/// Trim + lowercase, applied before the client name pattern check.
pub fn normalize_client_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl ProvisioningRequest {
    pub fn validate(&self) -> Result<ValidatedProvisioning, ProvisioningValidationError> {
        let (client, creates_client) = match &self.client {
            ClientTarget::New { name } => {
                let normalized = normalize_client_name(name);
                if !CLIENT_NAME.is_match(&normalized) {
                    return Err(ProvisioningValidationError::InvalidClientName(name.clone()));
                }
                (ClientId::new(normalized), true)
            }
            ClientTarget::Existing { id } => (id.clone(), false),
        };

        let handle = self.project.trim();
        if !PROJECT_HANDLE.is_match(handle) {
            return Err(ProvisioningValidationError::InvalidProjectHandle(
                self.project.clone(),
            ));
        }

        let (start, end) = match (self.flight_start, self.flight_end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ProvisioningValidationError::MissingFlightDates),
        };
        if end <= start {
            return Err(ProvisioningValidationError::InvalidFlightWindow { start, end });
        }

        Ok(ValidatedProvisioning {
            client,
            creates_client,
            project: ProjectId::new(handle),
            flight: FlightWindow { start, end },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(name: &str, project: &str) -> ProvisioningRequest {
        ProvisioningRequest {
            client: ClientTarget::New { name: name.into() },
            project: project.into(),
            flight_start: Some(date(2025, 3, 1)),
            flight_end: Some(date(2025, 3, 31)),
        }
    }

    #[test]
    fn underscore_in_client_name_is_rejected() {
        assert_eq!(
            request("Acme_123", "0042").validate(),
            Err(ProvisioningValidationError::InvalidClientName("Acme_123".into()))
        );
    }

    #[test]
    fn client_name_is_trimmed_and_lowercased() {
        let valid = request("  Acme-Promo ", "0042").validate().unwrap();
        assert_eq!(valid.client.as_str(), "acme-promo");
        assert!(valid.creates_client);
    }

    #[test]
    fn project_handle_must_be_digits() {
        assert!(matches!(
            request("acme", "q4-promo").validate(),
            Err(ProvisioningValidationError::InvalidProjectHandle(_))
        ));
    }

    #[test]
    fn flight_dates_are_required_and_ordered() {
        let mut missing = request("acme", "0042");
        missing.flight_end = None;
        assert_eq!(
            missing.validate(),
            Err(ProvisioningValidationError::MissingFlightDates)
        );

        let mut reversed = request("acme", "0042");
        reversed.flight_end = Some(date(2025, 3, 1));
        assert!(matches!(
            reversed.validate(),
            Err(ProvisioningValidationError::InvalidFlightWindow { .. })
        ));
    }

    #[test]
    fn existing_client_skips_name_check() {
        let req = ProvisioningRequest {
            client: ClientTarget::Existing { id: "legacy_bucket".into() },
            ..request("ignored", "7")
        };
        let valid = req.validate().unwrap();
        assert!(!valid.creates_client);
        assert_eq!(valid.client.as_str(), "legacy_bucket");
    }
}
