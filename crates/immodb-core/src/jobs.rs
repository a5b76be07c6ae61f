//! Job submission payload and its validation rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::listing::{location_slug, SearchFilters, CONTRACT_RENT, CONTRACT_SALE};

/// Hard ceiling on pages per job, regardless of configuration.
pub const MAX_PAGES_LIMIT: u32 = 10;
/// Pages fetched when the submitter does not say otherwise.
pub const DEFAULT_MAX_PAGES: u32 = 3;

#[derive(Debug, Error)]
pub enum JobRequestError {
    #[error("portal must be non-empty")]
    EmptyPortal,
    #[error("location must be non-empty")]
    EmptyLocation,
    #[error("unknown contract type '{0}'; expected 'vendita' or 'affitto'")]
    UnknownContractType(String),
    #[error("max_pages must be between 1 and 10, got {0}")]
    MaxPagesOutOfRange(u32),
    #[error("price_min {min} exceeds price_max {max}")]
    InvertedPriceRange { min: f64, max: f64 },
    #[error("rooms_min {min} exceeds rooms_max {max}")]
    InvertedRoomsRange { min: u32, max: u32 },
    #[error("sqm_min {min} exceeds sqm_max {max}")]
    InvertedSqmRange { min: f64, max: f64 },
}

/// A scrape request as submitted by a caller.
///
/// `validate` must pass before the request is persisted as a job row.
/// Whether `portal` names a known portal is checked against the portal
/// registry at the submission surface, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub portal: String,
    pub location: String,
    pub contract_type: String,
    pub property_type: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rooms_min: Option<u32>,
    pub rooms_max: Option<u32>,
    pub sqm_min: Option<f64>,
    pub sqm_max: Option<f64>,
    pub max_pages: u32,
    pub profile_name: Option<String>,
}

impl JobRequest {
    /// A sale request for one portal and location with default paging.
    #[must_use]
    pub fn new(portal: &str, location: &str) -> Self {
        Self {
            portal: portal.to_string(),
            location: location.to_string(),
            contract_type: CONTRACT_SALE.to_string(),
            property_type: None,
            price_min: None,
            price_max: None,
            rooms_min: None,
            rooms_max: None,
            sqm_min: None,
            sqm_max: None,
            max_pages: DEFAULT_MAX_PAGES,
            profile_name: None,
        }
    }

    /// Check the request against the submission rules.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), JobRequestError> {
        if self.portal.trim().is_empty() {
            return Err(JobRequestError::EmptyPortal);
        }
        if self.location.trim().is_empty() {
            return Err(JobRequestError::EmptyLocation);
        }
        if self.contract_type != CONTRACT_SALE && self.contract_type != CONTRACT_RENT {
            return Err(JobRequestError::UnknownContractType(
                self.contract_type.clone(),
            ));
        }
        if self.max_pages < 1 || self.max_pages > MAX_PAGES_LIMIT {
            return Err(JobRequestError::MaxPagesOutOfRange(self.max_pages));
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(JobRequestError::InvertedPriceRange { min, max });
            }
        }
        if let (Some(min), Some(max)) = (self.rooms_min, self.rooms_max) {
            if min > max {
                return Err(JobRequestError::InvertedRoomsRange { min, max });
            }
        }
        if let (Some(min), Some(max)) = (self.sqm_min, self.sqm_max) {
            if min > max {
                return Err(JobRequestError::InvertedSqmRange { min, max });
            }
        }
        Ok(())
    }

    /// Profile under which the job's browser session is stored.
    ///
    /// Falls back to `{portal}_{location-slug}` when the submitter names none,
    /// so repeat runs against the same portal and city reuse one identity.
    #[must_use]
    pub fn effective_profile(&self) -> String {
        self.profile_name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.portal, location_slug(&self.location)))
    }

    /// The search filters a portal turns into result URLs.
    #[must_use]
    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            location: self.location.clone(),
            contract_type: self.contract_type.clone(),
            property_type: self.property_type.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            rooms_min: self.rooms_min,
            rooms_max: self.rooms_max,
            sqm_min: self.sqm_min,
            sqm_max: self.sqm_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_minimal_request() {
        let request = JobRequest::new("immobiliare_it", "Milano");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_portal() {
        let request = JobRequest::new("  ", "Milano");
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::EmptyPortal)
        ));
    }

    #[test]
    fn validate_rejects_empty_location() {
        let request = JobRequest::new("immobiliare_it", "");
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::EmptyLocation)
        ));
    }

    #[test]
    fn validate_rejects_unknown_contract_type() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.contract_type = "lease".to_string();
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::UnknownContractType(ref t)) if t == "lease"
        ));
    }

    #[test]
    fn validate_rejects_zero_max_pages() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.max_pages = 0;
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::MaxPagesOutOfRange(0))
        ));
    }

    #[test]
    fn validate_rejects_max_pages_above_limit() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.max_pages = 11;
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::MaxPagesOutOfRange(11))
        ));
    }

    #[test]
    fn validate_rejects_inverted_price_range() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.price_min = Some(500_000.0);
        request.price_max = Some(200_000.0);
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::InvertedPriceRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_inverted_rooms_range() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.rooms_min = Some(4);
        request.rooms_max = Some(2);
        assert!(matches!(
            request.validate(),
            Err(JobRequestError::InvertedRoomsRange { min: 4, max: 2 })
        ));
    }

    #[test]
    fn validate_accepts_full_filter_set() {
        let mut request = JobRequest::new("casa_it", "Roma");
        request.contract_type = CONTRACT_RENT.to_string();
        request.property_type = Some("appartamento".to_string());
        request.price_min = Some(500.0);
        request.price_max = Some(1500.0);
        request.rooms_min = Some(2);
        request.rooms_max = Some(4);
        request.sqm_min = Some(40.0);
        request.sqm_max = Some(120.0);
        request.max_pages = 10;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn effective_profile_defaults_to_portal_and_location() {
        let request = JobRequest::new("immobiliare_it", "Sesto San Giovanni");
        assert_eq!(
            request.effective_profile(),
            "immobiliare_it_sesto-san-giovanni"
        );
    }

    #[test]
    fn effective_profile_prefers_explicit_name() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.profile_name = Some("primary".to_string());
        assert_eq!(request.effective_profile(), "primary");
    }

    #[test]
    fn filters_carry_every_bound() {
        let mut request = JobRequest::new("immobiliare_it", "Milano");
        request.price_min = Some(100_000.0);
        request.sqm_min = Some(60.0);
        request.rooms_min = Some(3);
        let filters = request.filters();
        assert_eq!(filters.location, "Milano");
        assert_eq!(filters.contract_type, CONTRACT_SALE);
        assert_eq!(filters.price_min, Some(100_000.0));
        assert_eq!(filters.sqm_min, Some(60.0));
        assert_eq!(filters.rooms_min, Some(3));
    }
}
