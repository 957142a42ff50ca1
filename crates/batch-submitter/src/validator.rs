//! Structural screening of raw requests before they may be dispatched.
//!
//! Everything here is pure: no collaborator is consulted and nothing is
//! logged, so a request rejected at intake costs nothing but a report row.

use crate::request::SubmissionRequest;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed destination: {0:?}")]
    MalformedDestination(String),

    #[error("Invalid amount {0:?}: must be a positive decimal")]
    InvalidAmount(String),

    #[error("Invalid auxiliary id {0:?}: must be a non-negative integer")]
    InvalidAuxiliaryId(String),
}

/// Address-format rule supplied by the chain integration
pub trait DestinationFormat: Send + Sync {
    fn is_valid(&self, destination: &str) -> bool;

    /// Key under which two spellings of the same account compare equal
    fn canonical(&self, address: &str) -> String {
        address.trim().to_string()
    }
}

impl<F> DestinationFormat for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, destination: &str) -> bool {
        self(destination)
    }
}

/// `0x`-prefixed, 20-byte hex account address
#[derive(Debug, Clone, Copy, Default)]
pub struct HexAddressFormat;

impl DestinationFormat for HexAddressFormat {
    fn is_valid(&self, destination: &str) -> bool {
        destination
            .strip_prefix("0x")
            .or_else(|| destination.strip_prefix("0X"))
            .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
    }

    fn canonical(&self, address: &str) -> String {
        address.trim().to_ascii_lowercase()
    }
}

/// A request that passed structural validation.
///
/// `request` holds the trimmed fields that were checked, which is what the
/// collaborators receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    pub request: SubmissionRequest,
    pub amount: Decimal,
    pub auxiliary_id: Option<u64>,
}

pub fn validate(
    request: &SubmissionRequest,
    format: &dyn DestinationFormat,
) -> Result<ValidatedEntry, ValidationError> {
    let destination = request.destination.trim();
    if destination.is_empty() || !format.is_valid(destination) {
        return Err(ValidationError::MalformedDestination(
            request.destination.clone(),
        ));
    }

    let raw_amount = request.amount.trim();
    let amount = Decimal::from_str(raw_amount)
        .ok()
        .filter(|amount| amount.is_sign_positive() && !amount.is_zero())
        .ok_or_else(|| ValidationError::InvalidAmount(request.amount.clone()))?;

    let raw_auxiliary_id = request
        .auxiliary_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty());
    let auxiliary_id = raw_auxiliary_id
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| ValidationError::InvalidAuxiliaryId(raw.to_string()))
        })
        .transpose()?;

    Ok(ValidatedEntry {
        request: SubmissionRequest {
            destination: destination.to_string(),
            amount: raw_amount.to_string(),
            auxiliary_id: raw_auxiliary_id.map(str::to_string),
        },
        amount,
        auxiliary_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x00000000000000000000000000000000000000aA";

    #[test]
    fn test_valid_request() {
        let entry = validate(
            &SubmissionRequest::new(ADDR, " 12.50 ").with_auxiliary_id("4"),
            &HexAddressFormat,
        )
        .unwrap();

        assert_eq!(entry.amount, Decimal::new(1250, 2));
        assert_eq!(entry.auxiliary_id, Some(4));
    }

    #[test]
    fn test_validated_request_is_trimmed() {
        let entry = validate(
            &SubmissionRequest::new(format!("  {ADDR} "), " 1.50 ").with_auxiliary_id(" 7 "),
            &HexAddressFormat,
        )
        .unwrap();

        assert_eq!(entry.request.destination, ADDR);
        assert_eq!(entry.request.amount, "1.50");
        assert_eq!(entry.request.auxiliary_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_canonical_address_ignores_case() {
        let format = HexAddressFormat;
        assert_eq!(
            format.canonical(" 0xABCDEF0000000000000000000000000000000001"),
            format.canonical("0xabcdef0000000000000000000000000000000001")
        );

        let case_sensitive = |_: &str| true;
        assert_ne!(case_sensitive.canonical("AbC"), case_sensitive.canonical("abc"));
    }

    #[test]
    fn test_empty_destination() {
        let err = validate(&SubmissionRequest::new("", "1"), &HexAddressFormat).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedDestination(_)));
    }

    #[test]
    fn test_destination_format_rules() {
        let format = HexAddressFormat;
        assert!(format.is_valid(ADDR));
        assert!(!format.is_valid("0x1234"));
        assert!(!format.is_valid("00000000000000000000000000000000000000aa00"));
        assert!(!format.is_valid("0xzz000000000000000000000000000000000000aa"));
    }

    #[test]
    fn test_custom_destination_format() {
        let accept_all = |_: &str| true;
        assert!(validate(&SubmissionRequest::new("alice.near", "1"), &accept_all).is_ok());
    }

    #[test]
    fn test_invalid_amounts() {
        for amount in ["0", "0.000", "-1", "abc", ""] {
            let err = validate(&SubmissionRequest::new(ADDR, amount), &HexAddressFormat).unwrap_err();
            assert_eq!(err, ValidationError::InvalidAmount(amount.to_string()));
        }
    }

    #[test]
    fn test_invalid_auxiliary_id() {
        let err = validate(
            &SubmissionRequest::new(ADDR, "1").with_auxiliary_id("-2"),
            &HexAddressFormat,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidAuxiliaryId("-2".to_string()));
    }

    #[test]
    fn test_blank_auxiliary_id_is_absent() {
        let entry = validate(
            &SubmissionRequest::new(ADDR, "1").with_auxiliary_id(" "),
            &HexAddressFormat,
        )
        .unwrap();
        assert_eq!(entry.auxiliary_id, None);
    }
}
