//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim and NFC-normalize a required display name.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let normalized: String = value.trim().nfc().collect();
    if normalized.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(normalized)
}

/// Validate a user id supplied by the authentication layer.
pub(crate) fn require_user_id(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidId(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_positive(value: i64, label: &str) -> ResultEngine<()> {
    if value <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_composed() {
        // "e" + combining acute accent -> "é"
        let name = normalize_required_name("  Cafe\u{301} Camper ", "title").unwrap();
        assert_eq!(name, "Café Camper");
        assert!(normalize_required_name("   ", "title").is_err());
    }

    #[test]
    fn rejects_blank_user_ids_and_non_positive_amounts() {
        assert!(require_user_id(" ", "owner_id").is_err());
        assert_eq!(require_user_id(" bob ", "owner_id").unwrap(), "bob");
        assert!(require_positive(0, "count").is_err());
        assert!(require_positive(1, "count").is_ok());
    }
}
