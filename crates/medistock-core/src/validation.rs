//! # Validation Module
//!
//! Boundary validation of user-entered input.
//!
//! The ledger store and requisition builder assume validated numeric input;
//! these checks run where raw field values cross into the core (movement
//! entry, R&R quantity edits, signatures) and reject malformed input before
//! any business logic sees it.

use crate::error::ValidationError;
use crate::MAX_ENTRY_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Input
// =============================================================================

/// Parses and validates a user-entered quantity field.
///
/// ## Rules
/// - Must be a plain base-10 integer (no signs, separators, or decimals)
/// - Must not exceed [`MAX_ENTRY_QUANTITY`]
///
/// Quantities are entered as magnitudes; the movement type determines the
/// sign before the entry reaches the ledger.
pub fn parse_quantity(field: &str, raw: &str) -> ValidationResult<i64> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let quantity: i64 = raw
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a whole number".to_string(),
        })?;

    if quantity < 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if quantity > MAX_ENTRY_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_ENTRY_QUANTITY,
        });
    }

    Ok(quantity)
}

/// Validates a user-entered request/approved amount on an R&R item.
///
/// Zero is a meaningful request ("we need none this period").
pub fn validate_amount(field: &str, amount: i64) -> ValidationResult<()> {
    if amount < 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if amount > MAX_ENTRY_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_ENTRY_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Signatures
// =============================================================================

/// Validates a signature (signer initials).
///
/// ## Rules
/// - Must not be empty
/// - At most 5 characters
/// - Letters only
pub fn validate_signature(signature: &str) -> ValidationResult<()> {
    let signature = signature.trim();

    if signature.is_empty() {
        return Err(ValidationError::Required {
            field: "signature".to_string(),
        });
    }

    if signature.len() > 5 {
        return Err(ValidationError::TooLong {
            field: "signature".to_string(),
            max: 5,
        });
    }

    if !signature.chars().all(|c| c.is_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "signature".to_string(),
            reason: "must contain only letters".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a product code.
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "product_code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "product_code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "product_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("quantity", "30"), Ok(30));
        assert_eq!(parse_quantity("quantity", " 0 "), Ok(0));

        assert!(parse_quantity("quantity", "").is_err());
        assert!(parse_quantity("quantity", "abc").is_err());
        assert!(parse_quantity("quantity", "1.5").is_err());
        assert!(parse_quantity("quantity", "-3").is_err());
        assert!(parse_quantity("quantity", "1000000").is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("request_amount", 0).is_ok());
        assert!(validate_amount("request_amount", 500).is_ok());
        assert!(validate_amount("request_amount", -1).is_err());
        assert!(validate_amount("request_amount", MAX_ENTRY_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_signature() {
        assert!(validate_signature("ab").is_ok());
        assert!(validate_signature("MJC").is_ok());

        assert!(validate_signature("").is_err());
        assert!(validate_signature("   ").is_err());
        assert!(validate_signature("toolong").is_err());
        assert!(validate_signature("a1").is_err());
    }

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("02A001").is_ok());
        assert!(validate_product_code("08S01-ZY").is_ok());

        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("has space").is_err());
        assert!(validate_product_code(&"A".repeat(60)).is_err());
    }
}
