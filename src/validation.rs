// Validation utilities module
// Custom validation functions for promotion input

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

/// Longest code string the `discount_codes.code` column holds
pub const MAX_CODE_LEN: usize = 50;

/// Largest amount a `NUMERIC(12, 2)` money column holds: 9 999 999 999.99
pub const MAX_MONEY_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z0-9][A-Z0-9_-]{2,49}$").expect("code pattern is a valid regex")
    })
}

/// Normalise a code the way it is stored: trimmed and upper-case
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validates a discount code string
/// 3-50 characters of A-Z, 0-9, '_' or '-', starting alphanumeric (after normalisation)
pub fn validate_code_format(code: &str) -> Result<(), ValidationError> {
    if code_pattern().is_match(&normalize_code(code)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_code_format"))
    }
}

/// Validates that a money amount or value is not negative
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        Err(ValidationError::new("must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Validates an order amount: not negative and storable as money
pub fn validate_order_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(value)?;
    if *value > MAX_MONEY_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Validates a requested quantity: at least one unit
pub fn validate_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity < 1 {
        Err(ValidationError::new("quantity_must_be_positive"))
    } else {
        Ok(())
    }
}

/// Validates that a percentage lies within 0..=100
pub fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        Err(ValidationError::new("percentage_out_of_range"))
    } else {
        Ok(())
    }
}

/// Validates an optional inclusive range: min must not exceed max
pub fn validate_ordered<T: PartialOrd>(
    min: Option<T>,
    max: Option<T>,
    code: &'static str,
) -> Result<(), ValidationError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ValidationError::new(code)),
        _ => Ok(()),
    }
}
