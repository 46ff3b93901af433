//! Monetary amounts
//!
//! Balances and amounts are `rust_decimal::Decimal` with two fractional
//! digits. Amounts are never rounded: anything finer than a cent is rejected.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Number of fractional digits kept for balances and amounts
pub const SCALE: u32 = 2;

/// Check that `amount` can be applied to a balance
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be > 0");
    }
    if amount.normalize().scale() > SCALE {
        return Err("Amount must have at most two decimal places");
    }
    Ok(())
}

/// Parse an amount as typed by a person ("100", "40.50")
pub fn parse_amount(text: &str) -> Result<Decimal, &'static str> {
    Decimal::from_str(text.trim()).map_err(|_| "Amount must be a decimal number")
}

/// Render `amount` with exactly two fractional digits
pub fn to_fixed(amount: Decimal) -> Decimal {
    let mut fixed = amount;
    fixed.rescale(SCALE);
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_positive_amounts_accepted() {
        assert!(validate_amount(dec("0.01")).is_ok());
        assert!(validate_amount(dec("100")).is_ok());
        assert!(validate_amount(dec("100.50")).is_ok());
        // trailing zeros do not count as precision
        assert!(validate_amount(dec("1.2000")).is_ok());
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec("0.00")).is_err());
        assert!(validate_amount(dec("-5.00")).is_err());
    }

    #[test]
    fn test_sub_cent_amounts_rejected() {
        assert!(validate_amount(dec("0.001")).is_err());
        assert!(validate_amount(dec("10.005")).is_err());
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(dec("60")).to_string(), "60.00");
        assert_eq!(to_fixed(dec("1.5")).to_string(), "1.50");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 40.50 ").unwrap(), dec("40.50"));
        assert_eq!(parse_amount("100").unwrap(), dec("100"));
        assert!(parse_amount("ten").is_err());
        assert!(parse_amount("").is_err());
    }
}
