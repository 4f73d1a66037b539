//! Monetary helpers for the Teller ledger.
//!
//! All balances and transaction amounts are fixed-point decimals at
//! scale 2. Floats never touch money.

use rust_decimal::Decimal;

use crate::error::{Result, TellerError};

/// Decimal places carried by every balance and amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Validate an operation amount: strictly positive and no finer than
/// scale 2. Returns the value rescaled to exactly two decimal places.
///
/// Sub-cent amounts are rejected rather than rounded; rounding would
/// silently change the money moved.
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO || amount.round_dp(AMOUNT_SCALE) != amount {
        return Err(TellerError::InvalidAmount { amount });
    }
    let mut rescaled = amount;
    rescaled.rescale(AMOUNT_SCALE);
    Ok(rescaled)
}

/// Format an amount for display at the canonical scale.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_positive_amounts_pass() {
        assert_eq!(validate_amount(amt("0.01")).unwrap(), amt("0.01"));
        assert_eq!(validate_amount(amt("50.00")).unwrap(), amt("50.00"));
        // Coarser scales come back rescaled to two places.
        assert_eq!(validate_amount(Decimal::from(5)).unwrap().scale(), 2);
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(TellerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            validate_amount(amt("-5.00")),
            Err(TellerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_sub_cent_rejected() {
        assert!(matches!(
            validate_amount(amt("0.005")),
            Err(TellerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            validate_amount(amt("1.999")),
            Err(TellerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(amt("7.5")), "7.50");
        assert_eq!(format_amount(Decimal::from(3)), "3.00");
    }
}
