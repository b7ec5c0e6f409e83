use rust_decimal::Decimal;

/// Storefront price for a source cost: `cost * margin`, rounded to cents
/// with banker's rounding.
#[must_use]
pub fn apply_margin(cost: Decimal, margin: Decimal) -> Decimal {
    (cost * margin).round_dp(2)
}
