//! Display formatting for money and stock figures.
//!
//! Both round to 2 fraction digits with banker's rounding.

use rust_decimal::Decimal;

/// Round to cents, never producing `-0.00`
fn cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// `$1,234.50`; negative amounts keep the sign after the dollar (`$-3.00`)
pub fn format_currency(value: Decimal) -> String {
    let rounded = cents(value);
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    format!("${}{}.{}", sign, group_thousands(int_part), frac_part)
}

/// `115.00`
pub fn format_stock(value: Decimal) -> String {
    cents(value).to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
