//! Human-facing rendering of engine output.
//!
//! Canonical JSON keeps decimals as plain strings and dates as ISO days;
//! these helpers only shape values for display.

use chrono::NaiveDate;
use rust_decimal::Decimal;

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

/// Format an already-rounded fiat value, keeping its scale.
///
/// With `grouping`, thousands separators are inserted into the integer part.
pub fn format_fiat(value: Decimal, grouping: bool) -> String {
    let negative = value.is_sign_negative() && !value.is_zero();
    let s = value.abs().to_string();
    let s = if grouping {
        match s.split_once('.') {
            Some((int_part, frac)) => format!("{}.{frac}", group_int_digits(int_part)),
            None => group_int_digits(&s),
        }
    } else {
        s
    };
    if negative {
        format!("-{s}")
    } else {
        s
    }
}

/// Render a ledger day, `dd/mm/yyyy` by default.
pub fn format_day(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn fiat_keeps_scale() {
        let value = Decimal::from_str("16000.00").unwrap();
        assert_eq!(format_fiat(value, false), "16000.00");
        assert_eq!(format_fiat(value, true), "16,000.00");
    }

    #[test]
    fn fiat_grouping_handles_signs_and_small_values() {
        assert_eq!(
            format_fiat(Decimal::from_str("-1234567.5").unwrap(), true),
            "-1,234,567.5"
        );
        assert_eq!(format_fiat(Decimal::from_str("999").unwrap(), true), "999");
        assert_eq!(format_fiat(Decimal::from_str("-0.00").unwrap(), true), "0.00");
    }

    #[test]
    fn day_is_en_gb_by_default() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
        assert_eq!(format_day(date, "%d/%m/%Y"), "03/01/2021");
        assert_eq!(format_day(date, "%Y-%m-%d"), "2021-01-03");
    }
}
