//! Display formatting for bolívar amounts and variations.

use chrono::{DateTime, Local, Utc};

/// Formats a VES amount with es-VE separators and the Bs.S symbol,
/// e.g. `1234.5` becomes `Bs.S 1.234,50`.
pub fn format_bolivares(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("Bs.S {sign}{grouped},{frac:02}")
}

/// Formats a signed variation percentage, e.g. `-1.2` becomes `-1.20%` and
/// `0.5` becomes `+0.50%`.
pub fn format_variation(variation: f64) -> String {
    let sign = if variation >= 0.0 { "+" } else { "" };
    format!("{sign}{variation:.2}%")
}

/// Local wall-clock time of an update, for status lines.
pub fn format_update_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bolivares_grouping() {
        assert_eq!(format_bolivares(36.5), "Bs.S 36,50");
        assert_eq!(format_bolivares(1234.5), "Bs.S 1.234,50");
        assert_eq!(format_bolivares(1_234_567.891), "Bs.S 1.234.567,89");
        assert_eq!(format_bolivares(0.0), "Bs.S 0,00");
    }

    #[test]
    fn test_format_bolivares_negative() {
        assert_eq!(format_bolivares(-1500.25), "Bs.S -1.500,25");
    }

    #[test]
    fn test_format_variation_sign() {
        assert_eq!(format_variation(1.234), "+1.23%");
        assert_eq!(format_variation(-1.2), "-1.20%");
        assert_eq!(format_variation(0.0), "+0.00%");
    }
}
