//! Fixed-locale (id-ID) formatting and input coercion.

use chrono::{Local, NaiveDate};

pub const PLACEHOLDER: &str = "-";

/// `Rp 1.500.000`, with up to three fraction digits after a comma.
pub fn rupiah(n: f64) -> String {
    let n = if n.is_finite() { n } else { 0.0 };
    let milli = (n.abs() * 1000.0).round() as u128;
    let whole = milli / 1000;
    let frac = milli % 1000;

    let sign = if n < 0.0 && milli > 0 { "-" } else { "" };
    let mut out = format!("Rp {}{}", sign, group_thousands(whole));
    if frac > 0 {
        let digits = format!("{:03}", frac);
        out.push(',');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn group_thousands(v: u128) -> String {
    let digits = v.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

pub fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD` -> `DD-MM-YYYY`. Anything that does not split into three
/// positive numbers is returned as-is (or as a dash when empty).
pub fn format_date(iso: &str) -> String {
    let parts: Vec<u32> = iso
        .split('-')
        .take(3)
        .map(|p| p.trim().parse::<u32>().unwrap_or(0))
        .collect();

    match parts.as_slice() {
        [y, m, d] if *y > 0 && *m > 0 && *d > 0 => format!("{:02}-{:02}-{}", d, m, y),
        _ => or_dash(iso),
    }
}

pub fn or_dash(text: &str) -> String {
    if text.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        text.to_string()
    }
}

/// Empty or invalid numeric input silently becomes 0.
pub fn coerce_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Quantities, prices, discount and tax are never negative.
pub fn coerce_amount(raw: &str) -> f64 {
    clamp_amount(coerce_number(raw))
}

pub fn clamp_amount(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupiah_groups_thousands() {
        assert_eq!(rupiah(0.0), "Rp 0");
        assert_eq!(rupiah(999.0), "Rp 999");
        assert_eq!(rupiah(1000.0), "Rp 1.000");
        assert_eq!(rupiah(1_500_000.0), "Rp 1.500.000");
    }

    #[test]
    fn rupiah_keeps_short_fraction() {
        assert_eq!(rupiah(1234.5), "Rp 1.234,5");
        assert_eq!(rupiah(0.125), "Rp 0,125");
        assert_eq!(rupiah(-2500.0), "Rp -2.500");
        assert_eq!(rupiah(f64::NAN), "Rp 0");
    }

    #[test]
    fn format_date_reorders_iso() {
        assert_eq!(format_date("2024-03-07"), "07-03-2024");
        assert_eq!(format_date("2024-3-7"), "07-03-2024");
        assert_eq!(format_date(""), "-");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn coercion_falls_back_to_zero() {
        assert_eq!(coerce_number("12.5"), 12.5);
        assert_eq!(coerce_number(" 3 "), 3.0);
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("abc"), 0.0);
        assert_eq!(coerce_number("inf"), 0.0);
        assert_eq!(coerce_amount("-4"), 0.0);
    }

    #[test]
    fn blank_text_renders_as_dash() {
        assert_eq!(or_dash("   "), "-");
        assert_eq!(or_dash("Budi"), "Budi");
    }
}
