/// Best-effort numeric coercion of a raw string value.
///
/// Absent values are NaN, blank values are 0, and anything that is not a
/// plain decimal literal (or `Infinity`) is NaN. Never fails.
pub fn parse_number(raw: Option<&str>) -> f64 {
    let s = match raw {
        Some(s) => s.trim(),
        None => return f64::NAN,
    };
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // f64::from_str also accepts "inf" and "nan" spellings
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Integer view of [`parse_number`]; `None` stands in for not-a-number.
pub fn parse_integer(raw: Option<&str>) -> Option<i64> {
    let v = parse_number(raw);
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

pub fn display_integer(v: Option<i64>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "NaN".to_string(),
    }
}
