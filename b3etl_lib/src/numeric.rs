//! Parsing of the upstream locale number format.
//!
//! B3 formats numbers the Brazilian way: `.` groups thousands and `,` is the
//! decimal separator (`476.976.044`, `0,490`, `16.683.713,71215846`).

use crate::error::EtlError;

/// Parses a locale-formatted number.
///
/// Only digits, `.`, `,` and a leading `-` are accepted; at most one `,`
/// may appear. Anything else (empty strings, `N/A`, `inf`) is rejected.
pub fn parse_locale_number(field: &'static str, raw: &str) -> Result<f64, EtlError> {
    let malformed = || EtlError::MalformedNumericField {
        field,
        value: raw.to_string(),
    };

    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if !unsigned.chars().any(|c| c.is_ascii_digit())
        || !unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        || unsigned.matches(',').count() > 1
    {
        return Err(malformed());
    }

    let normalized: String = trimmed
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    normalized.parse::<f64>().map_err(|_| malformed())
}

/// Like [`parse_locale_number`] but for optional header values: missing or
/// malformed values become `None` with a warning.
pub fn parse_optional(field: &'static str, raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    match parse_locale_number(field, raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Ignoring header value: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separated_integer() {
        assert_eq!(parse_locale_number("theoricalQty", "476.976.044").unwrap(), 476976044.0);
    }

    #[test]
    fn comma_decimal() {
        let v = parse_locale_number("part", "0,490").unwrap();
        assert!((v - 0.490).abs() < 1e-12);
    }

    #[test]
    fn grouped_with_decimals() {
        let v = parse_locale_number("reductor", "16.683.713,71215846").unwrap();
        assert!((v - 16683713.71215846).abs() < 1e-6);
    }

    #[test]
    fn surrounding_whitespace_and_sign() {
        assert_eq!(parse_locale_number("part", " -1,5 ").unwrap(), -1.5);
    }

    #[test]
    fn malformed_values_rejected() {
        for raw in ["N/A", "", "  ", "-", "1,2,3", "inf", "NaN", "12a", "1 000"] {
            let err = parse_locale_number("part", raw).unwrap_err();
            assert!(
                matches!(err, EtlError::MalformedNumericField { field: "part", .. }),
                "expected malformed for {:?}",
                raw
            );
        }
    }

    #[test]
    fn optional_header_values() {
        assert_eq!(parse_optional("reductor", None), None);
        assert_eq!(parse_optional("reductor", Some("???")), None);
        assert_eq!(parse_optional("theoricalQty", Some("1.000")), Some(1000.0));
    }
}
