use ruint::aliases::U256;
use serde_json::Value;
use thiserror::Error;

use crate::consts::DISPLAY_DECIMALS;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("unsupported numeric shape: {0}")]
    UnsupportedShape(String),
    #[error("invalid numeric literal '{0}'")]
    InvalidLiteral(String),
    #[error("invalid decimal amount '{0}': {1}")]
    InvalidDecimal(String, &'static str),
    #[error("amount out of range")]
    Overflow,
}

// ============================================================
// Wire value -> canonical integer
// ============================================================

/// Coerce a wire value into the canonical 256-bit integer.
///
/// Accepted shapes, in resolution order: absent/null and other falsy values
/// become zero; objects are probed for a "hex" then a "_hex" field; strings
/// are read as 0x-hex or plain decimal; non-negative integer numbers pass
/// through. Everything else (floats, negatives, arrays) is an error.
pub fn normalize(value: &Value) -> Result<U256, AmountError> {
    match value {
        Value::Null => Ok(U256::ZERO),
        Value::Bool(false) => Ok(U256::ZERO),
        Value::Object(map) => match map.get("hex").or_else(|| map.get("_hex")) {
            Some(Value::String(s)) => parse_integer_literal(s),
            Some(other) => Err(AmountError::UnsupportedShape(format!(
                "hex field holds {other}"
            ))),
            None => Err(AmountError::UnsupportedShape(
                "object without hex field".into(),
            )),
        },
        Value::String(s) => parse_integer_literal(s),
        Value::Number(n) => match n.as_u64() {
            Some(n) => Ok(U256::from(n)),
            None => Err(AmountError::UnsupportedShape(format!(
                "non-integer number {n}"
            ))),
        },
        other => Err(AmountError::UnsupportedShape(other.to_string())),
    }
}

fn parse_integer_literal(s: &str) -> Result<U256, AmountError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(rest) => (rest, 16),
        None => (s, 10),
    };
    let well_formed = !digits.is_empty()
        && digits.bytes().all(|b| {
            if radix == 16 {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            }
        });
    if !well_formed {
        return Err(AmountError::InvalidLiteral(s.into()));
    }
    U256::from_str_radix(digits, radix).map_err(|_| AmountError::Overflow)
}

// ============================================================
// Display conversion
// ============================================================

/// Wire value -> display-unit decimal string. Never fails: anything that
/// cannot be normalized is logged and rendered as "0".
pub fn to_decimal_string(value: &Value) -> String {
    match normalize(value) {
        Ok(units) => format_base_units(units),
        Err(err) => {
            tracing::warn!("could not normalize amount {value}: {err}");
            "0".to_string()
        }
    }
}

/// Base units -> decimal string with the fraction trimmed of trailing zeros.
/// At least one fraction digit is always kept ("1.0", not "1").
pub fn format_base_units(units: U256) -> String {
    let scale = unit_scale();
    let whole = units / scale;
    let frac = units % scale;
    let padded = format!("{:0>width$}", frac.to_string(), width = DISPLAY_DECIMALS as usize);
    let trimmed = padded.trim_end_matches('0');
    let frac = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{whole}.{frac}")
}

/// Display-unit decimal string -> base units, leniently: malformed input is
/// logged and read as zero. Use [`parse_base_units`] where failure matters.
pub fn to_base_units(text: &str) -> U256 {
    match parse_base_units(text) {
        Ok(units) => units,
        Err(err) => {
            tracing::warn!("could not parse amount '{text}': {err}");
            U256::ZERO
        }
    }
}

/// Display-unit decimal string -> base units, strictly. Accepts unsigned
/// decimals with at most 18 fraction digits; rejects everything else.
pub fn parse_base_units(text: &str) -> Result<U256, AmountError> {
    let trimmed = text.trim();
    let invalid = |why: &'static str| AmountError::InvalidDecimal(text.into(), why);

    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    let (whole, frac) = match trimmed.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (trimmed, ""),
    };
    if whole.is_empty() {
        return Err(invalid("missing whole part"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("whole part is not a number"));
    }
    if trimmed.contains('.') {
        if frac.is_empty() {
            return Err(invalid("missing fraction"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("fraction is not a number"));
        }
        if frac.len() > DISPLAY_DECIMALS as usize {
            return Err(invalid("too many fraction digits"));
        }
    }

    let whole = U256::from_str_radix(whole, 10).map_err(|_| AmountError::Overflow)?;
    let frac_units = if frac.is_empty() {
        U256::ZERO
    } else {
        let shift = DISPLAY_DECIMALS as usize - frac.len();
        let digits = U256::from_str_radix(frac, 10).map_err(|_| AmountError::Overflow)?;
        digits * U256::from(10u64).pow(U256::from(shift))
    };
    whole
        .checked_mul(unit_scale())
        .and_then(|scaled| scaled.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

fn unit_scale() -> U256 {
    U256::from(10u64).pow(U256::from(DISPLAY_DECIMALS))
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_wire_shapes_agree() {
        let one_unit = "1000000000000000000";
        let shapes = [
            json!(1_000_000_000_000_000_000u64),
            json!(one_unit),
            json!("0xde0b6b3a7640000"),
            json!({ "hex": "0xde0b6b3a7640000" }),
            json!({ "_hex": "0xde0b6b3a7640000" }),
        ];
        for shape in &shapes {
            assert_eq!(to_decimal_string(shape), "1.0", "shape {shape}");
        }
    }

    #[test]
    fn hex_field_wins_over_legacy_field() {
        let both = json!({ "hex": "0x2", "_hex": "0x3" });
        assert_eq!(normalize(&both).unwrap(), U256::from(2u64));
    }

    #[test]
    fn falsy_values_normalize_to_zero() {
        for v in [json!(null), json!(false), json!(""), json!("   ")] {
            assert_eq!(normalize(&v).unwrap(), U256::ZERO, "value {v}");
        }
    }

    #[test]
    fn unsupported_shapes_are_errors() {
        for v in [
            json!(1.5),
            json!(-3),
            json!(true),
            json!([1]),
            json!({ "value": "0x1" }),
            json!({ "hex": 7 }),
            json!("12abc"),
            json!("0xzz"),
        ] {
            assert!(normalize(&v).is_err(), "value {v}");
        }
    }

    #[test]
    fn display_never_fails() {
        assert_eq!(to_decimal_string(&json!({ "bad": true })), "0");
        assert_eq!(to_decimal_string(&json!(2.75)), "0");
        assert_eq!(to_decimal_string(&json!("not a number")), "0");
    }

    #[test]
    fn formatting_trims_but_keeps_one_digit() {
        let cases = [
            ("0", "0.0"),
            ("1", "0.000000000000000001"),
            ("500000000000000000", "0.5"),
            ("1000000000000000000", "1.0"),
            ("1500000000000000000", "1.5"),
            ("12000000000000000000", "12.0"),
            ("1230000000000000000", "1.23"),
        ];
        for (units, display) in cases {
            let units = U256::from_str_radix(units, 10).unwrap();
            assert_eq!(format_base_units(units), display);
        }
    }

    #[test]
    fn strict_parse_round_trips() {
        for text in ["0.5", "1.0", "12.34", "0.000000000000000001"] {
            let units = parse_base_units(text).unwrap();
            assert_eq!(format_base_units(units), text);
        }
        assert_eq!(
            parse_base_units("2").unwrap(),
            parse_base_units("2.0").unwrap()
        );
    }

    #[test]
    fn strict_parse_rejects_malformed() {
        for text in ["", "  ", ".", "1.", ".5", "-1", "+1", "abc", "1.2.3", "1e18", "0x10"] {
            assert!(parse_base_units(text).is_err(), "text '{text}'");
        }
        let too_precise = "0.0000000000000000001";
        assert!(parse_base_units(too_precise).is_err());
    }

    #[test]
    fn lenient_parse_defaults_to_zero() {
        assert_eq!(to_base_units("garbage"), U256::ZERO);
        assert_eq!(to_base_units("1.5"), parse_base_units("1.5").unwrap());
    }
}
