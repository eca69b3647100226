//! Numeric type properties and literal narrowing.
//!
//! The table below is the single source of truth for the built-in numeric
//! types: their ranges, sizes, and number class. Literal narrowing picks
//! the smallest type whose range covers a value; integer literals search
//! the unsigned or signed family depending on the sign bit, floats pick
//! `f32` when the magnitude fits and `f64` otherwise.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Classification of a type's machine representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberClass {
    #[default]
    None,
    Integer,
    Float,
}

#[derive(Clone, Copy, Debug)]
pub struct NumericTypeProperties {
    pub name: &'static str,
    pub min: i64,
    pub max: u64,
    pub is_signed: bool,
    pub number_class: NumberClass,
    pub size_in_bytes: usize,
}

/// All built-in numeric types, unsigned family first, then signed, then
/// floating. Narrowing relies on this ordering.
pub const NUMERIC_TYPE_PROPERTIES: &[NumericTypeProperties] = &[
    NumericTypeProperties {
        name: "u8",
        min: 0,
        max: u8::MAX as u64,
        is_signed: false,
        number_class: NumberClass::Integer,
        size_in_bytes: 1,
    },
    NumericTypeProperties {
        name: "u16",
        min: 0,
        max: u16::MAX as u64,
        is_signed: false,
        number_class: NumberClass::Integer,
        size_in_bytes: 2,
    },
    NumericTypeProperties {
        name: "u32",
        min: 0,
        max: u32::MAX as u64,
        is_signed: false,
        number_class: NumberClass::Integer,
        size_in_bytes: 4,
    },
    NumericTypeProperties {
        name: "u64",
        min: 0,
        max: u64::MAX,
        is_signed: false,
        number_class: NumberClass::Integer,
        size_in_bytes: 8,
    },
    NumericTypeProperties {
        name: "s8",
        min: i8::MIN as i64,
        max: i8::MAX as u64,
        is_signed: true,
        number_class: NumberClass::Integer,
        size_in_bytes: 1,
    },
    NumericTypeProperties {
        name: "s16",
        min: i16::MIN as i64,
        max: i16::MAX as u64,
        is_signed: true,
        number_class: NumberClass::Integer,
        size_in_bytes: 2,
    },
    NumericTypeProperties {
        name: "s32",
        min: i32::MIN as i64,
        max: i32::MAX as u64,
        is_signed: true,
        number_class: NumberClass::Integer,
        size_in_bytes: 4,
    },
    NumericTypeProperties {
        name: "s64",
        min: i64::MIN,
        max: i64::MAX as u64,
        is_signed: true,
        number_class: NumberClass::Integer,
        size_in_bytes: 8,
    },
    NumericTypeProperties {
        name: "f32",
        min: i64::MIN,
        max: u64::MAX,
        is_signed: true,
        number_class: NumberClass::Float,
        size_in_bytes: 4,
    },
    NumericTypeProperties {
        name: "f64",
        min: i64::MIN,
        max: u64::MAX,
        is_signed: true,
        number_class: NumberClass::Float,
        size_in_bytes: 8,
    },
];

static PROPERTIES_BY_NAME: Lazy<FxHashMap<&'static str, &'static NumericTypeProperties>> =
    Lazy::new(|| {
        NUMERIC_TYPE_PROPERTIES
            .iter()
            .map(|props| (props.name, props))
            .collect()
    });

/// Look up the properties of a built-in numeric type by name.
pub fn properties_for(name: &str) -> Option<&'static NumericTypeProperties> {
    PROPERTIES_BY_NAME.get(name).copied()
}

#[inline]
pub const fn is_sign_bit_set(value: u64) -> bool {
    value & 0x8000_0000_0000_0000 != 0
}

/// Pick the smallest integer type whose range covers `value`.
///
/// `value` holds the two's-complement bit pattern; a set sign bit selects
/// the signed family, otherwise the unsigned family is searched.
pub fn narrow_to_integer(value: u64) -> Option<&'static str> {
    let (start, end) = if is_sign_bit_set(value) { (4, 8) } else { (0, 4) };
    let signed_value = value as i64;
    for props in &NUMERIC_TYPE_PROPERTIES[start..end] {
        if props.is_signed {
            if signed_value >= props.min && signed_value <= props.max as i64 {
                return Some(props.name);
            }
        } else if value <= props.max {
            return Some(props.name);
        }
    }
    None
}

/// Pick `f32` when the magnitude fits, else `f64`.
pub fn narrow_to_float(value: f64) -> &'static str {
    const F32_RANGE: f64 = 3.4e38;
    if value < -F32_RANGE || value > F32_RANGE {
        "f64"
    } else {
        "f32"
    }
}

/// Parse an integer literal with optional `0x`/`0o`/`0b` prefix and `_`
/// separators.
pub fn parse_integer_literal(text: &str) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    let (digits, radix) = if text.len() > 2 {
        let prefix = &text[0..2];
        if prefix.eq_ignore_ascii_case("0x") {
            (&text[2..], 16)
        } else if prefix.eq_ignore_ascii_case("0o") {
            (&text[2..], 8)
        } else if prefix.eq_ignore_ascii_case("0b") {
            (&text[2..], 2)
        } else {
            (text, 10)
        }
    } else {
        (text, 10)
    };
    let mut value: u64 = 0;
    let mut seen_digit = false;
    for byte in digits.bytes() {
        if byte == b'_' {
            continue;
        }
        let digit = (byte as char).to_digit(radix)?;
        value = value.checked_mul(radix as u64)?.checked_add(digit as u64)?;
        seen_digit = true;
    }
    seen_digit.then_some(value)
}

/// Parse a floating point literal, tolerating `_` separators.
pub fn parse_float_literal(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    if text.contains('_') {
        let cleaned: String = text.chars().filter(|&c| c != '_').collect();
        return cleaned.parse::<f64>().ok();
    }
    text.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrows_small_unsigned_values() {
        assert_eq!(narrow_to_integer(200), Some("u8"));
        assert_eq!(narrow_to_integer(300), Some("u16"));
        assert_eq!(narrow_to_integer(70_000), Some("u32"));
        assert_eq!(narrow_to_integer(5_000_000_000), Some("u64"));
    }

    #[test]
    fn narrows_negative_values_into_the_signed_family() {
        assert_eq!(narrow_to_integer((-1i64) as u64), Some("s8"));
        assert_eq!(narrow_to_integer((-200i64) as u64), Some("s16"));
        assert_eq!(narrow_to_integer((-70_000i64) as u64), Some("s32"));
        assert_eq!(narrow_to_integer(i64::MIN as u64), Some("s64"));
    }

    #[test]
    fn narrows_floats_by_magnitude() {
        assert_eq!(narrow_to_float(1.0), "f32");
        assert_eq!(narrow_to_float(-3.3e38), "f32");
        assert_eq!(narrow_to_float(3.5e38), "f64");
        assert_eq!(narrow_to_float(-1.7e308), "f64");
    }

    #[test]
    fn parses_radix_prefixes_and_separators() {
        assert_eq!(parse_integer_literal("0xff"), Some(255));
        assert_eq!(parse_integer_literal("0b1010"), Some(10));
        assert_eq!(parse_integer_literal("0o17"), Some(15));
        assert_eq!(parse_integer_literal("1_000_000"), Some(1_000_000));
        assert_eq!(parse_integer_literal("0xzz"), None);
        assert_eq!(parse_float_literal("1_000.5"), Some(1000.5));
    }

    #[test]
    fn properties_table_is_consistent() {
        let u8_props = properties_for("u8").unwrap();
        assert_eq!(u8_props.size_in_bytes, 1);
        assert!(!u8_props.is_signed);
        let f64_props = properties_for("f64").unwrap();
        assert_eq!(f64_props.number_class, NumberClass::Float);
        assert_eq!(f64_props.size_in_bytes, 8);
        assert!(properties_for("void").is_none());
    }
}
