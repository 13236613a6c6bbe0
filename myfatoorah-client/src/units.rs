//! Unit conversion and phone normalisation for shipping and customer payloads.
//!
//! The gateway expects weights in kilograms, dimensions in centimetres, and phone
//! numbers split into a country code and a local number.

use rust_decimal::Decimal;

use crate::error::{GatewayError, Result};

const WEIGHT_UNITS: &[(Decimal, &[&str])] = &[
    (Decimal::from_parts(1, 0, 0, false, 0), &["kg", "kgs", "كج", "كلغ", "كيلو جرام", "كيلو غرام"]),
    (Decimal::from_parts(1, 0, 0, false, 3), &["g", "جرام", "غرام", "جم"]),
    (Decimal::from_parts(453_592, 0, 0, false, 6), &["lbs", "lb", "رطل", "باوند"]),
    (Decimal::from_parts(283_495, 0, 0, false, 7), &["oz", "اوقية", "أوقية"]),
];

const DIMENSION_UNITS: &[(Decimal, &[&str])] = &[
    (Decimal::from_parts(1, 0, 0, false, 0), &["cm", "سم"]),
    (Decimal::from_parts(100, 0, 0, false, 0), &["m", "متر", "م"]),
    (Decimal::from_parts(1, 0, 0, false, 1), &["mm", "مم"]),
    (Decimal::from_parts(254, 0, 0, false, 2), &["in", "انش", "إنش", "بوصه", "بوصة"]),
    (Decimal::from_parts(9144, 0, 0, false, 2), &["yd", "يارده", "ياردة"]),
];

fn lookup(units: &[(Decimal, &[&str])], unit: &str) -> Option<Decimal> {
    let unit = unit.to_lowercase();
    units.iter().find(|(_, names)| names.contains(&unit.as_str())).map(|(rate, _)| *rate)
}

/// Returns the factor converting `unit` into kilograms.
///
/// Accepts `kg`, `g`, `lbs`/`lb` and `oz` (case-insensitive) and their Arabic names.
///
/// # Errors
///
/// Returns [`GatewayError::UnsupportedUnit`] for any other unit.
///
/// # Examples
///
/// ```
/// use myfatoorah_client::units::weight_rate;
/// use rust_decimal::Decimal;
///
/// assert_eq!(weight_rate("KG").unwrap(), Decimal::ONE);
/// assert!(weight_rate("stone").is_err());
/// ```
pub fn weight_rate(unit: &str) -> Result<Decimal> {
    lookup(WEIGHT_UNITS, unit).ok_or_else(|| {
        GatewayError::UnsupportedUnit(
            "Weight units must be in kg, g, lbs, or oz. Default is kg".to_owned(),
        )
    })
}

/// Returns the factor converting `unit` into centimetres.
///
/// Accepts `cm`, `m`, `mm`, `in` and `yd` (case-insensitive) and their Arabic names.
///
/// # Errors
///
/// Returns [`GatewayError::UnsupportedUnit`] for any other unit.
pub fn dimension_rate(unit: &str) -> Result<Decimal> {
    lookup(DIMENSION_UNITS, unit).ok_or_else(|| {
        GatewayError::UnsupportedUnit(
            "Dimension units must be in cm, m, mm, in, or yd. Default is cm".to_owned(),
        )
    })
}

/// A phone number split the way the gateway expects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phone {
    /// Country calling code (three digits), or empty when the number is short.
    pub country_code: String,
    /// Local number.
    pub number: String,
}

/// Normalises free-form phone input.
///
/// Arabic-Indic and Persian digits (and their `&#NNNN;` entities) become ASCII
/// digits, everything else that is not a digit is dropped, and a leading `00` is
/// removed. Empty input yields an empty [`Phone`]. When more than three digits
/// follow the first three, those first three are taken as the country code.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPhone`] if the remaining digits are fewer than 3
/// or more than 14.
///
/// # Examples
///
/// ```
/// use myfatoorah_client::units::parse_phone;
///
/// let phone = parse_phone("+965 5000-0000").unwrap();
/// assert_eq!(phone.country_code, "965");
/// assert_eq!(phone.number, "50000000");
/// ```
pub fn parse_phone(input: &str) -> Result<Phone> {
    let mut digits = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if let Some((digit, len)) = entity_digit(rest) {
            digits.push(digit);
            rest = &rest[len..];
            continue;
        }

        if let Some(digit) = ascii_digit(c) {
            digits.push(digit);
        }
        rest = &rest[c.len_utf8()..];
    }

    let digits = digits.strip_prefix("00").unwrap_or(&digits);

    if digits.is_empty() {
        return Ok(Phone::default());
    }

    if !(3..=14).contains(&digits.len()) {
        return Err(GatewayError::InvalidPhone(
            "phone number length must be between 3 and 14 digits".to_owned(),
        ));
    }

    if digits.len() - 3 > 3 {
        let (code, number) = digits.split_at(3);
        Ok(Phone { country_code: code.to_owned(), number: number.to_owned() })
    } else {
        Ok(Phone { country_code: String::new(), number: digits.to_owned() })
    }
}

/// Maps ASCII, Arabic-Indic (U+0660..) and Persian (U+06F0..) digits to ASCII.
fn ascii_digit(c: char) -> Option<char> {
    let offset = match c {
        '0'..='9' => return Some(c),
        '\u{0660}'..='\u{0669}' => u32::from(c) - 0x0660,
        '\u{06F0}'..='\u{06F9}' => u32::from(c) - 0x06F0,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

/// Decodes a leading `&#1632;`..`&#1641;` or `&#1776;`..`&#1785;` entity.
fn entity_digit(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let end = body.find(';')?;
    let code: u32 = body[..end].parse().ok()?;
    let digit = ascii_digit(char::from_u32(code)?).filter(|_| code >= 0x0660)?;
    Some((digit, end + 3))
}
