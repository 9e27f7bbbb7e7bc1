// File: src/convert.rs
use crate::error::IpConvertError;
use once_cell::sync::Lazy;
use regex::Regex;

static DOTTED_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$")
        .expect("static regex")
});

static DOTTED_BINARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[01]{8}\.){3}[01]{8}$").expect("static regex"));

/// Converts an IPv4 address between dotted-decimal and dotted-binary
/// notation, whichever direction the input calls for.
pub fn convert_ip(input: &str) -> Result<String, IpConvertError> {
    let value = input.trim();
    if DOTTED_DECIMAL.is_match(value) {
        let octets = value
            .split('.')
            .map(|octet| octet.parse::<u8>().map(|n| format!("{n:08b}")))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| IpConvertError::Unrecognized(value.to_string()))?;
        return Ok(octets.join("."));
    }
    if DOTTED_BINARY.is_match(value) {
        let octets = value
            .split('.')
            .map(|octet| u8::from_str_radix(octet, 2).map(|n| n.to_string()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| IpConvertError::Unrecognized(value.to_string()))?;
        return Ok(octets.join("."));
    }
    Err(IpConvertError::Unrecognized(value.to_string()))
}
