//! Certificate serial numbers
// (c) 2024 Ross Younger

use rand::RngCore as _;
use rcgen::SerialNumber;

use crate::error::{Error, Result};

/// Number of random bytes drawn for a generated serial number
const RANDOM_SERIAL_BYTES: usize = 9;

/// Ensures a hex serial number encodes as a positive DER INTEGER.
///
/// If the leading nibble is 8 or above (i.e. the top bit is set), it is reduced by 8.
#[must_use]
pub fn to_positive_hex(hex: &str) -> String {
    let mut chars = hex.chars();
    match chars.next().and_then(|c| c.to_digit(16)) {
        Some(n) if n >= 8 => format!("{:x}{}", n - 8, chars.as_str()),
        _ => hex.to_string(),
    }
}

/// Draws a fresh random serial number, as lowercase hex
#[must_use]
pub fn random_hex() -> String {
    let mut bytes = [0u8; RANDOM_SERIAL_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_positive_hex(&hex::encode(bytes))
}

/// Converts a hex serial number (as generated, or given in options) for certificate assembly.
///
/// Odd-length input is treated as if it had a leading zero. Any `:` separators are ignored.
pub(crate) fn parse_hex(serial: &str) -> Result<SerialNumber> {
    let mut digits: String = serial.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() {
        return Err(Error::InvalidOptions("serial number is empty".into()));
    }
    if digits.len() % 2 == 1 {
        digits.insert(0, '0');
    }
    let bytes = hex::decode(&digits)
        .map_err(|e| Error::InvalidOptions(format!("serial number {serial:?}: {e}")))?;
    if bytes.len() > 20 {
        return Err(Error::InvalidOptions(format!(
            "serial number {serial:?} is longer than 20 octets"
        )));
    }
    Ok(SerialNumber::from(bytes))
}

#[cfg(test)]
mod test {
    use super::{parse_hex, random_hex, to_positive_hex};
    use crate::error::Error;

    #[test]
    fn high_nibble_is_reduced() {
        assert_eq!(to_positive_hex("f0a1"), "70a1");
        assert_eq!(to_positive_hex("80"), "00");
        assert_eq!(to_positive_hex("9abc"), "1abc");
    }

    #[test]
    fn low_nibble_is_untouched() {
        assert_eq!(to_positive_hex("7fff"), "7fff");
        assert_eq!(to_positive_hex("0123"), "0123");
        assert_eq!(to_positive_hex(""), "");
    }

    #[test]
    fn generated_serials_are_positive() {
        for _ in 0..500 {
            let s = random_hex();
            assert_eq!(s.len(), 18);
            let lead = s.chars().next().and_then(|c| c.to_digit(16)).unwrap();
            assert!(lead < 8, "{s}");
        }
    }

    #[test]
    fn parses_odd_length_and_separators() {
        assert_eq!(parse_hex("abc").unwrap().to_bytes(), vec![0x0a, 0xbc]);
        assert_eq!(parse_hex("01:02").unwrap().to_bytes(), vec![1, 2]);
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(parse_hex("xyz"), Err(Error::InvalidOptions(_))));
        assert!(matches!(parse_hex(""), Err(Error::InvalidOptions(_))));
        let long = "01".repeat(21);
        assert!(matches!(parse_hex(&long), Err(Error::InvalidOptions(_))));
    }
}
