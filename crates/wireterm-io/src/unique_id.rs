//! Unique-ID escaping and the combined `driver-deviceid` token.
//!
//! A driver-local device ID is an opaque string that may contain anything
//! (`/dev/ttyUSB0`, `192.168.1.7:2000`). To embed one in a single token we
//! escape every byte outside `[A-Za-z0-9]` as `_<decimal-byte>_`, then glue
//! it to the driver name with a `-`. Driver names are restricted to
//! alphanumerics, so the first `-` in a combined ID is always the
//! separator.

use crate::error::HandleError;

/// Escape a device ID so it only contains `[A-Za-z0-9_]`.
///
/// Every byte outside `[A-Za-z0-9]` is replaced by `_<decimal>_`, e.g.
/// `/dev/tty` becomes `_47_dev_47_tty`.
pub fn escape(device_id: &str) -> String {
    let mut escaped = String::with_capacity(device_id.len() * 2);
    for byte in device_id.bytes() {
        if byte.is_ascii_alphanumeric() {
            escaped.push(byte as char);
        } else {
            escaped.push('_');
            escaped.push_str(&byte.to_string());
            escaped.push('_');
        }
    }
    escaped
}

/// Reverse [`escape`].
///
/// Scans for `_`, consumes the decimal digits up to the closing `_` and
/// substitutes the byte. Sequences that do not parse as a byte (missing
/// closing `_`, empty digits, value over 255) are passed through
/// literally; [`escape`] never produces them.
pub fn unescape(escaped: &str) -> String {
    let bytes = escaped.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let digits_start = i + 1;
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let terminated = j < bytes.len() && bytes[j] == b'_' && j > digits_start;
            if terminated {
                let digits = &escaped[digits_start..j];
                if let Ok(value) = digits.parse::<u8>() {
                    out.push(value);
                    i = j + 1;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    // Escaped input is pure ASCII; substituted bytes reassemble the
    // original UTF-8 sequence.
    String::from_utf8_lossy(&out).into_owned()
}

/// Build the combined `<driver>-<escaped-device-id>` unique ID.
pub fn combine(driver_name: &str, device_id: &str) -> String {
    format!("{driver_name}-{}", escape(device_id))
}

/// Split a combined unique ID back into `(driver_name, device_id)`.
///
/// # Errors
///
/// [`HandleError::MalformedId`] when the `-` separator is missing.
pub fn split(combined: &str) -> Result<(String, String), HandleError> {
    let sep = combined
        .find('-')
        .ok_or_else(|| HandleError::MalformedId(combined.to_string()))?;
    let driver_name = combined[..sep].to_string();
    let device_id = unescape(&combined[sep + 1..]);
    Ok((driver_name, device_id))
}

/// Split a URI into its leading letters-only prefix (uppercased) and the
/// full URI for the driver to parse.
///
/// The prefix is matched case-insensitively against each driver's
/// registered URI prefix, so `tcp://host:port` and `TCP://host:port`
/// select the same driver.
pub fn uri_prefix(uri: &str) -> String {
    uri.chars()
        .take_while(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_alphanumerics_alone() {
        assert_eq!(escape("COM1"), "COM1");
        assert_eq!(escape("abcXYZ019"), "abcXYZ019");
    }

    #[test]
    fn escape_rewrites_special_bytes() {
        assert_eq!(escape("/dev/tty0"), "_47_dev_47_tty0");
        assert_eq!(escape("a b"), "a_32_b");
        assert_eq!(escape("_"), "_95_");
    }

    #[test]
    fn unescape_reverses_escape() {
        for id in ["/dev/ttyUSB0", "192.168.1.7:2000", "a_b-c d", "", "__"] {
            assert_eq!(unescape(&escape(id)), id, "round trip of {id:?}");
        }
    }

    #[test]
    fn unescape_passes_malformed_sequences_through() {
        // No closing underscore
        assert_eq!(unescape("_47"), "_47");
        // Empty digit run
        assert_eq!(unescape("__"), "__");
        // Value out of byte range
        assert_eq!(unescape("_300_"), "_300_");
    }

    #[test]
    fn combine_and_split_round_trip() {
        let combined = combine("TCPClient", "host:2000");
        assert_eq!(combined, "TCPClient-host_58_2000");
        let (driver, device) = split(&combined).unwrap();
        assert_eq!(driver, "TCPClient");
        assert_eq!(device, "host:2000");
    }

    #[test]
    fn split_without_separator_fails() {
        assert!(matches!(split("NoSeparatorHere"), Err(HandleError::MalformedId(_))));
    }

    #[test]
    fn uri_prefix_takes_leading_letters_uppercased() {
        assert_eq!(uri_prefix("tcp://host:2000"), "TCP");
        assert_eq!(uri_prefix("COM1:baud=9600"), "COM");
        assert_eq!(uri_prefix("://nothing"), "");
    }
}
