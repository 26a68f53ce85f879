//! JSON encoding and decoding of a single [`Reading`].

use thiserror::Error;

use crate::domain::reading::Reading;

/// Error type for wire encoding/decoding.
#[derive(Debug, Error)]
pub enum WireError {
    /// The reading could not be serialised.
    #[error("failed to encode reading: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a JSON integer.
    #[error("failed to decode reading: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame is a JSON integer but does not fit in a byte.
    #[error("reading {0} is outside 0..=255")]
    OutOfRange(i64),
}

/// Encodes a reading as the JSON text sent in one WebSocket frame.
///
/// # Errors
///
/// Returns [`WireError::Encode`] if serde_json fails.
pub fn encode_reading(reading: Reading) -> Result<String, WireError> {
    serde_json::to_string(&reading).map_err(WireError::Encode)
}

/// Parses the JSON text of one frame back into a reading.
///
/// Surrounding whitespace is accepted.
///
/// # Errors
///
/// Returns [`WireError::Decode`] for anything that is not a JSON integer and
/// [`WireError::OutOfRange`] for integers outside `0..=255`.
pub fn decode_reading(text: &str) -> Result<Reading, WireError> {
    let value: i64 = serde_json::from_str(text.trim()).map_err(WireError::Decode)?;
    u8::try_from(value)
        .map(Reading::new)
        .map_err(|_| WireError::OutOfRange(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_bare_integer() {
        assert_eq!(encode_reading(Reading::new(42)).unwrap(), "42");
        assert_eq!(encode_reading(Reading::new(0)).unwrap(), "0");
        assert_eq!(encode_reading(Reading::new(255)).unwrap(), "255");
    }

    #[test]
    fn test_decode_accepts_whitespace() {
        let reading = decode_reading(" 200\n").unwrap();
        assert_eq!(reading.value(), 200);
    }

    #[test]
    fn test_decode_rejects_out_of_range() {
        assert!(matches!(decode_reading("256"), Err(WireError::OutOfRange(256))));
        assert!(matches!(decode_reading("-1"), Err(WireError::OutOfRange(-1))));
    }

    #[test]
    fn test_decode_rejects_non_integer() {
        assert!(matches!(decode_reading("\"5\""), Err(WireError::Decode(_))));
        assert!(matches!(decode_reading("{\"value\":5}"), Err(WireError::Decode(_))));
        assert!(matches!(decode_reading("4.5"), Err(WireError::Decode(_))));
    }
}
