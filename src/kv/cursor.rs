//! Cursor codec.
//!
//! A cursor is the standard base64 encoding of the UTF-8 bytes of the last
//! key on a page. It carries no namespace or filter state.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{Error, Result};

/// Encodes the last key of a page as a cursor.
pub fn encode(last_key: &str) -> String {
    BASE64.encode(last_key.as_bytes())
}

/// Recovers the last key from a cursor.
///
/// # Errors
///
/// Returns [`Error::InvalidCursor`] if the cursor is not base64 or does not
/// decode to UTF-8.
pub fn decode(cursor: &str) -> Result<String> {
    let bytes = BASE64
        .decode(cursor.as_bytes())
        .map_err(|e| Error::invalid_cursor(cursor, e))?;
    String::from_utf8(bytes).map_err(|e| Error::invalid_cursor(cursor, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_known_encoding() {
        assert_eq!(encode("KEY_2"), "S0VZXzI=");
        assert_eq!(decode("S0VZXzI=").unwrap(), "KEY_2");
    }

    #[test]
    fn test_unicode_key() {
        let key = "ключ/日本/🙂";
        assert_eq!(decode(&encode(key)).unwrap(), key);
    }

    #[test]
    fn test_malformed_cursor_is_client_error() {
        for cursor in ["not base64!", "S0VZ_zI", "/w=="] {
            let err = decode(cursor).unwrap_err();
            assert!(matches!(err, Error::InvalidCursor { .. }), "{cursor}");
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    proptest! {
        #[test]
        fn cursor_inverts_encoding(key in "\\PC{0,64}") {
            let cursor = encode(&key);
            prop_assert!(cursor.is_ascii());
            prop_assert_eq!(decode(&cursor).unwrap(), key);
        }
    }
}
