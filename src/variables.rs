//! Variable codec
//!
//! The platform stores `variables` as a serialized document string. Declared
//! state carries them as a flat string map. An empty map always travels as
//! the absent form (`null`), never as `"{}"`, so a read after an apply does
//! not show a spurious diff.

use std::collections::BTreeMap;
use thiserror::Error;

/// Flat string-to-string variables map
pub type Variables = BTreeMap<String, String>;

/// A variables payload that could not be converted
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode variables: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed variables {raw:?}: {source}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Raw payload that failed to decode
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Decode { raw, .. } => Some(raw),
            Self::Encode { .. } => None,
        }
    }
}

/// Encode variables for the wire
///
/// Returns `None` for an empty map.
pub fn encode(variables: &Variables) -> Result<Option<String>, CodecError> {
    if variables.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(variables)
        .map(Some)
        .map_err(|source| CodecError::Encode { source })
}

/// Decode variables received from the wire
///
/// Absent, blank, `null` and the empty YAML document `---` all decode to an
/// empty map. Anything else must be a JSON object with string values.
pub fn decode(raw: Option<&str>) -> Result<Variables, CodecError> {
    let Some(raw) = raw else {
        return Ok(Variables::new());
    };

    let trimmed = raw.trim();
    if is_empty_document(trimmed) {
        return Ok(Variables::new());
    }

    serde_json::from_str(trimmed).map_err(|source| CodecError::Decode {
        raw: raw.to_string(),
        source,
    })
}

fn is_empty_document(trimmed: &str) -> bool {
    matches!(trimmed, "" | "null" | "{}" | "---")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_encodes_to_absent() {
        assert_eq!(encode(&Variables::new()).unwrap(), None);
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            Variables::new(),
            vars(&[("ansible_host", "10.0.0.5")]),
            vars(&[("a", ""), ("b", "with \"quotes\""), ("ü", "ünïcode\nline")]),
        ];
        for m in cases {
            let wire = encode(&m).unwrap();
            assert_eq!(decode(wire.as_deref()).unwrap(), m);
        }
    }

    #[test]
    fn test_encode_is_json_object() {
        let wire = encode(&vars(&[("b", "2"), ("a", "1")])).unwrap().unwrap();
        assert_eq!(wire, r#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn test_decode_empty_forms() {
        for raw in [None, Some(""), Some("  \n"), Some("null"), Some("{}"), Some("---\n")] {
            assert!(decode(raw).unwrap().is_empty(), "{raw:?}");
        }
    }

    #[test]
    fn test_decode_platform_payload_with_whitespace() {
        let decoded = decode(Some("{\n  \"tier\": \"front\"\n}")).unwrap();
        assert_eq!(decoded, vars(&[("tier", "front")]));
    }

    #[test]
    fn test_decode_malformed_keeps_raw() {
        let err = decode(Some("tier: front")).unwrap_err();
        assert_eq!(err.raw(), Some("tier: front"));
        assert!(err.to_string().contains("tier: front"));
    }

    #[test]
    fn test_decode_rejects_non_string_values() {
        assert!(decode(Some(r#"{"port": 22}"#)).is_err());
        assert!(decode(Some(r#"["a"]"#)).is_err());
    }
}
