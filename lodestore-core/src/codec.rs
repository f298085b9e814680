//! Payload serialization for text-typed storage columns.

use serde_json::Value;

/// Serializes chunk payloads to and from their stored text form.
///
/// The relational backend requires a codec at construction; the in-memory
/// backend keeps payloads as values and never serializes.
pub trait Codec: Send + Sync {
    /// Codec-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Serialize a payload to its stored text form.
    ///
    /// # Errors
    ///
    /// Returns a codec-specific error when the value cannot be serialized.
    fn serialize(&self, payload: &Value) -> Result<String, Self::Error>;

    /// Deserialize a payload from its stored text form.
    ///
    /// # Errors
    ///
    /// Returns a codec-specific error when the text cannot be parsed.
    fn deserialize(&self, raw: &str) -> Result<Value, Self::Error>;
}

/// JSON codec backed by `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Error = serde_json::Error;

    fn serialize(&self, payload: &Value) -> Result<String, Self::Error> {
        serde_json::to_string(payload)
    }

    fn deserialize(&self, raw: &str) -> Result<Value, Self::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_codec_roundtrips() {
        let codec = JsonCodec;
        let value = json!({"amount": 42, "note": "refund"});
        let text = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&text).unwrap(), value);
    }

    #[test]
    fn json_codec_rejects_invalid_text() {
        let codec = JsonCodec;
        assert!(codec.deserialize("not valid json").is_err());
    }
}
