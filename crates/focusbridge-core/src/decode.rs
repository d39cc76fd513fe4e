use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Parse interpreter stdout as one `{success, ...}` envelope and return the
/// payload (everything except `success`) as `T`.
pub fn decode_envelope<T: DeserializeOwned>(stdout: &str) -> Result<T, BridgeError> {
    let payload = decode_payload(stdout)?;
    serde_json::from_value(Value::Object(payload)).map_err(|err| {
        BridgeError::decode(format!("unexpected envelope payload: {}", err), stdout)
    })
}

pub fn decode_payload(stdout: &str) -> Result<Map<String, Value>, BridgeError> {
    let text = stdout.trim();
    if text.is_empty() {
        return Err(BridgeError::decode("interpreter produced no output", stdout));
    }
    let value: Value = serde_json::from_str(text)
        .map_err(|err| BridgeError::decode(format!("output is not JSON: {}", err), stdout))?;
    let Value::Object(mut envelope) = value else {
        return Err(BridgeError::decode("envelope is not a JSON object", stdout));
    };
    let success = match envelope.remove("success") {
        Some(Value::Bool(success)) => success,
        Some(_) => {
            return Err(BridgeError::decode("envelope field success is not a boolean", stdout))
        }
        None => return Err(BridgeError::decode("envelope is missing success", stdout)),
    };
    if !success {
        let message = match envelope.get("error") {
            Some(Value::String(message)) if !message.trim().is_empty() => message.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                "automation reported a failure without a message".to_string()
            }
            Some(other) => other.to_string(),
        };
        return Err(BridgeError::Business(message));
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Created {
        tag_id: String,
        name: String,
    }

    #[test]
    fn success_payload_is_typed() {
        let created: Created =
            decode_envelope("  {\"success\":true,\"tagId\":\"t1\",\"name\":\"Alpha\"}\n").expect("decode");
        assert_eq!(
            created,
            Created {
                tag_id: "t1".into(),
                name: "Alpha".into()
            }
        );
    }

    #[test]
    fn failure_envelopes_surface_the_error_message() {
        let err = decode_envelope::<Created>("{\"success\":false,\"error\":\"Tag not found: x\"}")
            .expect_err("failure");
        assert_eq!(err, BridgeError::Business("Tag not found: x".into()));
    }

    #[test]
    fn missing_or_mistyped_success_is_a_decode_error() {
        for raw in ["{\"tagId\":\"t1\"}", "{\"success\":\"yes\"}", "[1,2]"] {
            let err = decode_payload(raw).expect_err("decode error");
            assert_eq!(err.kind(), "decode", "{raw}");
        }
    }

    #[test]
    fn non_json_output_keeps_raw_text() {
        let err = decode_payload("execution error: Error: SyntaxError (-2700)").expect_err("decode");
        match err {
            BridgeError::Decode { raw, .. } => assert!(raw.contains("SyntaxError")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn payload_shape_mismatch_is_a_decode_error() {
        let err = decode_envelope::<Created>("{\"success\":true,\"name\":\"Alpha\"}").expect_err("shape");
        assert_eq!(err.kind(), "decode");
    }
}
