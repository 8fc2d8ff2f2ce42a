//! Event frame encoding and decoding

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{SimCodecError, TelemetryRecord};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix of a socket.io event frame: engine.io "message" (4) followed by
/// socket.io "event" (2).
pub const EVENT_FRAME_PREFIX: &str = "42";

/// Name of the event the simulator sends its telemetry on.
pub const TELEMETRY_EVENT: &str = "telemetry";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An event received from the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A telemetry event carrying data.
    Telemetry(TelemetryRecord),

    /// A telemetry event without data, the simulator is in manual mode.
    Manual,

    /// Any other named event, not acted on.
    Other(String),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode a text message from the simulator.
///
/// Returns `Ok(None)` for messages which are not event frames (engine.io
/// pings, connect packets and so on), which need no reply.
pub fn decode_frame(frame: &str) -> Result<Option<SimEvent>, SimCodecError> {
    let body = match frame.strip_prefix(EVENT_FRAME_PREFIX) {
        Some(b) if !b.is_empty() => b,
        _ => return Ok(None),
    };

    let value: Value = serde_json::from_str(body).map_err(SimCodecError::InvalidJson)?;

    let (name, payload) = match value.as_array() {
        Some(arr) => match arr.first().and_then(Value::as_str) {
            Some(name) => (name, arr.get(1)),
            None => return Err(SimCodecError::MissingEventName),
        },
        None => return Err(SimCodecError::MissingEventName),
    };

    if name != TELEMETRY_EVENT {
        return Ok(Some(SimEvent::Other(name.to_string())));
    }

    match payload {
        None | Some(Value::Null) => Ok(Some(SimEvent::Manual)),
        Some(p) => TelemetryRecord::deserialize(p)
            .map(|rec| Some(SimEvent::Telemetry(rec)))
            .map_err(SimCodecError::MalformedTelemetry),
    }
}

/// Encode an event with the given name and payload into a frame.
pub fn encode_event<T: Serialize>(name: &str, payload: &T) -> Result<String, SimCodecError> {
    let body = serde_json::to_string(&(name, payload)).map_err(SimCodecError::SerializationError)?;

    Ok(format!("{}{}", EVENT_FRAME_PREFIX, body))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_telemetry() {
        let event = decode_frame(
            r#"42["telemetry",{"cte":"0.7598","speed":"0.4380","steering_angle":"0.0000","throttle":"0.0000"}]"#,
        )
        .unwrap();

        assert_eq!(
            event,
            Some(SimEvent::Telemetry(TelemetryRecord {
                cte: 0.7598,
                speed: 0.4380,
                steering_angle: 0.0
            }))
        );
    }

    #[test]
    fn test_decode_manual() {
        assert_eq!(
            decode_frame(r#"42["telemetry",null]"#).unwrap(),
            Some(SimEvent::Manual)
        );
        assert_eq!(
            decode_frame(r#"42["telemetry"]"#).unwrap(),
            Some(SimEvent::Manual)
        );
    }

    #[test]
    fn test_decode_other() {
        assert_eq!(
            decode_frame(r#"42["connect",{}]"#).unwrap(),
            Some(SimEvent::Other("connect".into()))
        );
        assert_eq!(decode_frame("2").unwrap(), None);
        assert_eq!(decode_frame("42").unwrap(), None);
        assert_eq!(decode_frame("40").unwrap(), None);
    }

    #[test]
    fn test_decode_errors() {
        match decode_frame(r#"42["telemetry",{"cte":"x","speed":"0","steering_angle":"0"}]"#) {
            Err(SimCodecError::MalformedTelemetry(_)) => (),
            r => panic!("Expected malformed telemetry, got {:?}", r),
        }
        match decode_frame("42[not json") {
            Err(SimCodecError::InvalidJson(_)) => (),
            r => panic!("Expected invalid JSON, got {:?}", r),
        }
        match decode_frame(r#"42{"telemetry":1}"#) {
            Err(SimCodecError::MissingEventName) => (),
            r => panic!("Expected missing event name, got {:?}", r),
        }
    }
}
