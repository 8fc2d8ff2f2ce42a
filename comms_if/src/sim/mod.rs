//! # Simulator interface
//!
//! The simulator talks in Socket.IO style event frames carried as WebSocket
//! text messages. An event frame is the characters `42` (engine.io message,
//! socket.io event) followed by a JSON array of the event name and its
//! payload:
//!
//! ```text
//! 42["telemetry",{"cte":"0.7598","speed":"0.4380","steering_angle":"0.0000"}]
//! 42["steer",{"steering_angle":-0.05,"throttle":0.3}]
//! ```

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod codec;
mod command;
mod telemetry;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use codec::*;
pub use command::*;
pub use telemetry::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when encoding or decoding simulator frames.
#[derive(Debug, thiserror::Error)]
pub enum SimCodecError {
    #[error("Frame body is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Expected the frame body to be an array starting with the event name")]
    MissingEventName,

    #[error("Telemetry payload is malformed: {0}")]
    MalformedTelemetry(serde_json::Error),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),
}
