//! Commands sent to the simulator

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde_json::{json, Value};

use super::SimCodecError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the simulator. Exactly one is sent in reply to each
/// telemetry event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimCommand {
    /// Drive the vehicle with the given demands.
    Steer {
        /// Normalised steering demand, positive steers right.
        steering_angle: f64,

        /// Normalised throttle demand.
        throttle: f64,
    },

    /// Restart the simulation episode.
    Reset,

    /// Hand control back to the simulator's manual mode.
    Manual,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCommand {
    /// The name of the event carrying this command.
    pub fn event_name(&self) -> &'static str {
        match self {
            SimCommand::Steer { .. } => "steer",
            SimCommand::Reset => "reset",
            SimCommand::Manual => "manual",
        }
    }

    /// The JSON payload of the event.
    pub fn payload(&self) -> Value {
        match *self {
            SimCommand::Steer {
                steering_angle,
                throttle,
            } => json!({
                "steering_angle": steering_angle,
                "throttle": throttle
            }),
            SimCommand::Reset | SimCommand::Manual => json!({}),
        }
    }

    /// Encode the command as an event frame ready to be sent as a text
    /// message.
    pub fn to_frame(&self) -> Result<String, SimCodecError> {
        super::encode_event(self.event_name(), &self.payload())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frames() {
        assert_eq!(
            SimCommand::Steer {
                steering_angle: -0.25,
                throttle: 0.3
            }
            .to_frame()
            .unwrap(),
            r#"42["steer",{"steering_angle":-0.25,"throttle":0.3}]"#
        );
        assert_eq!(SimCommand::Reset.to_frame().unwrap(), r#"42["reset",{}]"#);
        assert_eq!(SimCommand::Manual.to_frame().unwrap(), r#"42["manual",{}]"#);
    }
}
