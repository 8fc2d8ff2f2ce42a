//! Telemetry received from the simulator

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::Error, Deserialize, Deserializer};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One telemetry snapshot of the simulated vehicle.
///
/// The simulator sends the numeric fields as strings, plain JSON numbers are
/// accepted too. Any other fields (such as the camera image) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TelemetryRecord {
    /// Cross track error, the signed lateral distance from the desired path.
    #[serde(deserialize_with = "de_finite_f64")]
    pub cte: f64,

    /// Vehicle speed.
    ///
    /// Units: miles per hour
    #[serde(deserialize_with = "de_finite_f64")]
    pub speed: f64,

    /// Current steering angle.
    ///
    /// Units: degrees
    #[serde(deserialize_with = "de_finite_f64")]
    pub steering_angle: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(f64),
    Str(String),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Deserialize a finite float from either a JSON number or a numeric string.
fn de_finite_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => n,
        NumOrString::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| D::Error::custom(format!("\"{}\" is not a number ({})", s, e)))?,
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(D::Error::custom(format!("{} is not a finite number", value)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_string_fields() {
        let rec: TelemetryRecord = serde_json::from_str(
            r#"{"cte":"0.7598","speed":"0.4380","steering_angle":"-1.5","throttle":"0","image":"abc"}"#,
        )
        .unwrap();

        assert_eq!(
            rec,
            TelemetryRecord {
                cte: 0.7598,
                speed: 0.4380,
                steering_angle: -1.5
            }
        );
    }

    #[test]
    fn test_number_fields() {
        let rec: TelemetryRecord =
            serde_json::from_str(r#"{"cte":-2,"speed":31.5,"steering_angle":0.0}"#).unwrap();

        assert_eq!(rec.cte, -2.0);
        assert_eq!(rec.speed, 31.5);
    }

    #[test]
    fn test_malformed_fields() {
        assert!(serde_json::from_str::<TelemetryRecord>(
            r#"{"cte":"left","speed":"1","steering_angle":"0"}"#
        )
        .is_err());
        assert!(serde_json::from_str::<TelemetryRecord>(
            r#"{"cte":"NaN","speed":"1","steering_angle":"0"}"#
        )
        .is_err());
        assert!(
            serde_json::from_str::<TelemetryRecord>(r#"{"speed":"1","steering_angle":"0"}"#)
                .is_err()
        );
    }
}
