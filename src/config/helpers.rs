use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Reads a `Duration` given as a number of milliseconds.
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Reads a `Duration` given as a number of seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct PollSettings {
        #[serde(deserialize_with = "deserialize_duration_from_ms")]
        polling_interval_ms: Duration,
        #[serde(deserialize_with = "deserialize_duration_from_seconds")]
        shutdown_timeout: Duration,
    }

    #[test]
    fn test_durations_read_from_units() {
        let json = r#"{"polling_interval_ms": 2500, "shutdown_timeout": 45}"#;
        let settings: PollSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.polling_interval_ms, Duration::from_millis(2500));
        assert_eq!(settings.shutdown_timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let json = r#"{"polling_interval_ms": -1, "shutdown_timeout": 1}"#;
        let result: Result<PollSettings, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
