use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lower bound for a custom expiration.
pub const MIN_CUSTOM_SECONDS: u64 = 60;

/// Upper bound for a custom expiration: one year.
pub const MAX_CUSTOM_SECONDS: u64 = 31_536_000;

/// How long a stored secret lives before the backend expires it.
///
/// Presets map to fixed second counts; `Custom` carries raw seconds that are
/// validated against the bounds — out-of-range values are rejected with a
/// descriptive error, never clamped.
///
/// Wire form: presets serialize as `"one_hour"` etc., custom as
/// `{"custom": 90}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiration {
    OneHour,
    OneDay,
    OneWeek,
    TwoWeeks,
    Custom(u64),
}

impl Expiration {
    /// Resolve to a TTL in seconds, validating custom values.
    pub fn ttl_seconds(self) -> Result<u64, CoreError> {
        match self {
            Self::OneHour => Ok(3_600),
            Self::OneDay => Ok(86_400),
            Self::OneWeek => Ok(604_800),
            Self::TwoWeeks => Ok(1_209_600),
            Self::Custom(seconds) => {
                if !(MIN_CUSTOM_SECONDS..=MAX_CUSTOM_SECONDS).contains(&seconds) {
                    return Err(CoreError::InvalidExpiration(format!(
                        "custom expiration must be between {MIN_CUSTOM_SECONDS} and \
                         {MAX_CUSTOM_SECONDS} seconds, got {seconds}"
                    )));
                }
                Ok(seconds)
            }
        }
    }

    /// Map a raw second count onto a preset where one matches exactly.
    pub fn from_seconds(seconds: u64) -> Self {
        match seconds {
            3_600 => Self::OneHour,
            86_400 => Self::OneDay,
            604_800 => Self::OneWeek,
            1_209_600 => Self::TwoWeeks,
            other => Self::Custom(other),
        }
    }
}

/// Validate a raw TTL (the file flow sends plain seconds) against the same
/// bounds as a custom expiration.
pub fn validate_ttl_seconds(seconds: u64) -> Result<u64, CoreError> {
    Expiration::Custom(seconds).ttl_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_map_to_fixed_seconds() {
        assert_eq!(Expiration::OneHour.ttl_seconds().unwrap(), 3_600);
        assert_eq!(Expiration::OneDay.ttl_seconds().unwrap(), 86_400);
        assert_eq!(Expiration::OneWeek.ttl_seconds().unwrap(), 604_800);
        assert_eq!(Expiration::TwoWeeks.ttl_seconds().unwrap(), 1_209_600);
    }

    #[test]
    fn custom_below_minimum_is_rejected_with_description() {
        let err = Expiration::Custom(30).ttl_seconds().unwrap_err();
        match err {
            CoreError::InvalidExpiration(msg) => {
                assert!(msg.contains("60"));
                assert!(msg.contains("30"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn custom_bounds_are_inclusive() {
        assert_eq!(Expiration::Custom(60).ttl_seconds().unwrap(), 60);
        assert_eq!(
            Expiration::Custom(MAX_CUSTOM_SECONDS).ttl_seconds().unwrap(),
            MAX_CUSTOM_SECONDS
        );
        assert!(Expiration::Custom(59).ttl_seconds().is_err());
        assert!(Expiration::Custom(MAX_CUSTOM_SECONDS + 1).ttl_seconds().is_err());
        assert!(Expiration::Custom(0).ttl_seconds().is_err());
    }

    #[test]
    fn from_seconds_prefers_presets() {
        assert_eq!(Expiration::from_seconds(3_600), Expiration::OneHour);
        assert_eq!(Expiration::from_seconds(90), Expiration::Custom(90));
    }

    #[test]
    fn wire_format() {
        assert_eq!(
            serde_json::to_string(&Expiration::OneHour).unwrap(),
            r#""one_hour""#
        );
        assert_eq!(
            serde_json::to_string(&Expiration::Custom(90)).unwrap(),
            r#"{"custom":90}"#
        );
        let parsed: Expiration = serde_json::from_str(r#""two_weeks""#).unwrap();
        assert_eq!(parsed, Expiration::TwoWeeks);

        // Non-integer custom values never make it past deserialization.
        assert!(serde_json::from_str::<Expiration>(r#"{"custom":"soon"}"#).is_err());
        assert!(serde_json::from_str::<Expiration>(r#"{"custom":1.5}"#).is_err());
    }
}
