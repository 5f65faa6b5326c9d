//! Durations written the way node configuration files write them ("60s", "1m30s").

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::Merge;

/// Error parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration '{0}'")]
pub struct DurationError(pub String);

/// A configuration duration. Zero means "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(std::time::Duration);

impl Duration {
    pub const ZERO: Duration = Duration(std::time::Duration::ZERO);

    pub fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(std::time::Duration::from_millis(millis))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_std(&self) -> std::time::Duration {
        self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(d)
    }
}

impl Merge for Duration {
    const ATOMIC: bool = true;

    fn merge_from(&mut self, other: &Self) {
        if !other.is_zero() {
            *self = *other;
        }
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    /// Parse a sequence of `<number><unit>` pairs, e.g. "1h30m", "1.5s", "250ms".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = || DurationError(s.to_string());
        if input.is_empty() || input == "0" {
            return Ok(Self::ZERO);
        }

        let mut total: u128 = 0;
        let mut rest = input;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .ok_or_else(invalid)?;
            let (number, tail) = rest.split_at(number_len);
            let unit_len = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_len);

            if number.is_empty() {
                return Err(invalid());
            }
            let scale = unit_nanos(unit).ok_or_else(invalid)?;

            let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
            let whole: u128 = if whole.is_empty() {
                0
            } else {
                whole.parse().map_err(|_| invalid())?
            };
            total = whole
                .checked_mul(scale)
                .and_then(|nanos| total.checked_add(nanos))
                .ok_or_else(invalid)?;

            if !frac.is_empty() {
                let digits: u128 = frac.parse().map_err(|_| invalid())?;
                let denom = 10u128
                    .checked_pow(frac.len() as u32)
                    .ok_or_else(invalid)?;
                let nanos = digits.checked_mul(scale).ok_or_else(invalid)? / denom;
                total = total.checked_add(nanos).ok_or_else(invalid)?;
            }
            rest = tail;
        }

        let secs = u64::try_from(total / 1_000_000_000).map_err(|_| invalid())?;
        let nanos = (total % 1_000_000_000) as u32;
        Ok(Self(std::time::Duration::new(secs, nanos)))
    }
}

impl fmt::Display for Duration {
    /// Format like "1h2m3.5s"; sub-second values use ms/us/ns.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        if d.is_zero() {
            return f.write_str("0s");
        }
        if d.as_secs() == 0 {
            let nanos = d.subsec_nanos();
            return if nanos % 1_000_000 == 0 {
                write!(f, "{}ms", nanos / 1_000_000)
            } else if nanos % 1_000 == 0 {
                write!(f, "{}us", nanos / 1_000)
            } else {
                write!(f, "{}ns", nanos)
            };
        }

        let secs = d.as_secs();
        let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        let nanos = d.subsec_nanos();
        if nanos == 0 {
            write!(f, "{}s", seconds)
        } else {
            let frac = format!("{:09}", nanos);
            write!(f, "{}.{}s", seconds, frac.trim_end_matches('0'))
        }
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Duration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a duration string such as \"60s\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
                v.parse().map_err(E::custom)
            }

            /// Bare integers are seconds.
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
                Ok(Duration::from_secs(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
                u64::try_from(v)
                    .map(Duration::from_secs)
                    .map_err(|_| E::custom(DurationError(v.to_string())))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Duration, E> {
                Ok(Duration::ZERO)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("60s".parse::<Duration>().unwrap(), Duration::from_secs(60));
        assert_eq!("1m30s".parse::<Duration>().unwrap(), Duration::from_secs(90));
        assert_eq!("2h".parse::<Duration>().unwrap(), Duration::from_secs(7200));
        assert_eq!("250ms".parse::<Duration>().unwrap(), Duration::from_millis(250));
        assert_eq!("1.5s".parse::<Duration>().unwrap(), Duration::from_millis(1500));
        assert_eq!("".parse::<Duration>().unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("10".parse::<Duration>().is_err());
        assert!("10 parsecs".parse::<Duration>().is_err());
        assert!("s".parse::<Duration>().is_err());
    }

    #[test]
    fn test_parse_oversized_is_rejected() {
        let err = "99999999999999999999999999999h".parse::<Duration>().unwrap_err();
        assert_eq!(err, DurationError("99999999999999999999999999999h".to_string()));
        assert!("1.99999999999999999999999999999999h".parse::<Duration>().is_err());
        assert!("99999999999999999999h".parse::<Duration>().is_err());

        let result: Result<Duration, _> = serde_yaml::from_str("\"99999999999999999999999999999h\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Duration::from_secs(13).to_string(), "13s");
        assert_eq!(Duration::from_secs(60).to_string(), "1m0s");
        assert_eq!(Duration::from_secs(3725).to_string(), "1h2m5s");
        assert_eq!(Duration::from_millis(1500).to_string(), "1.5s");
        assert_eq!(Duration::from_millis(100).to_string(), "100ms");
        assert_eq!(Duration::ZERO.to_string(), "0s");
    }

    #[test]
    fn test_display_parses_back() {
        for d in [
            Duration::from_secs(3725),
            Duration::from_millis(1500),
            Duration::from_millis(100),
        ] {
            assert_eq!(d.to_string().parse::<Duration>().unwrap(), d);
        }
    }

    #[test]
    fn test_yaml() {
        #[derive(Deserialize)]
        struct Holder {
            a: Duration,
            b: Duration,
        }
        let holder: Holder = serde_yaml::from_str("a: 5m\nb: 30\n").unwrap();
        assert_eq!(holder.a, Duration::from_secs(300));
        assert_eq!(holder.b, Duration::from_secs(30));
    }

    #[test]
    fn test_merge_zero_keeps_baseline() {
        let mut base = Duration::from_secs(60);
        base.merge_from(&Duration::ZERO);
        assert_eq!(base, Duration::from_secs(60));
        base.merge_from(&Duration::from_secs(13));
        assert_eq!(base, Duration::from_secs(13));
    }
}
