//! Speed parameter parsing

use crate::{Result, SyntheError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaking rate handed to the engine as-is. Its meaning belongs to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Speed(pub i32);

impl Speed {
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPolicy {
    /// `atoi` semantics: leading digits win, garbage becomes 0, overflow saturates.
    #[default]
    Lenient,
    /// The whole argument must be a base-10 `i32`.
    Strict,
}

impl std::str::FromStr for SpeedPolicy {
    type Err = SyntheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(SpeedPolicy::Lenient),
            "strict" => Ok(SpeedPolicy::Strict),
            other => Err(SyntheError::Config(format!(
                "unknown speed policy '{}'",
                other
            ))),
        }
    }
}

impl SpeedPolicy {
    pub fn parse(self, arg: &str) -> Result<Speed> {
        match self {
            SpeedPolicy::Lenient => Ok(Speed(parse_leading_int(arg))),
            SpeedPolicy::Strict => arg
                .parse::<i32>()
                .map(Speed)
                .map_err(|_| SyntheError::InvalidSpeed(arg.to_string())),
        }
    }
}

fn parse_leading_int(arg: &str) -> i32 {
    let bytes = arg
        .trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'))
        .as_bytes();

    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_parsing() {
        let p = SpeedPolicy::Lenient;
        assert_eq!(p.parse("5").unwrap(), Speed(5));
        assert_eq!(p.parse("  130").unwrap(), Speed(130));
        assert_eq!(p.parse("-20").unwrap(), Speed(-20));
        assert_eq!(p.parse("+7").unwrap(), Speed(7));
        assert_eq!(p.parse("120abc").unwrap(), Speed(120));
        assert_eq!(p.parse("fast").unwrap(), Speed(0));
        assert_eq!(p.parse("").unwrap(), Speed(0));
        assert_eq!(p.parse("-").unwrap(), Speed(0));
    }

    #[test]
    fn test_lenient_saturates() {
        let p = SpeedPolicy::Lenient;
        assert_eq!(p.parse("99999999999999999999").unwrap(), Speed(i32::MAX));
        assert_eq!(p.parse("-99999999999999999999").unwrap(), Speed(i32::MIN));
        assert_eq!(p.parse("-2147483648").unwrap(), Speed(i32::MIN));
    }

    #[test]
    fn test_strict_parsing() {
        let p = SpeedPolicy::Strict;
        assert_eq!(p.parse("100").unwrap(), Speed(100));
        assert_eq!(p.parse("-3").unwrap(), Speed(-3));
        assert!(matches!(p.parse("120abc"), Err(SyntheError::InvalidSpeed(_))));
        assert!(matches!(p.parse(""), Err(SyntheError::InvalidSpeed(_))));
        assert!(matches!(
            p.parse("99999999999999999999"),
            Err(SyntheError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("strict".parse::<SpeedPolicy>().unwrap(), SpeedPolicy::Strict);
        assert_eq!("LENIENT".parse::<SpeedPolicy>().unwrap(), SpeedPolicy::Lenient);
        assert!("loose".parse::<SpeedPolicy>().is_err());
    }
}
