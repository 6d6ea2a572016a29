//! Result of one account execution and its wire encoding.
//!
//! The parallel executor only carries strings across the execution
//! boundary, so the outcome travels as `"<deleted>/<remaining>/<0|1>"` and is
//! parsed back right after.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeParseError {
    #[error("expected `<deleted>/<remaining>/<done>`, got `{0}`")]
    Shape(String),
    #[error("`{0}` is not a keyword count")]
    Count(String),
    #[error("done flag must be 0 or 1, got `{0}`")]
    Flag(String),
}

/// What one execution did to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitOutcome {
    /// Keywords removed during this execution.
    pub deleted: u64,
    /// Keywords still matching at the start of this execution and not removed by it.
    pub remaining: u64,
    /// The account has nothing left to sweep.
    pub done: bool,
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.deleted, self.remaining, u8::from(self.done))
    }
}

impl FromStr for UnitOutcome {
    type Err = OutcomeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('/').collect();
        let [deleted, remaining, done] = fields.as_slice() else {
            return Err(OutcomeParseError::Shape(s.to_string()));
        };
        let count = |v: &str| {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                return Err(OutcomeParseError::Count(v.to_string()));
            }
            v.parse::<u64>()
                .map_err(|_| OutcomeParseError::Count(v.to_string()))
        };
        let done = match *done {
            "0" => false,
            "1" => true,
            other => return Err(OutcomeParseError::Flag(other.to_string())),
        };
        Ok(UnitOutcome {
            deleted: count(deleted)?,
            remaining: count(remaining)?,
            done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_as_slash_separated_integers() {
        let o = UnitOutcome {
            deleted: 2,
            remaining: 1,
            done: false,
        };
        assert_eq!(o.to_string(), "2/1/0");
        assert_eq!("2/1/0".parse::<UnitOutcome>().unwrap(), o);
        assert!("0/0/1".parse::<UnitOutcome>().unwrap().done);
    }

    #[test]
    fn rejects_anything_else() {
        assert!(matches!("2/1".parse::<UnitOutcome>(), Err(OutcomeParseError::Shape(_))));
        assert!(matches!("2/1/0/0".parse::<UnitOutcome>(), Err(OutcomeParseError::Shape(_))));
        assert!(matches!("-2/1/0".parse::<UnitOutcome>(), Err(OutcomeParseError::Count(_))));
        assert!(matches!("2.0/1/0".parse::<UnitOutcome>(), Err(OutcomeParseError::Count(_))));
        assert!(matches!("/1/0".parse::<UnitOutcome>(), Err(OutcomeParseError::Count(_))));
        assert!(matches!("2/1/yes".parse::<UnitOutcome>(), Err(OutcomeParseError::Flag(_))));
        assert!(matches!("".parse::<UnitOutcome>(), Err(OutcomeParseError::Shape(_))));
    }
}
