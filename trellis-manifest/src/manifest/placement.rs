//! Where a plugin lowering pass runs relative to the host passes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Position of a plugin pass in the lowering plan.
///
/// Written in the manifest as `"first"`, `"last"`, `"before:<pass>"` or
/// `"after:<pass>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Placement {
    First,
    #[default]
    Last,
    Before(String),
    After(String),
}

impl Placement {
    /// The host pass this placement is anchored to, if any.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Placement::Before(anchor) | Placement::After(anchor) => Some(anchor),
            Placement::First | Placement::Last => None,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::First => write!(f, "first"),
            Placement::Last => write!(f, "last"),
            Placement::Before(anchor) => write!(f, "before:{}", anchor),
            Placement::After(anchor) => write!(f, "after:{}", anchor),
        }
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "first" => return Ok(Placement::First),
            "last" => return Ok(Placement::Last),
            _ => {}
        }

        let (position, anchor) = s.split_once(':').ok_or_else(|| {
            format!(
                "invalid placement '{}', expected 'first', 'last', 'before:<pass>' or 'after:<pass>'",
                s
            )
        })?;
        let anchor = anchor.trim();
        if anchor.is_empty() {
            return Err(format!("placement '{}' names no pass", s));
        }

        match position.trim() {
            "before" => Ok(Placement::Before(anchor.to_string())),
            "after" => Ok(Placement::After(anchor.to_string())),
            other => Err(format!(
                "invalid placement position '{}', expected 'before' or 'after'",
                other
            )),
        }
    }
}

impl TryFrom<String> for Placement {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Placement> for String {
    fn from(value: Placement) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placements() {
        assert_eq!("first".parse::<Placement>().unwrap(), Placement::First);
        assert_eq!("last".parse::<Placement>().unwrap(), Placement::Last);
        assert_eq!(
            "before:fold-constants".parse::<Placement>().unwrap(),
            Placement::Before("fold-constants".into())
        );
        assert_eq!(
            "after: flatten-blocks".parse::<Placement>().unwrap(),
            Placement::After("flatten-blocks".into())
        );
    }

    #[test]
    fn test_parse_invalid_placements() {
        assert!("middle".parse::<Placement>().is_err());
        assert!("before:".parse::<Placement>().is_err());
        assert!("around:fold-constants".parse::<Placement>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let placement = Placement::After("eliminate-dead-code".into());
        assert_eq!(placement.to_string(), "after:eliminate-dead-code");
        assert_eq!(placement.anchor(), Some("eliminate-dead-code"));
    }
}
