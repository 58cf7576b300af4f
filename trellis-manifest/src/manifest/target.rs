//! Compilation targets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// What the pipeline produces for each unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Stack-machine listing after the full lowering pipeline.
    #[default]
    Native,
    /// Post-lowering IR and descriptors serialized as JSON.
    Bundle,
}

impl Target {
    /// Returns the target identifier as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Native => "native",
            Target::Bundle => "bundle",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(Target::Native),
            "bundle" => Ok(Target::Bundle),
            _ => Err(format!(
                "unknown target '{}', expected 'native' or 'bundle'",
                s
            )),
        }
    }
}
