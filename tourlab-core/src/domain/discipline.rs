use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Racing discipline. Every rider has an ability score per discipline and every
/// stage is a weighted mixture of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Sprint,
    Punch,
    #[serde(rename = "itt")]
    TimeTrial,
    Mountain,
    Breakaway,
}

impl Discipline {
    pub const ALL: [Discipline; 5] = [
        Discipline::Sprint,
        Discipline::Punch,
        Discipline::TimeTrial,
        Discipline::Mountain,
        Discipline::Breakaway,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Discipline::Sprint => "sprint",
            Discipline::Punch => "punch",
            Discipline::TimeTrial => "itt",
            Discipline::Mountain => "mountain",
            Discipline::Breakaway => "breakaway",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Discipline {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sprint" => Ok(Discipline::Sprint),
            "punch" => Ok(Discipline::Punch),
            "itt" | "time_trial" => Ok(Discipline::TimeTrial),
            "mountain" => Ok(Discipline::Mountain),
            "breakaway" | "break_away" => Ok(Discipline::Breakaway),
            _ => Err(ConfigError::UnknownDiscipline(s.to_string())),
        }
    }
}
