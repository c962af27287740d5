// reflexion states of architecture edges
use std::fmt;

use serde::{Deserialize, Serialize};

/// State of an architecture edge.
///
/// Specified edges move between `Specified`, `Convergent`, `Absent` and
/// `AllowedAbsent`. Propagated edges are `Allowed`, `Divergent` or
/// `ImplicitlyAllowed` for as long as they exist.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EdgeState {
    #[default]
    Undefined,
    Specified,
    Convergent,
    Absent,
    AllowedAbsent,
    Allowed,
    Divergent,
    ImplicitlyAllowed,
}

impl EdgeState {
    pub const ALL: [EdgeState; 8] = [
        EdgeState::Undefined,
        EdgeState::Specified,
        EdgeState::Convergent,
        EdgeState::Absent,
        EdgeState::AllowedAbsent,
        EdgeState::Allowed,
        EdgeState::Divergent,
        EdgeState::ImplicitlyAllowed,
    ];

    /// Divergences and absences are the findings an architect has to act on.
    pub fn is_violation(self) -> bool {
        matches!(self, EdgeState::Divergent | EdgeState::Absent)
    }

    /// States in which an architecture edge carries a positive counter.
    pub fn is_counted(self) -> bool {
        matches!(
            self,
            EdgeState::Convergent
                | EdgeState::Allowed
                | EdgeState::Divergent
                | EdgeState::ImplicitlyAllowed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeState::Undefined => "undefined",
            EdgeState::Specified => "specified",
            EdgeState::Convergent => "convergent",
            EdgeState::Absent => "absent",
            EdgeState::AllowedAbsent => "allowed_absent",
            EdgeState::Allowed => "allowed",
            EdgeState::Divergent => "divergent",
            EdgeState::ImplicitlyAllowed => "implicitly_allowed",
        }
    }
}

impl fmt::Display for EdgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
