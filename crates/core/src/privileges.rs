//! Directory privilege tiers.
//!
//! The names must match the boolean columns of the `users` table
//! (`operator`, `reader`, `roleoper`) and the wire names used by the
//! directory watcher when it reports group membership changes.

use serde::{Deserialize, Serialize};

/// One of the three privilege tiers a directory user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Privilege {
    Operator,
    Reader,
    RoleOperator,
}

impl Privilege {
    pub const ALL: [Privilege; 3] = [Self::Operator, Self::Reader, Self::RoleOperator];

    /// Human-readable label used in mail subjects and bodies.
    pub fn label(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Reader => "reader",
            Self::RoleOperator => "role-operator",
        }
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The set of privilege flags carried by a user row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privileges {
    pub operator: bool,
    pub reader: bool,
    pub role_operator: bool,
}

impl Privileges {
    pub fn has(&self, privilege: Privilege) -> bool {
        match privilege {
            Privilege::Operator => self.operator,
            Privilege::Reader => self.reader,
            Privilege::RoleOperator => self.role_operator,
        }
    }

    /// True when at least one tier is held.
    pub fn any(&self) -> bool {
        self.operator || self.reader || self.role_operator
    }

    /// Labels of every held tier, in a stable order.
    pub fn labels(&self) -> Vec<&'static str> {
        Privilege::ALL
            .into_iter()
            .filter(|p| self.has(*p))
            .map(Privilege::label)
            .collect()
    }
}
