//! Capability checks for the destructive lifecycle operations.
//!
//! Permission is evaluated once, before the first write of a saga. A denial
//! is final for the request; it is never retried.

use std::collections::HashSet;

/// Elevated capabilities required by specific lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Revert a completed sale back to pending.
    UndoSale,
    /// Remove a sale and all of its dependent records.
    DeleteSale,
}

impl Capability {
    /// Returns the capability name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::UndoSale => "undo-sale",
            Capability::DeleteSale => "delete-sale",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether the acting identity holds a capability.
pub trait PermissionGate: Send + Sync {
    fn has_permission(&self, capability: Capability) -> bool;
}

/// A fixed capability set, resolved at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    granted: HashSet<Capability>,
}

impl StaticPermissions {
    /// No capabilities at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every capability.
    pub fn allow_all() -> Self {
        Self {
            granted: [Capability::UndoSale, Capability::DeleteSale]
                .into_iter()
                .collect(),
        }
    }

    /// Adds a capability to the set.
    pub fn grant(mut self, capability: Capability) -> Self {
        self.granted.insert(capability);
        self
    }
}

impl PermissionGate for StaticPermissions {
    fn has_permission(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }
}
