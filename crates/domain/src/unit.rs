//! Inventory units: land pieces and houses whose status a sale constrains.

use common::{ClientId, UnitId};
use serde::{Deserialize, Serialize};

/// The availability status of an inventory unit.
///
/// This is a derived projection of sale state, not the system of record:
/// sagas write it last and best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitStatus {
    #[default]
    Available,
    Reserved,
    Sold,
    Cancelled,
}

impl UnitStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "Available",
            UnitStatus::Reserved => "Reserved",
            UnitStatus::Sold => "Sold",
            UnitStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of property the unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    LandPiece,
    House,
}

/// A land piece or house in the inventory.
///
/// Units pre-exist their sales; a sale constrains their status while it is
/// Pending or Completed but does not own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub status: UnitStatus,
    /// The client holding a reservation on the unit, if any.
    pub reserved_by: Option<ClientId>,
}

impl InventoryUnit {
    /// Creates a new available unit.
    pub fn new(kind: UnitKind) -> Self {
        Self {
            id: UnitId::new(),
            kind,
            status: UnitStatus::Available,
            reserved_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_is_available() {
        let unit = InventoryUnit::new(UnitKind::LandPiece);
        assert_eq!(unit.status, UnitStatus::Available);
        assert!(unit.reserved_by.is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(UnitStatus::Available.to_string(), "Available");
        assert_eq!(UnitStatus::Reserved.to_string(), "Reserved");
        assert_eq!(UnitStatus::Sold.to_string(), "Sold");
        assert_eq!(UnitStatus::Cancelled.to_string(), "Cancelled");
    }
}
