//! Operation and step names used in logs, metrics and step errors.
//!
//! Step names identify which write of a saga failed; they are stable strings
//! so dashboards and alerts can key on them.

/// Lifecycle operation names (metric label `operation`).
pub const OP_CONFIRM_SALE: &str = "confirm_sale";
pub const OP_UNDO_SALE: &str = "undo_sale";
pub const OP_RESET_TO_CONFIRMATION: &str = "reset_to_confirmation";
pub const OP_RESET_INSTALLMENTS: &str = "reset_installments";
pub const OP_DELETE_SALE: &str = "delete_sale";
pub const OP_RESCHEDULE_RENDEZVOUS: &str = "reschedule_rendezvous";
pub const OP_CANCEL_RENDEZVOUS: &str = "cancel_rendezvous";

/// Saga step names (step errors and journal assertions).
pub const STEP_LOAD_SALE: &str = "load_sale";
pub const STEP_LOAD_PAYMENTS: &str = "load_payments";
pub const STEP_LOAD_RENDEZVOUS: &str = "load_rendezvous";
pub const STEP_LOAD_HISTORY: &str = "load_history";
pub const STEP_WRITE_SALE: &str = "write_sale";
pub const STEP_RESET_INSTALLMENTS: &str = "reset_installments";
pub const STEP_DELETE_INSTALLMENTS: &str = "delete_installments";
pub const STEP_DELETE_PAYMENTS: &str = "delete_payments";
pub const STEP_CLOSE_OLD_RENDEZVOUS: &str = "close_old_rendezvous";
pub const STEP_OPEN_NEW_RENDEZVOUS: &str = "open_new_rendezvous";
pub const STEP_CANCEL_RENDEZVOUS: &str = "cancel_rendezvous";
pub const STEP_DELETE_RENDEZVOUS: &str = "delete_rendezvous";
pub const STEP_DELETE_SALE: &str = "delete_sale";
pub const STEP_MARK_SOLD: &str = "mark_units_sold";
pub const STEP_MARK_RESERVED: &str = "mark_units_reserved";
pub const STEP_MARK_AVAILABLE: &str = "mark_units_available";
