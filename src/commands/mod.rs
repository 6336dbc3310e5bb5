// Inspection commands
pub mod host;
pub mod info;

// Reconciliation passes
pub mod reconcile;
