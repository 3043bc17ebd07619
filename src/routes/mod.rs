//! Route inventories on both sides of the stack and their reconciliation.

pub mod endpoints;
pub mod frontend;
pub mod reconcile;
