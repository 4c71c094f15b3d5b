//! Operations that span several tables or need a transaction
//!
//! Handlers call into these for anything beyond a single-row read or write.

pub mod accounting;
pub mod inventory;
pub mod orders;
pub mod recurring;
