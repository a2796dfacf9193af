//! Foundational types: transactions, accounts, rings.

pub mod account;
pub mod ring;
pub mod transaction;
