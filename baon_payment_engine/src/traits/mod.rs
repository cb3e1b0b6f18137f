//! # Database backend contracts.
//!
//! This module defines the interface contracts that a storage backend must implement to act as a backend for the
//! Baon payment engine.
//!
//! * [`PaymentEngineDatabase`] is the mutation surface: the conditional stock and wallet updates, order insertion
//!   and compensation, and the guarded payment-lifecycle transitions. Every mutation of the two long-lived shared
//!   resources (`stock_quantity` and `wallet.balance`) goes through the conditional primitives defined here —
//!   concurrency safety is optimistic, never lock-based.
//! * [`AccountManagement`] is the read surface: ownership lookups, wallet reads and order queries.
mod account_management;
mod data_objects;
mod payment_engine_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use data_objects::SweepResult;
pub use payment_engine_database::{PaymentEngineDatabase, PaymentEngineError};
