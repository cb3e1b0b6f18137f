//! Baon Payment Engine
//!
//! The Baon payment engine is the transactional core of the school canteen ordering system. Parents fill a cart with
//! meals for one or more children across one or more delivery dates; the engine partitions that cart into orders,
//! validates stock and funds, commits each order exactly once, and drives every order through its payment lifecycle
//! (cash confirmation, timeout sweeping, cancellation and refunds).
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`] and the backend contracts in [`mod@traits`]). SQLite is the
//!    supported backend. You should never need to access the database directly; use the public API instead. The
//!    exception is the data types used in the database, which are defined in [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@bpe_api`]). [`OrderFlowApi`] is the order processing engine proper;
//!    [`CheckoutApi`] is the cart checkout orchestrator; [`AccountApi`] serves read-only order and wallet queries.
//!
//! The engine also emits events when orders are created, paid, or cancelled. A small hook framework in
//! [`mod@events`] lets callers subscribe to these (for example, to push notifications to parents) without the
//! engine knowing anything about the subscribers.
mod bpe_api;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use bpe_api::{
    accounts_api::AccountApi,
    cart,
    checkout_api,
    checkout_api::{CheckoutApi, CheckoutError},
    order_flow_api::OrderFlowApi,
    order_objects,
};
