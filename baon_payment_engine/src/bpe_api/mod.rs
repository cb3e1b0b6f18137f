//! # Baon payment engine public API
//!
//! The `bpe_api` module exposes the programmatic API of the payment engine. The API is modular: clients pick the
//! pieces they need, and every API instance is created by supplying a database backend that implements the traits
//! it requires.
//!
//! * [`order_flow_api`] is the order processing engine: idempotent order submission with stock/funds validation
//!   and saga-style compensation, cash payment confirmation, cancellation/refunds, and the unpaid-order sweep.
//! * [`checkout_api`] is the cart checkout orchestrator: it partitions a multi-student, multi-date cart into one
//!   order per (student, date) and submits the partitions with partial-failure semantics.
//! * [`accounts_api`] serves read-only order and wallet queries.
//! * [`cart`] holds the pure cart partitioning logic, and [`order_objects`] the request/result data objects.
//!
//! ```rust,ignore
//! use baon_payment_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(url, 5).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let outcome = api.process_order(new_order).await?;
//! ```
pub mod accounts_api;
pub mod cart;
pub mod checkout_api;
pub mod order_flow_api;
pub mod order_objects;
