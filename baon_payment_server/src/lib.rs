//! # Baon payment server
//!
//! The HTTP surface of the Baon school canteen ordering system. It is responsible for:
//! * accepting cart checkouts and single-order submissions from parents,
//! * letting canteen staff confirm cash payments at the counter,
//! * letting parents and staff cancel orders,
//! * running the payment-lifecycle sweeper that cancels unpaid cash orders past their deadline.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `GET /health`: liveness check.
//! * `POST /checkout`: partition the submitted cart by (student, date) and place one order per partition.
//! * `POST /orders`: submit a single order (one student, one date).
//! * `GET /orders`: the calling parent's orders.
//! * `GET /wallet`: the calling parent's wallet.
//! * `POST /orders/{id}/confirm-cash-payment`: staff-only cash confirmation.
//! * `POST /orders/{id}/cancel`: cancellation by the owning parent or staff.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;
pub mod sweeper;

#[cfg(test)]
mod endpoint_tests;
