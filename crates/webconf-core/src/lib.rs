//! Core types and trait definitions for the webconf backend.
//!
//! Holds the authorization engine, the subscription model, and the
//! contracts for the payment gateway, the conferencing server and the local
//! store. Free of HTTP and database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod ability;
pub mod action;
pub mod actor;
pub mod conference;
pub mod error;
pub mod gateway;
pub mod resource;
pub mod store;
pub mod subscription;
pub mod validation;

pub use error::{Error, Result};
