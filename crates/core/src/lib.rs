//! order-desk core - shared domain types.
//!
//! This crate provides the types shared by the order-desk components:
//! - `functions` - HTTP functions for users, products and orders
//! - `cli` - operator tooling (migrations, queue inspection)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Validation that depends purely on a value (email structure,
//! continuation token shape) lives here so every component agrees on it.
//!
//! # Modules
//!
//! - [`types`] - Row ids, partitions, statuses, emails and continuation tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
