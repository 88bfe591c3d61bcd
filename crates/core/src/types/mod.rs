//! Core types for order-desk.
//!
//! This module provides type-safe wrappers for the table store's domain concepts.

pub mod continuation;
pub mod email;
pub mod id;
pub mod partition;
pub mod status;

pub use continuation::{ContinuationToken, ContinuationTokenError};
pub use email::{Email, EmailError};
pub use id::*;
pub use partition::{Partition, UnknownPartition};
pub use status::{DEFAULT_ROLE, OrderStatus, Role};
