//! Business logic behind the HTTP functions.
//!
//! - `orders` - record-and-notify order placement
//! - `password` - Argon2id hashing for user registration

pub mod orders;
pub mod password;

pub use orders::{OrderError, OrderService};
pub use password::{PasswordError, hash_password, verify_password};
