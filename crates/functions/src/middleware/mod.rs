//! HTTP middleware stack for the functions.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span)
//! 4. Timeout (408 after `REQUEST_TIMEOUT_SECS`)
//! 5. Function key (function routes only; health checks are open)

pub mod function_key;
pub mod request_id;

pub use function_key::require_function_key;
pub use request_id::request_id_middleware;
