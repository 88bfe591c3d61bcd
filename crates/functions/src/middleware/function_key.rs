//! Function-level access key.
//!
//! Every function route requires the configured key, either in the
//! `x-functions-key` header or the `code` query parameter. Anything else is
//! rejected with 401 before the handler runs.

use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::function_key_bytes;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Query parameter carrying the function key.
pub const FUNCTION_KEY_PARAM: &str = "code";

/// Reject requests that do not present the function key.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the key is missing or wrong.
pub async fn require_function_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = presented_key(&request);
    let expected = function_key_bytes(state.config());

    match presented {
        Some(key) if constant_time_compare(key.as_bytes(), expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "wrong function key");
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}

fn presented_key(request: &Request) -> Option<String> {
    if let Some(header) = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        return Some(header.to_owned());
    }

    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(FUNCTION_KEY_PARAM))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        result |= x ^ y;
    }

    result == 0
}
