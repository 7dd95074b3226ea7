/// Credential Extractor
///
/// Pulls the raw credential out of `Authorization`. Two disjoint schemes:
/// `Bearer <token>` for session tokens and `ApiKey <key>` for service calls.
/// A header carrying one scheme is absent as far as the other is concerned.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::ExtractError;

pub const BEARER_PREFIX: &str = "Bearer ";
pub const API_KEY_PREFIX: &str = "ApiKey ";

/// Extract a bearer token
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, ExtractError> {
    extract_with_prefix(headers, BEARER_PREFIX)
}

/// Extract a service API key
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, ExtractError> {
    extract_with_prefix(headers, API_KEY_PREFIX)
}

fn extract_with_prefix(headers: &HeaderMap, prefix: &str) -> Result<String, ExtractError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ExtractError::NotPresent)?;

    let credential = value.strip_prefix(prefix).ok_or(ExtractError::NotPresent)?;

    if credential.is_empty() || credential.contains(char::is_whitespace) {
        return Err(ExtractError::NotPresent);
    }

    Ok(credential.to_string())
}
