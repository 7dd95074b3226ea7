/// Authentication module
///
/// Password hashing, access token issue/validation, refresh token lifecycle,
/// credential extraction, and the session orchestrator composing them.

mod api_key;
mod claims;
mod extract;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use api_key::api_key_matches;
pub use claims::{Claims, TOKEN_ISSUER};
pub use extract::{extract_api_key, extract_bearer};
pub use jwt::{decode_claims, issue_access_token, validate_access_token};
pub use password::{
    hash_password, hash_password_blocking, validate_password, verify_password,
    verify_password_blocking,
};
pub use refresh_token::{
    generate_refresh_token, issue_refresh_token, redeem_refresh_token, revoke_all_user_tokens,
    revoke_refresh_token, RefreshToken, RefreshTokenState, REFRESH_TOKEN_LENGTH,
};
pub use session::{authenticate_request, LoginOutcome, SessionService, SessionSettings};
