/// Middleware module
///
/// Bearer authentication for protected scopes.

mod bearer_auth;

pub use bearer_auth::{AuthenticatedUser, BearerAuth};
