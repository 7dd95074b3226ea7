/// User Routes
///
/// Account creation, credential update and the current user's record.
/// Responses never include the password hash.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password_blocking, validate_password, SessionService};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::store::{User, UserStore};
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email.clone(),
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email, empty or over-long password
/// - 409: Email already registered
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("create_user");
    let form = form.into_inner();

    let email = is_valid_email(&form.email)?;
    validate_password(&form.password)?;
    let hashed_password =
        hash_password_blocking(form.password, session.settings().bcrypt_cost).await?;

    let user = session.users().create_user(&email, &hashed_password).await?;

    tracing::info!(request_id = %context.request_id, user_id = %user.id, "User created");

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// PUT /api/users
///
/// Requires `Authorization: Bearer <access_token>`. Replaces the caller's
/// email and password hash.
///
/// # Errors
/// - 400: Invalid email or password
/// - 401: Missing or invalid access token
/// - 404: The authenticated user no longer exists
/// - 409: Email taken by another user
pub async fn update_user(
    req: HttpRequest,
    form: web::Json<CredentialsRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user_id = session.authenticate_request(req.headers())?;
    let context = ErrorContext::new("update_user").with_user_id(user_id);
    let form = form.into_inner();

    let email = is_valid_email(&form.email)?;
    validate_password(&form.password)?;
    let hashed_password =
        hash_password_blocking(form.password, session.settings().bcrypt_cost).await?;

    let user = session
        .users()
        .update_email_and_password(user_id, &email, &hashed_password)
        .await
        .map_err(|e| {
            let error = AppError::from(e);
            context.log_error(&error);
            error
        })?;

    tracing::info!(request_id = %context.request_id, user_id = %user.id, "User credentials updated");

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// GET /api/me
///
/// Behind `BearerAuth`; the caller's id comes from request extensions.
pub async fn get_current_user(
    caller: web::ReqData<AuthenticatedUser>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = caller.into_inner();

    let user = session
        .users()
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
