/// Payment provider webhook
///
/// Authenticated with `Authorization: ApiKey <key>`; a bearer token is not
/// accepted here.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{api_key_matches, extract_api_key, SessionService};
use crate::error::AppError;
use crate::store::UserStore;

const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// Key the webhook caller must present. `None` rejects every call.
#[derive(Clone)]
pub struct ServiceApiKey(pub Option<String>);

/// Envelope; `data` is only interpreted once the event is known
#[derive(Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Deserialize)]
pub struct UserUpgradedData {
    pub user_id: Uuid,
}

/// POST /api/polka/webhooks
///
/// # Errors
/// - 401: Missing key (unauthenticated) or wrong key (unauthorized)
/// - 400: Malformed body
/// - 404: Unknown user
pub async fn polka_webhook(
    req: HttpRequest,
    body: web::Bytes,
    api_key: web::Data<ServiceApiKey>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let presented = extract_api_key(req.headers()).map_err(|_| AppError::Unauthenticated)?;

    let authorized = api_key
        .0
        .as_deref()
        .map_or(false, |expected| api_key_matches(&presented, expected));
    if !authorized {
        return Err(AppError::Unauthorized);
    }

    let payload: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InputMalformed(e.to_string()))?;

    if payload.event != USER_UPGRADED_EVENT {
        return Ok(HttpResponse::NoContent().finish());
    }

    let data: UserUpgradedData = serde_json::from_value(payload.data)
        .map_err(|e| AppError::InputMalformed(e.to_string()))?;

    session.users().upgrade_to_chirpy_red(data.user_id).await?;

    tracing::info!(user_id = %data.user_id, "User upgraded to Chirpy Red");
    Ok(HttpResponse::NoContent().finish())
}
