/// Access Token Codec
///
/// Issues and validates HS256-signed JWTs. The signing secret is passed in on
/// every call; nothing here reads global state.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TOKEN_ISSUER};
use crate::error::TokenError;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issue a signed access token for `user_id` that expires after `ttl`
///
/// # Errors
/// Returns `TokenError::Signing` if encoding fails
pub fn issue_access_token(user_id: Uuid, secret: &[u8], ttl: Duration) -> Result<String, TokenError> {
    let claims = Claims::new(user_id, ttl);

    encode(
        &Header::new(SIGNING_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Validate an access token and return its subject
///
/// Rejects tokens signed with another secret or another algorithm, tokens
/// from another issuer, and tokens whose `exp` has passed.
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Uuid, TokenError> {
    let claims = decode_claims(token, secret)?;
    claims.user_id()
}

/// Verify signature and registered claims, returning the claim set
///
/// A token is live only while `exp` is strictly in the future.
pub fn decode_claims(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation())
        .map(|data| data.claims)
        .map_err(|e| classify(e.kind()))?;

    // jsonwebtoken still accepts exp == now with zero leeway
    if claims.exp <= Utc::now().timestamp() {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

fn validation() -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
    validation.leeway = 0;
    validation
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => TokenError::MissingSubject,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-characters-long";

    #[test]
    fn test_issue_and_validate_token() {
        let user_id = Uuid::new_v4();

        let token = issue_access_token(user_id, SECRET, Duration::hours(1))
            .expect("Failed to issue token");
        let validated = validate_access_token(&token, SECRET).expect("Failed to validate token");

        assert_eq!(validated, user_id);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_claims_carry_issuer_and_timestamps() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let claims = decode_claims(&token, SECRET).unwrap();

        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::milliseconds(100))
            .expect("Failed to issue token");

        std::thread::sleep(std::time::Duration::from_millis(1100));

        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn test_zero_ttl_token_is_expired() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::zero())
            .expect("Failed to issue token");

        assert_eq!(decode_claims(&token, SECRET), Err(TokenError::Expired));
        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let result = validate_access_token(&token, b"another-secret-entirely");

        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_invalid_token() {
        let result = validate_access_token("invalid.token.here", SECRET);
        assert_eq!(result, Err(TokenError::Malformed));

        assert_eq!(validate_access_token("", SECRET), Err(TokenError::Malformed));
    }

    #[test]
    fn test_tampered_token() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        let tampered = format!("{}X", token);
        assert!(validate_access_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn test_swapped_subject_breaks_signature() {
        let victim = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let attacker = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        let victim_parts: Vec<&str> = victim.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.split('.').collect();
        let forged = format!("{}.{}.{}", victim_parts[0], attacker_parts[1], victim_parts[2]);

        assert_eq!(validate_access_token(&forged, SECRET), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_algorithm_is_rejected() {
        let claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_wrong_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::Malformed));
    }

    #[test]
    fn test_missing_subject() {
        #[derive(Serialize)]
        struct NoSubject {
            iss: &'static str,
            iat: i64,
            exp: i64,
        }

        let now = chrono::Utc::now().timestamp();
        let claims = NoSubject {
            iss: TOKEN_ISSUER,
            iat: now,
            exp: now + 3600,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::MissingSubject));
    }

    #[test]
    fn test_unparsable_subject() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.sub = "user-42".to_string();
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::UnparsableSubject));
    }
}
