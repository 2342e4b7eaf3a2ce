//! Bearer-token issuance and verification for the single configured operator account.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::protocol::{TokenRequest, TokenResponse};
use tracing::{info, warn};

use crate::Rejection;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub fn issue_token(config: &AuthConfig, request: &TokenRequest) -> Result<TokenResponse, Rejection> {
    if request.username != config.username || request.password != config.password {
        warn!(username = %request.username, "rejected login attempt");
        return Err(Rejection::unauthorized("Incorrect username or password"));
    }

    let expires_at = Utc::now() + Duration::minutes(config.token_ttl_minutes);
    let access_token = mint(config, &request.username, expires_at.timestamp())?;
    info!(username = %request.username, "issued access token");
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    })
}

/// Checks an `Authorization` header value and returns the authenticated username.
pub fn authorize(config: &AuthConfig, authorization: Option<&str>) -> Result<String, Rejection> {
    let token = authorization
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
        })
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Rejection::unauthorized("Not authenticated"))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| Rejection::unauthorized("Invalid token"))?
    .claims;

    if claims.sub != config.username {
        return Err(Rejection::unauthorized("Invalid credentials"));
    }
    Ok(claims.sub)
}

fn mint(config: &AuthConfig, subject: &str, exp: i64) -> Result<String, Rejection> {
    encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: subject.to_string(),
            exp,
        },
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Rejection::internal(format!("token mint failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            username: "admin".into(),
            password: "admin123".into(),
            jwt_secret: "test-secret".into(),
            token_ttl_minutes: 60,
        }
    }

    fn request(username: &str, password: &str) -> TokenRequest {
        TokenRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn issued_token_authorizes_as_bearer() {
        let config = config();
        let token = issue_token(&config, &request("admin", "admin123")).expect("token");
        assert_eq!(token.token_type, "bearer");

        let header = format!("Bearer {}", token.access_token);
        assert_eq!(authorize(&config, Some(&header)).expect("authorized"), "admin");
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let err = issue_token(&config(), &request("admin", "nope")).expect_err("should fail");
        assert_eq!(err.code, crate::ErrorCode::Unauthorized);
        assert_eq!(err.body.detail_text(), "Incorrect username or password");
    }

    #[test]
    fn missing_or_malformed_header_is_not_authenticated() {
        for header in [None, Some(""), Some("Bearer "), Some("Basic abc")] {
            let err = authorize(&config(), header).expect_err("should fail");
            assert_eq!(err.body.detail_text(), "Not authenticated");
        }
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let mut other = config();
        other.jwt_secret = "other".into();
        let token = issue_token(&other, &request("admin", "admin123")).expect("token");

        let header = format!("Bearer {}", token.access_token);
        let err = authorize(&config(), Some(&header)).expect_err("should fail");
        assert_eq!(err.body.detail_text(), "Invalid token");
    }

    #[test]
    fn expired_token_is_invalid() {
        let config = config();
        let expired = mint(&config, "admin", (Utc::now() - Duration::hours(2)).timestamp())
            .expect("mint");
        let err = authorize(&config, Some(&format!("Bearer {expired}"))).expect_err("expired");
        assert_eq!(err.body.detail_text(), "Invalid token");
    }

    #[test]
    fn token_for_unknown_subject_is_rejected() {
        let config = config();
        let token = mint(&config, "mallory", (Utc::now() + Duration::hours(1)).timestamp())
            .expect("mint");
        let err = authorize(&config, Some(&format!("Bearer {token}"))).expect_err("subject");
        assert_eq!(err.body.detail_text(), "Invalid credentials");
    }
}
