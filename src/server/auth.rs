/// Admin login and bearer-token verification.
///
/// The admin password is hashed once at startup; tokens are HS256 JWTs
/// carrying `sub`, `role`, `iat` and `exp`.
use crate::common::config::AuthConfig;
use crate::common::error::{PanelError, PanelResult};
use crate::common::security::{hash_password, verify_password};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::ApiJson;
use super::state::AppState;

const ADMIN_ROLE: &str = "admin";

/// The single panel administrator
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> PanelResult<Self> {
        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        // hash check runs either way so a wrong name costs the same as a wrong password
        let password_ok = verify_password(password, &self.password_hash);
        username == self.username && password_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Unix seconds
    pub expires: i64,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    pub fn issue(&self, subject: &str, now: DateTime<Utc>) -> PanelResult<IssuedToken> {
        let expires = (now + self.lifetime).timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: expires,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| PanelError::Internal(format!("could not sign token: {}", e)))?;
        Ok(IssuedToken { token, expires })
    }

    /// Signature, algorithm and expiry
    pub fn validate(&self, token: &str) -> PanelResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                PanelError::Unauthorized("invalid or expired token".to_string())
            })
    }
}

/// Credentials plus token issuer, built from configuration at startup
pub struct AuthService {
    pub credentials: AdminCredentials,
    pub tokens: TokenIssuer,
}

impl AuthService {
    pub fn from_config(config: &AuthConfig) -> PanelResult<Self> {
        Ok(Self {
            credentials: AdminCredentials::new(&config.admin_user, &config.admin_password)?,
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_lifetime_hours),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires: i64,
    pub user: String,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> PanelResult<Json<LoginResponse>> {
    let audit = state.registry.audit();
    if !state.auth.credentials.verify(&req.username, &req.password) {
        audit.log_auth_event(false, "invalid credentials");
        return Err(PanelError::Unauthorized("invalid credentials".to_string()));
    }

    let issued = state.auth.tokens.issue(&req.username, Utc::now())?;
    audit.log_auth_event(true, "admin login");
    Ok(Json(LoginResponse {
        token: issued.token,
        expires: issued.expires,
        user: req.username,
    }))
}

/// Rejects requests without a valid `Authorization: Bearer` token.
///
/// The verified [`Claims`] are placed in the request extensions.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> PanelResult<Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            PanelError::Unauthorized("missing or invalid authorization header".to_string())
        })?;

    let claims = state.auth.tokens.validate(token)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        let creds = AdminCredentials::new("admin", "changeme").unwrap();
        assert!(creds.verify("admin", "changeme"));
        assert!(!creds.verify("admin", "changeme2"));
        assert!(!creds.verify("root", "changeme"));
        assert_eq!(creds.username(), "admin");
    }

    #[test]
    fn test_token_round_trip() {
        let issuer = TokenIssuer::new("secret", 8);
        let now = Utc::now();
        let issued = issuer.issue("admin", now).unwrap();
        assert_eq!(issued.expires, (now + Duration::hours(8)).timestamp());

        let claims = issuer.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_expired_and_foreign_tokens() {
        let issuer = TokenIssuer::new("secret", 1);
        let stale = issuer
            .issue("admin", Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(
            issuer.validate(&stale.token),
            Err(PanelError::Unauthorized(_))
        ));

        let other = TokenIssuer::new("other-secret", 1);
        let foreign = other.issue("admin", Utc::now()).unwrap();
        assert!(issuer.validate(&foreign.token).is_err());
        assert!(issuer.validate("not.a.jwt").is_err());
    }
}
