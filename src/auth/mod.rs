use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

/// Verification half of the token setup. Admin tokens are minted by the
/// surrounding platform; this service only checks them.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        Self {
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// The acting administrator, resolved from the bearer token. Requests without
/// a valid token get 401; tokens without the admin role get 403. Handlers
/// never see either case.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        if !claims.roles.iter().any(|r| r == ROLE_ADMIN) {
            warn!(user_id = claims.sub, "admin area access without admin role");
            return Err((StatusCode::FORBIDDEN, "Admin role required".to_string()));
        }

        Ok(AdminUser { id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    // Mints a token the way the surrounding platform would, against the
    // fake-state secret and issuer/audience.
    fn mint(user_id: i64, roles: &[&str]) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now.unix_timestamp() as usize,
            exp: (now + Duration::minutes(60)).unix_timestamp() as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test"),
        )
        .expect("sign test token")
    }

    async fn extract(token: Option<&str>) -> Result<AdminUser, (StatusCode, String)> {
        let state = AppState::fake();
        let mut builder = Request::builder();
        if let Some(t) = token {
            builder = builder.header(
                axum::http::header::AUTHORIZATION,
                format!("Bearer {t}"),
            );
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AdminUser::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn verify_accepts_a_platform_minted_token() {
        let keys = make_keys();
        let token = mint(7, &[ROLE_ADMIN, "ROLE_USER"]);
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.roles.iter().any(|r| r == ROLE_ADMIN));
    }

    #[tokio::test]
    async fn verify_rejects_a_foreign_secret() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: 7,
            roles: vec![ROLE_ADMIN.into()],
            iat: now.unix_timestamp() as usize,
            exp: (now + Duration::minutes(60)).unix_timestamp() as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn admin_token_is_accepted() {
        let token = mint(42, &[ROLE_ADMIN]);
        let admin = extract(Some(&token)).await.expect("admin accepted");
        assert_eq!(admin.id, 42);
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let err = extract(None).await.unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_401() {
        let err = extract(Some("not-a-jwt")).await.unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_admin_token_is_403() {
        let token = mint(5, &["ROLE_USER"]);
        let err = extract(Some(&token)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
    }
}
