use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use cookie::Cookie;
use serde::{Deserialize, Serialize};

const FLASH_COOKIE: &str = "useradmin_flash";

/// Severity tag carried by a flash entry and by the audit-log helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashEntry {
    pub level: FlashLevel,
    pub message: String,
}

/// One-shot messages for the next rendered page, accumulated during a request
/// and carried to the client in a cookie on the redirect response.
#[derive(Debug, Default)]
pub struct Flash {
    entries: Vec<FlashEntry>,
}

impl Flash {
    pub fn push(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.entries.push(FlashEntry {
            level,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FlashEntry] {
        &self.entries
    }

    /// `Set-Cookie` header carrying the accumulated entries. Empty flashes
    /// produce an empty map so redirects without messages stay untouched.
    pub fn into_headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.entries.is_empty() {
            return headers;
        }
        let payload =
            serde_json::to_string(&self.entries).expect("flash entries serialize to json");
        let cookie = Cookie::build((FLASH_COOKIE, payload))
            .path("/")
            .http_only(true)
            .build();
        let value = HeaderValue::from_str(&cookie.encoded().to_string())
            .expect("percent-encoded cookie is valid ascii");
        headers.insert(header::SET_COOKIE, value);
        headers
    }
}

/// Headers that expire the flash cookie once its entries have been rendered.
pub fn clear_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let cookie = Cookie::build((FLASH_COOKIE, ""))
        .path("/")
        .max_age(cookie::time::Duration::ZERO)
        .build();
    let value = HeaderValue::from_str(&cookie.encoded().to_string())
        .expect("percent-encoded cookie is valid ascii");
    headers.insert(header::SET_COOKIE, value);
    headers
}

/// Flash entries left by the previous request, read from the request cookie.
pub struct IncomingFlashes(pub Vec<FlashEntry>);

#[async_trait]
impl<S> FromRequestParts<S> for IncomingFlashes
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let entries = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| {
                raw.split("; ")
                    .filter_map(|pair| Cookie::parse_encoded(pair).ok())
                    .find(|c| c.name() == FLASH_COOKIE)
                    .and_then(|c| serde_json::from_str::<Vec<FlashEntry>>(c.value()).ok())
            })
            .unwrap_or_default();
        Ok(IncomingFlashes(entries))
    }
}
