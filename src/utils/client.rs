// src/utils/client.rs

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

/// Client capability signal used to size comment threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHints {
    pub is_mobile: bool,
}

impl<S> FromRequestParts<S> for ClientHints
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientHints {
            is_mobile: is_mobile_client(&parts.headers),
        })
    }
}

/// `Sec-CH-UA-Mobile: ?1` wins; otherwise fall back to User-Agent sniffing.
pub fn is_mobile_client(headers: &HeaderMap) -> bool {
    if let Some(hint) = headers.get("sec-ch-ua-mobile").and_then(|v| v.to_str().ok()) {
        return hint.trim() == "?1";
    }

    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ["Mobi", "Android", "iPhone"].iter().any(|m| ua.contains(m)))
        .unwrap_or(false)
}
