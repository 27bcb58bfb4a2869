pub mod cron;
pub mod health;
pub mod visitors;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use footfall_core::{config::Config, ip::resolve_client_ip};

/// The TCP peer address when the server was started with connect info.
///
/// `oneshot` requests in tests carry no `ConnectInfo`, so this never rejects.
pub struct MaybeConnectInfo(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for MaybeConnectInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Client IP per the trust-proxy policy in `config`.
pub(crate) fn client_ip(config: &Config, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    resolve_client_ip(
        config.trust_proxy,
        header_str(headers, "x-forwarded-for"),
        header_str(headers, "x-real-ip"),
        peer.map(|addr| addr.ip()),
    )
}
