use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use ipnet::IpNet;
use sanctum_core::{AppError, UserIdentity};

use crate::error::ApiResult;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller details for routes that serve anonymous clients too.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Option<UserIdentity>,
    pub client_ip: Option<IpAddr>,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = trusted_identity(
        peer_ip(&request),
        request.headers(),
        &state.trusted_proxies,
    )
    .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn resolve_request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = peer_ip(&request);
    let context = RequestContext {
        identity: trusted_identity(peer, request.headers(), &state.trusted_proxies),
        client_ip: client_ip(peer, request.headers(), &state.trusted_proxies),
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

fn peer_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip())
}

fn is_trusted_peer(peer: IpAddr, trusted: &[IpNet]) -> bool {
    trusted.iter().any(|network| network.contains(&peer))
}

/// Reads the forwarded identity, but only from a trusted proxy peer.
pub fn trusted_identity(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted: &[IpNet],
) -> Option<UserIdentity> {
    let peer = peer?;
    if !is_trusted_peer(peer, trusted) {
        return None;
    }

    identity_from_headers(headers)
}

/// Reads the identity forwarded by the authenticating proxy.
fn identity_from_headers(headers: &HeaderMap) -> Option<UserIdentity> {
    let subject = header_value(headers, USER_ID_HEADER)?;
    let display_name = header_value(headers, USER_NAME_HEADER).unwrap_or_else(|| subject.clone());
    let identity = UserIdentity::new(
        subject,
        display_name,
        header_value(headers, USER_EMAIL_HEADER),
    );

    Some(match header_value(headers, USER_ROLE_HEADER) {
        Some(marker) => identity.with_role_marker(marker),
        None => identity,
    })
}

/// Returns the socket peer, or the first forwarded address when the peer is
/// a trusted proxy.
pub fn client_ip(peer: Option<IpAddr>, headers: &HeaderMap, trusted: &[IpNet]) -> Option<IpAddr> {
    let peer = peer?;
    if !is_trusted_peer(peer, trusted) {
        return Some(peer);
    }

    header_value(headers, "x-forwarded-for")
        .and_then(|value| {
            value
                .split(',')
                .next()
                .and_then(|first| first.trim().parse::<IpAddr>().ok())
        })
        .or(Some(peer))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
