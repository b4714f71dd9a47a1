//! Request validation and target parsing.
//!
//! Everything here runs before the call touches the limiter or a breaker,
//! so a rejected request costs no permit and no probe.

use crate::request::{CallRequest, Method};

/// Checks that `request` is well formed. The error is a human-readable reason.
pub(crate) fn validate(request: &CallRequest) -> Result<(), String> {
    let target = request.target.as_str();

    if target.trim().is_empty() {
        return Err("target must not be empty".to_string());
    }
    if target.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("target must not contain whitespace or control characters".to_string());
    }

    if let Some((scheme, rest)) = target.split_once("://") {
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(format!("unsupported scheme `{scheme}`"));
        }
        if host(host_and_port(rest)).is_empty() {
            return Err("target has no host".to_string());
        }
    }

    if request.payload.is_some() && matches!(request.method, Method::Get | Method::Head) {
        return Err(format!("{} requests cannot carry a payload", request.method));
    }

    Ok(())
}

/// The part of `target` one circuit breaker guards: `scheme://host[:port]`
/// for URLs, the whole target otherwise. Scheme and host are lowercased and
/// user info is dropped.
pub fn target_authority(target: &str) -> String {
    match target.split_once("://") {
        Some((scheme, rest)) => format!(
            "{}://{}",
            scheme.to_ascii_lowercase(),
            host_and_port(rest).to_ascii_lowercase()
        ),
        None => target.to_string(),
    }
}

fn host_and_port(after_scheme: &str) -> &str {
    let end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    let authority = &after_scheme[..end];
    match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    }
}

/// Strips the port from `host[:port]`. Bracketed IPv6 literals keep their
/// colons; an unterminated bracket yields an empty host.
fn host(host_port: &str) -> &str {
    match host_port.strip_prefix('[') {
        Some(literal) => literal.find(']').map_or("", |end| &literal[..end]),
        None => host_port.split_once(':').map_or(host_port, |(host, _)| host),
    }
}
