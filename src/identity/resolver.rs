//! Rate-limit identity resolution.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};

use crate::config::IdentityConfig;
use crate::identity::verifier::CredentialVerifier;
use crate::policy::Tier;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const UNKNOWN: &str = "unknown";

/// Identity string that quota is accounted against.
///
/// `user:<subject>` for verified callers, `<ip>|<user-agent>` otherwise.
/// Clients behind one NAT with the same browser share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateKey(String);

impl RateKey {
    pub fn user(subject_id: &str) -> Self {
        Self(format!("user:{subject_id}"))
    }

    pub fn anonymous(ip: &str, user_agent: &str) -> Self {
        Self(format!("{ip}|{user_agent}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RateKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Resolved caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub key: RateKey,
    pub tier: Tier,
}

/// Derives a [`RateKey`] and [`Tier`] from request metadata.
///
/// Never fails: a missing or rejected credential falls back to the anonymous
/// network identity.
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn CredentialVerifier>,
    trust_forwarded_headers: bool,
    fallback_to_peer_addr: bool,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self::from_config(&IdentityConfig::default(), verifier)
    }

    pub fn from_config(config: &IdentityConfig, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            trust_forwarded_headers: config.trust_forwarded_headers,
            fallback_to_peer_addr: config.fallback_to_peer_addr,
        }
    }

    /// Resolve from a request, using its `ConnectInfo` as the peer if present.
    pub fn resolve_request<B>(&self, request: &Request<B>) -> Identity {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        self.resolve(request.headers(), peer)
    }

    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Identity {
        if let Some(token) = bearer_token(headers) {
            match self.verifier.verify(token) {
                Ok(claims) => {
                    let tier = if claims.is_admin { Tier::Admin } else { Tier::User };
                    return Identity {
                        key: RateKey::user(&claims.subject_id),
                        tier,
                    };
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Credential rejected, treating caller as anonymous");
                }
            }
        }

        let ip = self.client_ip(headers, peer);
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN);

        Identity {
            key: RateKey::anonymous(&ip, user_agent),
            tier: Tier::Anonymous,
        }
    }

    fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded_headers {
            let forwarded = header_str(headers, X_FORWARDED_FOR)
                .and_then(|chain| chain.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
            if let Some(ip) = header_str(headers, X_REAL_IP).map(str::trim).filter(|ip| !ip.is_empty()) {
                return ip.to_string();
            }
        }

        match peer {
            Some(addr) if self.fallback_to_peer_addr => addr.ip().to_string(),
            _ => UNKNOWN.to_string(),
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .field("fallback_to_peer_addr", &self.fallback_to_peer_addr)
            .finish()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
