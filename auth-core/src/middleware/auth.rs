//! Request authentication gate.
//!
//! Establishes the caller's identity from the `Authorization` header and
//! nothing more: authorization decisions belong to the downstream handlers.
//! Absent, malformed, and invalid tokens all degrade to [`RequestIdentity::Anonymous`]
//! rather than an error response.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::collections::BTreeSet;
use std::convert::Infallible;

use crate::models::Role;
use crate::services::{SessionClaims, SessionTokenService};

/// Identity established for the lifetime of one request.
#[derive(Debug, Clone)]
pub enum RequestIdentity {
    Anonymous,
    Authenticated(AuthenticatedUser),
}

impl RequestIdentity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, RequestIdentity::Anonymous)
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            RequestIdentity::Anonymous => None,
            RequestIdentity::Authenticated(user) => Some(&user.subject),
        }
    }

    /// Role check; anonymous callers hold no roles.
    pub fn has_role(&self, role: Role) -> bool {
        match self {
            RequestIdentity::Anonymous => false,
            RequestIdentity::Authenticated(user) => user.roles.contains(&role),
        }
    }
}

/// The decoded bearer of a valid session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub roles: BTreeSet<Role>,
    pub claims: SessionClaims,
}

/// Resolve an `Authorization` header value to an identity.
///
/// A missing header means an anonymous request. A present header without a
/// proper `Bearer ` prefix, or with a token that fails validation, also
/// resolves to anonymous rather than an error.
pub fn authenticate_request(
    sessions: &SessionTokenService,
    header_value: Option<&str>,
) -> RequestIdentity {
    let Some(header_value) = header_value else {
        return RequestIdentity::Anonymous;
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return RequestIdentity::Anonymous;
    };

    match sessions.validate(token) {
        Ok(claims) => RequestIdentity::Authenticated(AuthenticatedUser {
            subject: claims.sub.clone(),
            roles: claims.roles.iter().copied().collect(),
            claims,
        }),
        Err(_) => {
            tracing::debug!("Bearer token rejected, continuing as anonymous");
            RequestIdentity::Anonymous
        }
    }
}

/// Middleware that attaches the caller's identity to request extensions.
/// It never rejects a request; handlers decide what anonymous may do.
pub async fn identity_middleware(
    State(sessions): State<SessionTokenService>,
    mut req: Request,
    next: Next,
) -> Response {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let identity = authenticate_request(&sessions, header_value.as_deref());
    req.extensions_mut().insert(identity);

    next.run(req).await
}

/// Extractor for handlers. Yields `Anonymous` when the middleware did not
/// run, so a misconfigured route fails closed instead of erroring.
pub struct Identity(pub RequestIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity(
            parts
                .extensions
                .get::<RequestIdentity>()
                .cloned()
                .unwrap_or(RequestIdentity::Anonymous),
        ))
    }
}
