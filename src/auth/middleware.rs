// Authentication middleware for protected routes
//
// `authenticate` establishes identity from the access token and rotates the
// token pair when only the access token has expired. `require_role` gates a
// route group on the identity it left behind.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::auth::{
    context::IdentityContext,
    error::AuthError,
    role::Role,
    role_lookup::RoleLookup,
    token::{TokenPair, TokenService},
};

/// Inbound and outbound header carrying the access token
pub const ACCESS_TOKEN_HEADER: HeaderName = header::AUTHORIZATION;
/// Inbound and outbound header carrying the refresh token
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("refresh_token");

/// Default bound on a renewal-time role lookup
pub const DEFAULT_ROLE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared, read-only dependencies of the auth layer
#[derive(Clone)]
pub struct AuthLayerState {
    tokens: Arc<TokenService>,
    role_lookup: Arc<dyn RoleLookup>,
    role_lookup_timeout: Duration,
}

/// Result of authenticating a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub identity: IdentityContext,
    /// Present only when the token pair was rotated
    pub rotated: Option<TokenPair>,
}

impl AuthLayerState {
    pub fn new(
        tokens: Arc<TokenService>,
        role_lookup: Arc<dyn RoleLookup>,
        role_lookup_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            role_lookup,
            role_lookup_timeout,
        }
    }

    /// Run the verification/renewal sequence against request headers
    ///
    /// Valid access token: identity comes from its claims, no lookup happens.
    /// Expired access token: the refresh token is verified, roles are fetched
    /// fresh and a brand-new pair is issued. Any other failure is terminal.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Authenticated, AuthError> {
        let access_token = read_token(headers, &ACCESS_TOKEN_HEADER)
            .map_err(|_| AuthError::CredentialInvalid)?
            .ok_or(AuthError::CredentialMissing)?;

        match self.tokens.verify_access(access_token) {
            Ok(verified) => Ok(Authenticated {
                identity: IdentityContext::new(verified.subject, verified.roles),
                rotated: None,
            }),
            Err(AuthError::CredentialExpired) => self.renew(headers).await,
            Err(_) => Err(AuthError::CredentialInvalid),
        }
    }

    async fn renew(&self, headers: &HeaderMap) -> Result<Authenticated, AuthError> {
        let refresh_token = read_token(headers, &REFRESH_TOKEN_HEADER)
            .map_err(|_| AuthError::RefreshInvalid)?
            .ok_or(AuthError::RefreshMissing)?;

        let subject = self
            .tokens
            .verify_refresh(refresh_token)
            .map_err(|_| AuthError::RefreshInvalid)?;

        // Dropping this future (client gone) abandons the renewal here
        let roles = tokio::time::timeout(
            self.role_lookup_timeout,
            self.role_lookup.active_roles(&subject),
        )
        .await
        .map_err(|_| AuthError::RoleLookupTimedOut)?
        .map_err(|e| AuthError::RoleLookupFailed(e.to_string()))?;

        let pair = self.tokens.issue_pair(&subject, &roles)?;
        info!("Rotated token pair for user {}", subject);

        Ok(Authenticated {
            identity: IdentityContext::new(subject, roles),
            rotated: Some(pair),
        })
    }
}

/// Marker for a header that is present but not visible ASCII
struct UnreadableHeader;

/// Read a token header, stripping an optional `Bearer ` prefix.
/// Absent and blank headers both count as missing.
fn read_token<'a>(
    headers: &'a HeaderMap,
    name: &HeaderName,
) -> Result<Option<&'a str>, UnreadableHeader> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| UnreadableHeader)?.trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    Ok((!token.is_empty()).then_some(token))
}

fn rotation_headers(pair: &TokenPair) -> Result<(HeaderValue, HeaderValue), AuthError> {
    let access = HeaderValue::from_str(&pair.access_token)
        .map_err(|e| AuthError::AccessSigningFailed(e.to_string()))?;
    let refresh = HeaderValue::from_str(&pair.refresh_token)
        .map_err(|e| AuthError::RefreshSigningFailed(e.to_string()))?;
    Ok((access, refresh))
}

/// Authentication layer, mounted with `middleware::from_fn_with_state`
///
/// On rotation the new tokens are written to the `Authorization` and
/// `refresh_token` response headers of whatever the inner stack returns.
pub async fn authenticate(
    State(state): State<AuthLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    let outcome = match state.authenticate_headers(request.headers()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if !err.is_server_fault() {
                warn!("Authentication failed for endpoint {}: {}", endpoint, err);
            }
            return Err(err);
        }
    };

    let rotation = outcome.rotated.as_ref().map(rotation_headers).transpose()?;

    debug!(
        "Authenticated user_id={}, roles={:?}, endpoint={}",
        outcome.identity.subject_id(),
        outcome.identity.roles(),
        endpoint
    );
    outcome.identity.attach(request.extensions_mut());

    let mut response = next.run(request).await;

    if let Some((access, refresh)) = rotation {
        let headers = response.headers_mut();
        headers.insert(ACCESS_TOKEN_HEADER, access);
        headers.insert(REFRESH_TOKEN_HEADER, refresh);
    }

    Ok(response)
}

/// Authorization gate for a route group
///
/// Allows the request when any of the caller's roles is in the allow-list.
/// Must sit behind `authenticate`.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    /// Allow callers holding any of `roles`
    pub fn any_of(roles: &[Role]) -> Self {
        let mut allowed = roles.to_vec();
        allowed.sort();
        allowed.dedup();
        Self { allowed }
    }

    pub fn admin() -> Self {
        Self::any_of(&[Role::Admin])
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    /// Decide on the identity attached to the request
    pub fn check(&self, identity: Result<IdentityContext, AuthError>) -> Result<IdentityContext, AuthError> {
        let identity = identity.map_err(|_| AuthError::ContextMissing)?;
        if identity.has_any_role(&self.allowed) {
            Ok(identity)
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(self, request: Request<Body>, next: Next) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();

        match self.check(IdentityContext::extract(request.extensions())) {
            Ok(identity) => {
                debug!(
                    "Authorization successful: user_id={}, endpoint={}",
                    identity.subject_id(),
                    endpoint
                );
                Ok(next.run(request).await)
            }
            Err(AuthError::ContextMissing) => {
                warn!("Role gate reached without identity: endpoint={}", endpoint);
                Err(AuthError::ContextMissing)
            }
            Err(err) => {
                warn!(
                    "Authorization failed: allowed={:?}, endpoint={}",
                    self.allowed, endpoint
                );
                Err(err)
            }
        }
    }
}

/// `RequireRole` as a `from_fn_with_state` middleware
pub async fn require_role(
    State(gate): State<RequireRole>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    gate.middleware(request, next).await
}
