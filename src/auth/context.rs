// Per-request identity established by the auth layer

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Extensions},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{error::AuthError, role::Role};

/// Verified caller identity for one request
///
/// Only the auth layer constructs it, and it exposes no mutators, so what a
/// handler reads is exactly what the interceptor attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IdentityContext {
    subject_id: String,
    roles: Vec<Role>,
}

impl IdentityContext {
    pub(crate) fn new(subject_id: String, roles: Vec<Role>) -> Self {
        Self { subject_id, roles }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// True when any held role appears in `allowed`. An empty role set never matches.
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.roles.iter().any(|role| allowed.contains(role))
    }

    pub(crate) fn attach(self, extensions: &mut Extensions) {
        extensions.insert(self);
    }

    /// Read the identity attached to a request
    ///
    /// Fails with `ContextMissing` when the auth layer did not run.
    pub fn extract(extensions: &Extensions) -> Result<Self, AuthError> {
        extensions
            .get::<IdentityContext>()
            .cloned()
            .ok_or(AuthError::ContextMissing)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for IdentityContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        IdentityContext::extract(&parts.extensions)
    }
}
