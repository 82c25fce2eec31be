// Authentication module
// Bearer-token identity with transparent access-token rotation and role gates

pub mod context;
pub mod error;
pub mod middleware;
pub mod role;
pub mod role_lookup;
pub mod token;

// Re-export commonly used types
pub use context::IdentityContext;
pub use error::AuthError;
pub use middleware::{
    authenticate, require_role, AuthLayerState, RequireRole, ACCESS_TOKEN_HEADER,
    REFRESH_TOKEN_HEADER,
};
pub use role::Role;
pub use role_lookup::{PgRoleLookup, RoleLookup, RoleLookupError};
pub use token::{TokenPair, TokenService};
