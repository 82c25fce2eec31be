// Router assembly: public routes, authenticated routes and role-gated groups

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{
    authenticate, require_role, AuthLayerState, IdentityContext, RequireRole, Role,
    ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER,
};
use crate::users::{handlers, models, UserService};

/// Roles allowed on `/api/employee`
pub const EMPLOYEE_GROUP_ROLES: [Role; 2] = [Role::EmployeeManager, Role::Admin];
/// Roles allowed on `/api/admin`
pub const ADMIN_GROUP_ROLES: [Role; 1] = [Role::Admin];

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_handler,
        handlers::me_handler,
        handlers::user_roles_handler,
        handlers::change_role_handler,
    ),
    components(schemas(
        Role,
        IdentityContext,
        models::LoginRequest,
        models::LoginResponse,
        models::ChangeRoleRequest,
        models::UserRolesResponse,
        models::MessageResponse,
    )),
    tags(
        (name = "users", description = "Login and caller identity"),
        (name = "employee", description = "Employee manager endpoints"),
        (name = "admin", description = "Admin-only endpoints")
    ),
    info(title = "Asset API", version = "0.1.0")
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub auth: AuthLayerState,
}

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    // Browsers only see rotated tokens if these headers are exposed
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER]);

    let employee = Router::new()
        .route("/role/:user_id", get(handlers::user_roles_handler))
        .route_layer(from_fn_with_state(
            RequireRole::any_of(&EMPLOYEE_GROUP_ROLES),
            require_role,
        ));

    let admin = Router::new()
        .route(
            "/employee/change-permissions",
            post(handlers::change_role_handler),
        )
        .route_layer(from_fn_with_state(
            RequireRole::any_of(&ADMIN_GROUP_ROLES),
            require_role,
        ));

    let protected = Router::new()
        .route("/users/me", get(handlers::me_handler))
        .nest("/employee", employee)
        .nest("/admin", admin)
        .route_layer(from_fn_with_state(state.auth.clone(), authenticate));

    let api = Router::new()
        .route("/user/login", post(handlers::login_handler))
        .merge(protected);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/test", get(|| async { "connection established..." }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
