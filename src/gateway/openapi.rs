//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:9999/docs`
//! - OpenAPI JSON: `http://localhost:9999/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    BalanceView, ErrorBody, MovementPayload, MovementResponse, MovementView, StatementResponse,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credit Ledger API",
        version = "1.0.0",
        description = "Credit-limited account ledger: debits, credits and recent-movement statements.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:9999", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::ledger::create_movement,
        crate::gateway::handlers::ledger::get_statement,
    ),
    components(
        schemas(
            HealthResponse,
            MovementPayload,
            MovementResponse,
            StatementResponse,
            BalanceView,
            MovementView,
            ErrorBody,
        )
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Ledger", description = "Movements and statements"),
    )
)]
pub struct ApiDoc;
