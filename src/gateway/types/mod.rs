//! Gateway types module
//!
//! ## Input Types
//! - [`MovementPayload`]: Movement deserialization from HTTP requests
//!
//! ## Output Types
//! - [`MovementResponse`], [`StatementResponse`]: Ledger results on the wire
//! - [`ApiError`]: Structured error with a stable code
//! - [`ApiResponse<T>`]: Wrapper for service endpoints
//!
//! ## Submodules
//! - [`movement`]: Movement and statement DTOs
//! - [`response`]: Response wrappers and error codes

pub mod movement;
pub mod response;

pub use movement::{
    BalanceView, MovementPayload, MovementResponse, MovementView, StatementResponse,
};
pub use response::{ApiError, ApiResponse, ApiResult, ErrorBody, error_codes, ok};
