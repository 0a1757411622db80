//! HTTP surface for the browser wizard.

mod routes;

pub use routes::{ApiError, ApiState, api_routes};
