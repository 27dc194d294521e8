//! site-core: shared infrastructure for the member portal.
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod utils;

pub use axum;
pub use serde;
pub use tracing;
pub use validator;
