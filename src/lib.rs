//! sqlv: client-side controller for a database-administration console.
//!
//! Re-exports the workspace crates so hosts can depend on a single package.

pub use sqlv_core as core;
pub use sqlv_gateway as gateway;
pub use sqlv_telemetry as telemetry;
pub use sqlv_view as view;
