//! HTTP API handlers for ca-sync

pub mod daily;
pub mod finance;
pub mod health;
pub mod sse;
pub mod status;
pub mod sync;
pub mod teachers;

pub use daily::daily_routes;
pub use finance::finance_routes;
pub use health::health_routes;
pub use sse::event_stream;
pub use status::status_routes;
pub use sync::sync_routes;
pub use teachers::teacher_routes;
