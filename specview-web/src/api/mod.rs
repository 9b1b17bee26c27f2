//! HTTP API handlers for specview-web
//!
//! upload → `/audio_transform` → persisted PNG under `/results`

pub mod files;
pub mod health;
pub mod transform;
pub mod ui;
pub mod upload;

pub use files::file_routes;
pub use health::health_routes;
pub use transform::transform_routes;
pub use ui::ui_routes;
pub use upload::upload_routes;
