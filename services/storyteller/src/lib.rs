pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;

pub use app::Storyteller;
pub use config::Config;
pub use error::AppError;
