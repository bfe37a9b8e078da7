pub mod confirm;
pub mod jobs;
pub mod models;
pub mod settings;
pub mod telemetry;
