pub mod alerts;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod dismissals;
pub mod error;
pub mod model;
