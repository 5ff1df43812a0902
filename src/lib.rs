// Core modules
pub mod config;
pub mod domain;
pub mod errors;
pub mod license_key;

#[cfg(feature = "server")]
pub mod jobs;

#[cfg(feature = "server")]
pub mod server;
