// Library exports for promptboard
// This allows integration tests and external code to use promptboard modules

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod prompts;
pub mod repository;
pub mod routes;
pub mod state;
pub mod votes;
