// Library exports for Clubhouse
// This allows integration tests and external code to use Clubhouse modules

pub mod auth;
pub mod blog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
