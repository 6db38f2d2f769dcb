// Library exports for handoff
// The binary and integration tests both build on these modules

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
