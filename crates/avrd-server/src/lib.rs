//! HTTP facade over the receiver session and the lighting controller.

pub mod routes;
pub mod server;

pub use server::{start, AppState, ServerConfig, ServerHandle};
