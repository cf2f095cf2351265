//! HTTP surface
//!
//! Actix-web server, shared state, and the route handlers. The handlers
//! stay thin: parse, hand off to the forwarder, encode the reply.

pub mod routes;
pub mod server;
pub mod state;


pub use server::{HttpServer, run_server};
pub use state::AppState;
