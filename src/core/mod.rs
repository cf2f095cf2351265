//! Core relay logic
//!
//! Everything between the HTTP surface and the upstream providers lives
//! here: the routing directory, the forwarding path for both delivery
//! modes, health tracking, and usage accounting.

pub mod directory;
pub mod forwarder;
pub mod health;
pub mod providers;
pub mod streaming;
pub mod types;
pub mod usage;
