//! Infrastructure layer
//!
//! Concrete implementations of the domain ports: storage backends, password
//! hashing, token generation, cookie encryption and event dispatch.

pub mod config;
pub mod events;
pub mod persistence;
pub mod security;
