//! Session authentication guard for the hospital administration backend.
//!
//! The crate is split the usual way: `domain` holds the guard and its ports,
//! `application` the use cases, `infrastructure` the concrete stores and
//! security primitives, and `adapters` the actix-web surface.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;
