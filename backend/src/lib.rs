//! NewsEcho newsletter platform backend.
//!
//! A session-authenticated REST service over PostgreSQL with two external
//! collaborators behind ports: an identity provider (credentials, email
//! verification, password resets) and an image host. Layout follows the
//! hexagonal split: [`domain`] holds types, services, and ports;
//! [`inbound`] the HTTP adapter; [`outbound`] the Diesel, identity, and
//! image adapters; [`server`] the wiring.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use doc::ApiDoc;
pub use middleware::Trace;
