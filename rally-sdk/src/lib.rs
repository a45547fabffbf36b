//! Shared types for the Rally event server.
//!
//! This crate is used by both the server and its clients. It contains the
//! wire types, the bearer token scheme, and the [`reconciler`] that merges
//! real-time deltas into a locally held list of events.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod objects;
pub mod reconciler;
pub mod token;

#[cfg(feature = "client")]
pub mod client;
