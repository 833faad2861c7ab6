//! Network fetch.
//!
//! The `Network` trait is the seam between the worker and the outside
//! world: transport failures come back as `Err(NetError)`, while HTTP
//! error statuses are ordinary `Ok` responses that the network-first
//! strategy passes through unmodified.

pub mod client;
pub mod error;

pub use client::{HttpNetwork, Network};
pub use error::NetError;
