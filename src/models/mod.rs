//! Request and response data model for intercepted fetches.
//!
//! These types mirror the small slice of HTTP the worker cares about:
//! a request identity (method + URL) for cache matching, a header map
//! for content negotiation, and an opaque response body.

pub mod request;
pub mod response;

pub use request::{Method, Request};
pub use response::Response;
