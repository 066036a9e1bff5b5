//! OAuth 2.0 request and response plumbing.
//!
//! - [`request`] - Form parameters and the [`Request`] seam the issuance
//!   core reads from
//! - [`response`] - Token endpoint bodies and authorization redirects the
//!   issuance core writes into

pub mod request;
pub mod response;

pub use request::{AuthorizeRequest, Form, Request};
pub use response::{AccessResponder, AccessResponse, AuthorizeResponder, AuthorizeResponse};
