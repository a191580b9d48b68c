//! Data models for the live-link client library.
//!
//! Defines the operation descriptor, per-request overrides, the inbound
//! update envelope, and the initial response shapes.

pub mod envelope;
pub mod initial_response;
pub mod operation;
pub mod request_options;

pub use envelope::UpdateEnvelope;
pub use initial_response::{InitialResponse, RawResponse, RealtimeExtension, ResponseExtensions};
pub use operation::Operation;
pub use request_options::{RequestOptions, RequestOverrides};
