//! HTTP protocol layer module
//!
//! Request head reading and response writing, decoupled from how content is
//! resolved and rendered.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{read_request_head, HeadLimits, RequestHead, ResourcePath};
pub use response::{write_response, ResponseHeaders, STATUS_LINE};
