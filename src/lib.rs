//! Single-request HTTP responder
//!
//! Each accepted connection gets one response: the request line names a file
//! under the content root, two reserved markers in that file are replaced
//! with the current date and a server description, and the result is written
//! back with a fixed header set before the connection closes.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
