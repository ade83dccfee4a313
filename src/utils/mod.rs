//! Utility functions and helpers.

pub mod filename;
pub mod http;
pub mod log;
pub mod url;
