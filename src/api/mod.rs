//! HTTP surface of the proxy

pub mod endpoints;
pub mod error;
