//! Utility modules: timeout, host lookup.

pub mod host;
pub mod timeout;
