//! Request middleware: exempt-path allowlist and the two admission layers.

pub mod exempt;
pub mod rate_limit;
