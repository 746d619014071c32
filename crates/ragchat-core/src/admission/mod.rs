//! Per-key request admission.
//!
//! - `BucketStore`: concurrent key -> counting window map
//! - `AdmissionController`: fixed-window allow/deny decisions over a store
//! - `PolicySource`: which limit/window a key gets

pub mod bucket;
pub mod controller;
pub mod policy;

pub use bucket::{BucketStore, RateWindow};
pub use controller::AdmissionController;
pub use policy::{KeyedPolicies, PolicySource};
