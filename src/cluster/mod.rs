//! Cluster Collaborators
//!
//! Adapters that resolve storage classes for the lifecycle engine, either
//! from the Kubernetes API or from an in-memory set.

pub mod storage_class;

pub use storage_class::*;
