//! Domain layer - Core provisioning types and port definitions
//!
//! This module defines the core traits (ports) that the lifecycle engine
//! implements and the collaborators it depends on, following hexagonal
//! architecture principles.

pub mod ports;

pub use ports::*;
