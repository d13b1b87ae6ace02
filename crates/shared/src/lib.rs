//! Types shared between the diagnostics engine and its front ends: probe
//! identity, the wire shapes of the probe endpoints, and the probe error type.

pub mod domain;
pub mod error;
pub mod protocol;
