//! Library exports for reusing mycap's settings model.
//!
//! Exposes the settings data structures alongside the modules they rely on
//! (geometry and hotkey parsing) so that external tools can share validation
//! logic and serialization code with the main binary.

pub mod config;
pub mod geometry;
pub mod hotkey;

pub use config::Settings;
