//! Capture sources.
//!
//! Platform capture lives outside this crate. The synthetic sources here stand in for
//! the camera and compass in the demo binary and integration tests.
//!
//! Sources hand frames straight to the engine and never keep a copy; pixel content is
//! never logged.

pub mod synthetic;

pub use synthetic::{SyntheticCamera, SyntheticCompass};
