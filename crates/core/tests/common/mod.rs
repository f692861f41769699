//! Common test utilities shared by the integration tests.
//!
//! - Fixtures (projects on disk, engines, requests)
//! - Scripted backends and job transports
//! - Assertions over finished runs and event sequences

pub mod assertions;
pub mod fixtures;
pub mod scripted_backends;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use scripted_backends::*;
