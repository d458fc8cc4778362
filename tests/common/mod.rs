//! Common test utilities for numcheck integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod mock_service;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use mock_service::*;
