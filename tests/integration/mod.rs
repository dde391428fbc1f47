//! Integration tests for querygate.

pub mod common;
pub mod config_test;
pub mod executor_test;
pub mod gateway_test;
pub mod schema_test;
