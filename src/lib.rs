//! querygate - authorization gateway for LLM-generated SQL.
//!
//! Untrusted SQL is validated, authorized against a role-based table policy,
//! executed read-only under a row cap, and shaped for presentation.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod logging;
pub mod policy;
pub mod query;
pub mod safety;
pub mod shaper;
