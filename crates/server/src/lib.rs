//! Babelfish: chat with a chess engine through an LLM.
//!
//! The binary wires these pieces together; the integration tests drive them
//! with scripted engines and models.

pub mod agent;
pub mod chat;
pub mod clients;
pub mod config;
pub mod error;
pub mod routes;
