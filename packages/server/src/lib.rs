// Camp chat - messaging core
//
// Chats, an event-sourced message ledger, scripted emergency alerts and
// course organiser sync, served as JSON RPC over axum.
//
// Business logic lives in domains/*/activities; kernel/ holds the
// dependency container and the outbound adapters.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
