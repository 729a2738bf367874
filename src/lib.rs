/// Traffic configuration files: blocks of `Parameter=value` lines
pub mod config;
pub mod error;
/// Value types exchanged with the face
pub mod structs;

/// Interest generator
pub mod client;
/// Data responder
pub mod server;

/// The messaging collaborator and an in-process forwarder
pub mod face;
pub mod logging;
/// Counters and final reports
pub mod stats;
