//! nodeping Core Library
//! Session registration, heartbeat loop, orchestration and transport

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod orchestrator;
pub mod session;
pub mod sources;
pub mod transport;
