//! Connection management for client sessions.
//!
//! This module tracks every open session and which user, if any, is logged
//! in on it.

pub mod client;
pub mod manager;

pub use client::ClientConnection;
pub use manager::ConnectionManager;
