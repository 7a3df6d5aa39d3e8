//! KycFlow CLI - operator commands
//!
//! This crate provides the `kycflow` binary and the command functions it
//! dispatches to.

pub mod commands;
pub mod context;

pub use context::AppContext;
