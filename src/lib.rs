//! STX Tip Jar - terminal client for a Stacks tip jar contract
//!
//! This library reads the contract's public state over the Stacks node API,
//! builds `tip` contract calls guarded by exact STX post-conditions, and
//! hands them to an external wallet for signing.
//!
//! ## Architecture
//!
//! - **Reads**: [`contract::TipJarContract`] over any [`rpc_utils::ReadOnlyNode`]
//! - **Writes**: [`tx`] builds and verifies calls, a [`wallet::Wallet`] signs them
//! - **Session**: [`session::Session`] with SQLite or in-memory persistence
//! - **View**: [`app::App`] state machine, [`controller::Controller`] for async
//!   work, [`ui`] for drawing
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- stats
//! cargo run -- tip 1.5 --message "thanks"
//! ```

// Core modules (no I/O)
pub mod c32;
pub mod clarity;
pub mod error;
pub mod types;
pub mod util_text;

pub mod config;

// Stacks node transport
pub mod rpc_utils;

pub mod contract;
pub mod session;
pub mod tx;
pub mod wallet;

// External wallet over a shared directory
pub mod handoff;

pub mod app;
pub mod controller;
pub mod ui;

pub use error::{Result, TipJarError};
