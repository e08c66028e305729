//! Chatrelay is a streaming relay between chat clients and the Gemini API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the wire payloads exchanged with clients, the built-in
//!   model catalog, and the line-oriented frame codec shared by both ends of
//!   the relay.
//! - [`core`] owns conversation messages, role vocabulary, and configuration.
//! - [`provider`] is the upstream model capability: a session-oriented trait
//!   plus the Gemini REST implementation.
//! - [`server`] runs the relay itself: it accepts a conversation, replays it
//!   into an upstream session, and republishes the token stream as
//!   server-sent events.
//! - [`client`] is the consuming side: it issues a relay request and reduces
//!   the event stream back into a complete assistant message.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::run`], which dispatches into [`server`] for the
//! relay and [`client`] for one-shot prompts.

pub mod api;
pub mod cli;
pub mod client;
pub mod core;
pub mod provider;
pub mod server;
pub mod utils;
