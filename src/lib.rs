//! Storyteller is a terminal client for writing chaptered stories with a
//! hosted AI assistant and a story backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the backend's story, chapter and profile payloads plus
//!   the assistant API's thread and run payloads.
//! - [`core`] owns configuration, the backend and assistant clients, the
//!   chapter generation state machine and the persisted Now Reading player.
//! - [`auth`] stores and resolves the assistant API key.
//! - [`cli`] parses arguments and runs each command.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod utils;
