pub mod api_error;
pub mod assistant;
pub mod assistant_stream;
pub mod backend;
pub mod config;
pub mod generation;
pub mod keyring;
pub mod now_reading;
pub mod profile;
pub mod prompts;
pub mod state;
pub mod story;
