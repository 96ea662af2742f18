//! Scribe core: configuration, secret resolution, prompt composition and the
//! chat service that ties retrieval to the language model.

pub mod bootstrap;
pub mod chat;
pub mod composer;
pub mod config;
pub mod vault;

pub use chat::{ChatError, ChatService};
pub use config::Config;
