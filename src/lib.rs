pub mod chat;
pub mod client;
pub mod constants;
pub mod conversation;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod proxy;
pub mod questions;
pub mod sessions;
pub mod web_server;

pub use client::ProxyClient;
pub use conversation::{AnswerSet, Conversation};
pub use error::PlanError;
pub use proxy::{PlanProvider, PlanProxy, ProxyConfig};
pub use questions::Script;
