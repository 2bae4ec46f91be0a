//! OpenAI-compatible chat-completions façade over a single upstream model.

pub mod completion;
pub mod config;
pub mod error;
pub mod llm;
pub mod routes;
pub mod stream;

pub use config::Settings;
pub use error::HubError;
pub use routes::{router, AppState};
