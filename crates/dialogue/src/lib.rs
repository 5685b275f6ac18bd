pub mod error;
pub mod generator;
pub mod llm;
pub mod sanitize;
pub mod template;

pub use error::DialogueError;
pub use generator::{DialogueGenerator, DialogueOutput, DialogueRequest};
pub use llm::{HttpLlmClient, LlmClient, LlmPrompt};
pub use sanitize::{detect_exit_intent, detect_sentiment, sanitize_buyer_message, Sanitized};
pub use template::{format_rupees, render_template};
