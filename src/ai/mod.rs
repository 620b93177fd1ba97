mod generator;
mod newsletter;

pub use generator::{ClaudeGenerator, TextGenerator};
pub use newsletter::{build_prompt, generate_newsletter, select_items};
