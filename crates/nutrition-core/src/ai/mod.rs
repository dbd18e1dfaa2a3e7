pub mod canned;
pub mod claude;
pub mod ollama;
pub mod openai;

pub use canned::CannedProvider;
pub use claude::ClaudeProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
