//! Text generation providers
//!
//! The transform pipeline only ever sees [`TextGenerator`]; providers talk to
//! an OpenAI-compatible chat API or a local Ollama server.

mod ollama;
mod openai;
mod provider;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use provider::{
    create_generator, strip_code_fence, GenerationOptions, ProviderConfig, ResponseFormat, TextGenerator,
};
