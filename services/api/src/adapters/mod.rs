pub mod extract;
pub mod gemini;
pub mod memory;
pub mod prompts;
pub mod store;

pub use extract::FileTextExtractor;
pub use gemini::GeminiGenerationAdapter;
pub use memory::InMemoryProjectRepository;
pub use store::SqliteProjectRepository;
