pub mod error;
pub mod llm;
pub mod context;
pub mod config;
pub mod project;
pub mod render;
pub mod session;

// Re-export key types
pub use error::SidechatError;
pub use llm::{
    AssembledResponse, DecodeEvent, LlmClient, LlmResponse, Message, OpenAIClient, Role,
    StreamingChatDecoder,
};
pub use context::{ConversationHistory, FileAttachment, ImageAttachment, PendingAttachments};
pub use config::Settings;
pub use render::{MarkdownRenderer, MarkdownView};
pub use session::{ChatSession, TurnObserver, TurnOutcome};
