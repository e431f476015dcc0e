mod traits;
mod openai;
pub mod decoder;

pub use traits::*;
pub use openai::{OpenAIClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use decoder::{decode_stream, into_events, AssembledResponse, DecodeEvent, StreamingChatDecoder};
