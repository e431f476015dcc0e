pub mod markdown;

pub use markdown::{render_transcript, MarkdownRenderer, MarkdownView};
