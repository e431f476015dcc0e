mod history;
pub mod attachments;

pub use history::ConversationHistory;
pub use attachments::{FileAttachment, ImageAttachment, PendingAttachments};
