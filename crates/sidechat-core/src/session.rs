use crate::context::{ConversationHistory, FileAttachment, ImageAttachment, PendingAttachments};
use crate::error::Result;
use crate::llm::{decode_stream, AssembledResponse, ContentPart, LlmClient, Message, Usage};

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't get a response from the model. Please try again.";

pub const GENERATE_CODE_PROMPT: &str =
    "Generate the code that reproduces the interface shown in this image.";

/// Receives the progress of one turn. Rendering lives behind this trait so
/// the session never touches a UI directly.
pub trait TurnObserver {
    /// Turn started (`true`) or finished (`false`).
    fn on_loading(&mut self, _loading: bool) {}

    /// A new fragment arrived; `assembled` is the whole reply so far.
    fn on_delta(&mut self, delta: &str, assembled: &str);

    /// The reply text that was appended to the conversation, either the
    /// assembled response or the fallback message.
    fn on_complete(&mut self, final_text: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Nothing to send; no request was made and the history is unchanged.
    Skipped,
    Completed {
        text: String,
        usage: Option<Usage>,
    },
    /// The transport failed; the fallback was recorded as the reply.
    Failed { fallback: String, error: String },
}

impl TurnOutcome {
    /// Text recorded as the assistant reply, if a turn happened.
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnOutcome::Skipped => None,
            TurnOutcome::Completed { text, .. } => Some(text),
            TurnOutcome::Failed { fallback, .. } => Some(fallback),
        }
    }
}

/// One chat panel's conversation state.
///
/// `send` takes `&mut self`, so a session can only have one turn in flight.
pub struct ChatSession {
    id: String,
    client: Box<dyn LlmClient>,
    history: ConversationHistory,
    attachments: PendingAttachments,
    streaming: bool,
    fallback_message: String,
    last_usage: Option<Usage>,
}

impl ChatSession {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client,
            history: ConversationHistory::new(),
            attachments: PendingAttachments::new(),
            streaming: true,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            last_usage: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.history.set_system_prompt(prompt);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn attachments(&self) -> &PendingAttachments {
        &self.attachments
    }

    pub fn last_usage(&self) -> Option<&Usage> {
        self.last_usage.as_ref()
    }

    pub fn attach_image(&mut self, image: ImageAttachment) {
        self.attachments.add_image(image);
    }

    pub fn attach_file(&mut self, file: FileAttachment) {
        self.attachments.add_file(file);
    }

    /// Drop the pending file attached as `path`; returns whether it was there.
    pub fn detach_file(&mut self, path: &str) -> bool {
        self.attachments.remove_file(path)
    }

    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }

    /// Start a fresh conversation. The system prompt is kept.
    pub fn clear(&mut self) {
        self.history.clear();
        self.attachments.clear();
        self.last_usage = None;
    }

    /// Run one turn with `text` plus any pending attachments.
    pub async fn send(&mut self, text: &str, observer: &mut dyn TurnObserver) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() && self.attachments.is_empty() {
            tracing::debug!(session = %self.id, "ignoring empty turn");
            return TurnOutcome::Skipped;
        }

        let attachments = self.attachments.take();
        self.history.add_message(build_user_message(text, &attachments));
        self.run_turn(observer).await
    }

    /// Ask the model to write code for the UI shown in `image`.
    pub async fn generate_code_from_image(
        &mut self,
        image: ImageAttachment,
        observer: &mut dyn TurnObserver,
    ) -> TurnOutcome {
        self.attachments.add_image(image);
        self.send(GENERATE_CODE_PROMPT, observer).await
    }

    async fn run_turn(&mut self, observer: &mut dyn TurnObserver) -> TurnOutcome {
        tracing::debug!(
            session = %self.id,
            model = self.client.model(),
            messages = self.history.len(),
            streaming = self.streaming,
            "starting turn"
        );
        observer.on_loading(true);

        let messages = self.history.get_messages();
        let result = if self.streaming {
            stream_reply(self.client.as_ref(), &messages, observer).await
        } else {
            batch_reply(self.client.as_ref(), &messages, observer).await
        };

        let outcome = match result {
            Ok(response) => {
                self.history.add_assistant_message(response.text.clone());
                observer.on_complete(&response.text);
                self.last_usage = response.usage.clone();
                TurnOutcome::Completed {
                    text: response.text,
                    usage: response.usage,
                }
            }
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "turn failed, using fallback reply");
                self.history.add_assistant_message(self.fallback_message.clone());
                observer.on_complete(&self.fallback_message);
                TurnOutcome::Failed {
                    fallback: self.fallback_message.clone(),
                    error: e.to_string(),
                }
            }
        };

        observer.on_loading(false);
        outcome
    }
}

async fn stream_reply(
    client: &dyn LlmClient,
    messages: &[Message],
    observer: &mut dyn TurnObserver,
) -> Result<AssembledResponse> {
    let stream = client.chat_stream(messages).await?;
    decode_stream(stream, |delta, assembled| observer.on_delta(delta, assembled)).await
}

async fn batch_reply(
    client: &dyn LlmClient,
    messages: &[Message],
    observer: &mut dyn TurnObserver,
) -> Result<AssembledResponse> {
    let response = client.chat(messages).await?;
    let text = response.message.text();
    if !text.is_empty() {
        observer.on_delta(&text, &text);
    }
    Ok(AssembledResponse {
        text,
        usage: response.usage,
    })
}

/// Text only becomes a plain string message; anything attached turns it
/// into parts: the text, then each file, then each image.
fn build_user_message(text: &str, attachments: &PendingAttachments) -> Message {
    if attachments.is_empty() {
        return Message::user(text);
    }

    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.is_empty() {
        parts.push(ContentPart::text(text));
    }
    parts.extend(attachments.files.iter().map(FileAttachment::to_part));
    parts.extend(attachments.images.iter().map(ImageAttachment::to_part));
    Message::user_with_parts(parts)
}
