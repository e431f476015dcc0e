use crate::llm::{Message, Role};

/// Append-only conversation transcript. Messages are replayed to the model
/// verbatim in insertion order.
pub struct ConversationHistory {
    messages: Vec<Message>,
    system_prompt: Option<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages including system prompt as a system message.
    pub fn get_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(ref system) = self.system_prompt {
            messages.push(Message::system(system));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }

    /// Conversation messages only (no system prompt).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    /// Rough token estimate (four bytes per token, text parts only).
    pub fn estimate_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.text().len() / 4).sum()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_is_prepended() {
        let mut history = ConversationHistory::new().with_system_prompt("sys");
        history.add_user_message("q");
        history.add_assistant_message("a");

        let messages = history.get_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system("sys"));
        assert_eq!(messages[1], Message::user("q"));
        assert_eq!(messages[2], Message::assistant("a"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut history = ConversationHistory::new();
        for i in 0..150 {
            history.add_user_message(format!("m{i}"));
        }
        assert_eq!(history.len(), 150);
        assert_eq!(history.messages()[0].text(), "m0");
        assert_eq!(history.last_message().unwrap().text(), "m149");
        assert_eq!(history.count_role(Role::User), 150);
    }

    #[test]
    fn test_clear_keeps_system_prompt() {
        let mut history = ConversationHistory::new().with_system_prompt("sys");
        history.add_user_message("q");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.system_prompt(), Some("sys"));
        assert_eq!(history.get_messages().len(), 1);
    }

    #[test]
    fn test_estimate_tokens() {
        let mut history = ConversationHistory::new();
        history.add_user_message("abcdefgh");
        assert_eq!(history.estimate_tokens(), 2);
    }
}
