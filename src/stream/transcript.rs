use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, MessageId, Role};

/// Ordered messages of one conversation. Messages are addressed by id, never by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Role::User, content.into(), false)
    }

    pub fn push_assistant(&mut self) -> MessageId {
        self.push(Role::Assistant, String::new(), false)
    }

    pub fn push_error(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Role::Assistant, content.into(), true)
    }

    fn push(&mut self, role: Role, content: String, is_error: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            content,
            sources: None,
            is_error,
        });
        id
    }

    // ids are handed out in increasing order, so the vector stays sorted by id
    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.binary_search_by_key(&id, |m| m.id).ok()
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.position(id).map(|i| &self.messages[i])
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.position(id).map(move |i| &mut self.messages[i])
    }

    pub fn remove(&mut self, id: MessageId) -> Option<ChatMessage> {
        self.position(id).map(|i| self.messages.remove(i))
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_survive_removal_and_clear() {
        let mut transcript = Transcript::new();
        let question = transcript.push_user("hi");
        let answer = transcript.push_assistant();

        transcript.remove(question);
        assert_eq!(transcript.get(answer).map(|m| m.role), Some(Role::Assistant));
        assert!(transcript.get(question).is_none());

        transcript.clear();
        let next = transcript.push_user("again");
        assert!(next > answer);
    }

    #[test]
    fn error_messages_are_flagged() {
        let mut transcript = Transcript::new();
        let id = transcript.push_error("Error: offline");
        let message = transcript.get(id).unwrap();
        assert!(message.is_error);
        assert_eq!(message.role, Role::Assistant);
    }
}
