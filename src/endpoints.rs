//! Paths of the backend API, and of the relay that exposes part of it to the browser.

use crate::config::{clamp_k, DEFAULT_K};
use crate::stream::{ErrorPolicy, Submission};
use crate::types::QueryRequest;

/// Mount point of the relay route on this server.
pub const RELAY_PREFIX: &str = "/relay";

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub fn login() -> String {
    "/auth/login".to_string()
}

pub fn register() -> String {
    "/auth/register".to_string()
}

pub fn me() -> String {
    "/auth/me".to_string()
}

pub fn chatbots() -> String {
    "/chatbots".to_string()
}

pub fn chatbot(id: &str) -> String {
    format!("/chatbots/{}", segment(id))
}

pub fn chatbot_documents(id: &str) -> String {
    format!("/chatbots/{}/documents", segment(id))
}

pub fn chatbot_conversations(id: &str) -> String {
    format!("/chatbots/{}/conversations", segment(id))
}

pub fn chatbot_query(id: &str) -> String {
    format!("/chatbots/{}/query", segment(id))
}

pub fn chatbot_query_stream(id: &str) -> String {
    format!("/chatbots/{}/query/stream", segment(id))
}

pub fn public_chatbot(share_token: &str) -> String {
    format!("/chatbots/public/{}", segment(share_token))
}

pub fn public_query(share_token: &str) -> String {
    format!("/chatbots/public/{}/query", segment(share_token))
}

/// Browser-facing URL of a backend path served through the relay.
pub fn relayed(path: &str) -> String {
    format!("{}{}", RELAY_PREFIX, path)
}

/// Which chatbot a conversation talks to, and through which endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    /// The owner's dashboard chat. Authenticated, no history sent.
    Owned { chatbot_id: String },
    /// The public page and the embeddable widget.
    Public { share_token: String },
}

impl ChatTarget {
    /// Backend path of the streaming endpoint.
    pub fn stream_path(&self) -> String {
        match self {
            ChatTarget::Owned { chatbot_id } => chatbot_query_stream(chatbot_id),
            ChatTarget::Public { share_token } => public_query(share_token),
        }
    }

    pub fn relay_url(&self) -> String {
        relayed(&self.stream_path())
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        match self {
            ChatTarget::Owned { .. } => ErrorPolicy::Continue,
            ChatTarget::Public { .. } => ErrorPolicy::Halt,
        }
    }

    pub fn needs_token(&self) -> bool {
        matches!(self, ChatTarget::Owned { .. })
    }

    pub fn request(&self, submission: Submission) -> QueryRequest {
        let conversation_history = match self {
            ChatTarget::Owned { .. } => None,
            ChatTarget::Public { .. } => Some(submission.history),
        };
        QueryRequest {
            question: submission.question,
            k: clamp_k(DEFAULT_K),
            conversation_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ExchangeId;
    use crate::types::{HistoryEntry, Role};

    fn submission() -> Submission {
        Submission {
            exchange: ExchangeId(0),
            question: "what is in doc A?".to_string(),
            history: vec![HistoryEntry {
                role: Role::User,
                content: "hi".to_string(),
            }],
        }
    }

    #[test]
    fn ids_are_path_encoded() {
        assert_eq!(chatbot("abc 1/2"), "/chatbots/abc%201%2F2");
        assert_eq!(public_query("tok-_9"), "/chatbots/public/tok-_9/query");
    }

    #[test]
    fn owned_target_streams_without_history() {
        let target = ChatTarget::Owned {
            chatbot_id: "65f0".to_string(),
        };
        assert_eq!(target.relay_url(), "/relay/chatbots/65f0/query/stream");
        assert_eq!(target.error_policy(), ErrorPolicy::Continue);

        let request = target.request(submission());
        assert_eq!(request.k, 4);
        assert!(request.conversation_history.is_none());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "question": "what is in doc A?", "k": 4 })
        );
    }

    #[test]
    fn public_target_sends_history_and_halts_on_error() {
        let target = ChatTarget::Public {
            share_token: "s3cr3t".to_string(),
        };
        assert_eq!(target.relay_url(), "/relay/chatbots/public/s3cr3t/query");
        assert_eq!(target.error_policy(), ErrorPolicy::Halt);
        assert!(!target.needs_token());

        let request = target.request(submission());
        assert_eq!(request.conversation_history.map(|h| h.len()), Some(1));
    }
}
