use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Retrieval hit attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub content: String,
}

/// Handle to one message of a transcript. Ids are never reused within a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub sources: Option<Vec<Source>>,
    pub is_error: bool,
}

impl ChatMessage {
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.sources.as_ref().map_or(true, |s| s.is_empty())
    }
}

/// One `{role, content}` pair sent back to the public endpoint as conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        HistoryEntry {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub k: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub chatbot_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub upload_date: String,
    pub chunks_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub documents: Vec<DocumentInfo>,
    pub share_link: Option<String>,
    pub widget_link: Option<String>,
    pub embed_code: Option<String>,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub estimated_cost: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields accepted by both the create and the update chatbot endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatbotDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatbotDraft {
    pub fn from_chatbot(chatbot: &ChatbotView) -> Self {
        ChatbotDraft {
            name: chatbot.name.clone(),
            description: chatbot.description.clone(),
            system_prompt: chatbot.system_prompt.clone(),
        }
    }

    /// Trims every field and drops the empty optional ones.
    pub fn normalized(self) -> Self {
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        ChatbotDraft {
            name: self.name.trim().to_string(),
            description: non_empty(self.description),
            system_prompt: non_empty(self.system_prompt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    pub created_at: String,
}

/// Renders a backend timestamp (naive ISO-8601 or RFC 3339) for display, falling back to the raw text.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|parsed| parsed.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
