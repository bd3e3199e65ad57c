use thiserror::Error;

use super::error::TransportError;
use super::event::StreamEvent;
use super::transcript::Transcript;
use crate::types::{HistoryEntry, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Completed,
    Errored,
    Cancelled,
}

impl ExchangePhase {
    pub fn is_busy(self) -> bool {
        matches!(self, ExchangePhase::Requesting | ExchangePhase::Streaming)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a question is already being answered")]
    Busy,
    #[error("question is empty")]
    EmptyQuestion,
}

/// Handle to one question-and-answer exchange. Every later call for that exchange
/// passes it back, and calls carrying a stale handle change nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(pub u64);

/// What the caller needs to send for an accepted question.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub exchange: ExchangeId,
    pub question: String,
    pub history: Vec<HistoryEntry>,
}

pub fn error_text(message: impl std::fmt::Display) -> String {
    format!("Error: {message}")
}

/// Transcript plus the state of the exchange currently feeding it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    transcript: Transcript,
    phase: ExchangePhase,
    in_flight: Option<MessageId>,
    // set exactly while an exchange is busy
    current: Option<ExchangeId>,
    next_exchange: u64,
    history_window: usize,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(crate::config::HISTORY_WINDOW)
    }
}

impl ChatSession {
    pub fn new(history_window: usize) -> Self {
        Self {
            transcript: Transcript::new(),
            phase: ExchangePhase::Idle,
            in_flight: None,
            current: None,
            next_exchange: 0,
            history_window,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    pub fn is_asking(&self) -> bool {
        self.phase.is_busy()
    }

    /// The assistant message the running exchange writes into, if any.
    pub fn in_flight(&self) -> Option<MessageId> {
        self.in_flight
    }

    /// Whether `exchange` is the one still allowed to write into the transcript.
    pub fn is_current(&self, exchange: ExchangeId) -> bool {
        self.current == Some(exchange)
    }

    fn end(&mut self, phase: ExchangePhase) {
        self.phase = phase;
        self.in_flight = None;
        self.current = None;
    }

    /// Records the user's question and moves to `Requesting`.
    pub fn submit(&mut self, question: &str) -> Result<Submission, SessionError> {
        if self.is_asking() {
            return Err(SessionError::Busy);
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let history = self.recent_history();
        self.transcript.push_user(question);
        let exchange = ExchangeId(self.next_exchange);
        self.next_exchange += 1;
        self.phase = ExchangePhase::Requesting;
        self.in_flight = None;
        self.current = Some(exchange);

        Ok(Submission {
            exchange,
            question: question.to_string(),
            history,
        })
    }

    fn recent_history(&self) -> Vec<HistoryEntry> {
        let usable: Vec<HistoryEntry> = self
            .transcript
            .messages()
            .iter()
            .filter(|m| !m.is_error && !m.content.is_empty())
            .map(HistoryEntry::from)
            .collect();
        let skip = usable.len().saturating_sub(self.history_window);
        usable.into_iter().skip(skip).collect()
    }

    /// The response was accepted; creates the placeholder every later event targets.
    pub fn start_streaming(&mut self, exchange: ExchangeId) -> Option<MessageId> {
        if !self.is_current(exchange) || self.phase != ExchangePhase::Requesting {
            return None;
        }
        let id = self.transcript.push_assistant();
        self.phase = ExchangePhase::Streaming;
        self.in_flight = Some(id);
        Some(id)
    }

    /// Applies one event to the in-flight message. Returns whether anything changed.
    pub fn apply(&mut self, exchange: ExchangeId, event: StreamEvent) -> bool {
        if !self.is_current(exchange) {
            log::debug!("dropping {:?}: {:?} is over", event, exchange);
            return false;
        }
        let Some(id) = self.in_flight else {
            log::debug!("dropping {:?}: no answer started", event);
            return false;
        };
        let Some(message) = self.transcript.get_mut(id) else {
            self.end(ExchangePhase::Errored);
            return false;
        };

        match event {
            StreamEvent::Sources(sources) => {
                message.sources = Some(sources);
            }
            StreamEvent::Chunk(text) => {
                message.content.push_str(&text);
            }
            StreamEvent::Error(reason) => {
                message.content = error_text(reason);
                message.sources = None;
                message.is_error = true;
                self.end(ExchangePhase::Errored);
            }
            StreamEvent::Done => {
                log::info!("answer {:?} complete ({} chars)", id, message.content.len());
                self.end(ExchangePhase::Completed);
            }
        }
        true
    }

    /// The body ended without an in-band terminal event.
    pub fn finish(&mut self, exchange: ExchangeId) {
        if !self.is_current(exchange) {
            return;
        }
        if self.phase == ExchangePhase::Streaming {
            self.end(ExchangePhase::Completed);
        } else {
            self.end(ExchangePhase::Errored);
            self.transcript.push_error(error_text("the server closed the connection before answering"));
        }
    }

    /// The request or a read failed. Leaves exactly one error message for this exchange.
    pub fn fail(&mut self, exchange: ExchangeId, error: &TransportError) {
        if !self.is_current(exchange) {
            log::debug!("ignoring late transport error: {}", error);
            return;
        }

        let text = error_text(error);
        match self.in_flight.and_then(|id| self.transcript.get_mut(id)) {
            Some(message) if message.is_blank() => {
                message.content = text;
                message.is_error = true;
            }
            _ => {
                self.transcript.push_error(text);
            }
        }
        self.end(ExchangePhase::Errored);
    }

    /// Stops the exchange at the user's request, dropping the placeholder if nothing arrived.
    pub fn cancel(&mut self, exchange: ExchangeId) {
        if !self.is_current(exchange) {
            return;
        }
        if let Some(id) = self.in_flight {
            if self.transcript.get(id).is_some_and(|m| m.is_blank()) {
                self.transcript.remove(id);
            }
        }
        self.end(ExchangePhase::Cancelled);
    }

    pub fn clear(&mut self) {
        if !self.is_asking() {
            self.transcript.clear();
            self.phase = ExchangePhase::Idle;
        }
    }
}
