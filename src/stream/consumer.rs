use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::buffer::ReceiveBuffer;
use super::error::TransportError;
use super::event::{decode_line, Line, StreamEvent};

/// How an in-band `error` event affects the rest of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Keep reading; the session ignores whatever follows.
    #[default]
    Continue,
    /// Stop at the error line and release the connection.
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// End of body. `discarded` counts trailing bytes that never formed a line.
    Completed { events: usize, discarded: usize },
    Halted { message: String },
    Cancelled,
}

/// Turns network fragments into events, one body at a time.
#[derive(Debug, Default)]
pub struct StreamConsumer {
    buffer: ReceiveBuffer,
    policy: ErrorPolicy,
    events: usize,
    halted: Option<String>,
}

impl StreamConsumer {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Feeds one fragment and returns the events completed by it, in order.
    pub fn feed(&mut self, fragment: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.halted.is_some() {
            return events;
        }

        for line in self.buffer.push(fragment) {
            match decode_line(&line) {
                Ok(Line::Event(event)) => {
                    let halt = match &event {
                        StreamEvent::Error(message) if self.policy == ErrorPolicy::Halt => {
                            Some(message.clone())
                        }
                        _ => None,
                    };
                    events.push(event);
                    if halt.is_some() {
                        self.halted = halt;
                        break;
                    }
                }
                Ok(Line::Terminator) | Ok(Line::Ignored) => {}
                Err(e) => {
                    log::warn!("skipping event line: {} (line: {:?})", e, line);
                }
            }
        }

        self.events += events.len();
        events
    }

    /// Reads `body` to the end, handing each event to `apply` as soon as its line is complete.
    pub async fn consume<S, B, F>(
        mut self,
        body: S,
        cancel: &CancellationToken,
        mut apply: F,
    ) -> Result<StreamOutcome, TransportError>
    where
        S: Stream<Item = Result<B, TransportError>>,
        B: AsRef<[u8]>,
        F: FnMut(StreamEvent),
    {
        let mut body = std::pin::pin!(body);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("stream cancelled after {} events", self.events);
                    return Ok(StreamOutcome::Cancelled);
                }
                next = body.next() => next,
            };

            let Some(fragment) = next else {
                break;
            };
            let fragment = fragment?;

            for event in self.feed(fragment.as_ref()) {
                apply(event);
            }

            if let Some(message) = self.halted.take() {
                log::warn!("stream halted by server error: {}", message);
                return Ok(StreamOutcome::Halted { message });
            }
        }

        let discarded = self.buffer.discard();
        if discarded > 0 {
            log::debug!("discarding {} bytes of unterminated trailing line", discarded);
        }

        Ok(StreamOutcome::Completed {
            events: self.events,
            discarded,
        })
    }
}
