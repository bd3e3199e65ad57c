//! Client side of the streaming chat protocol: bytes in, transcript updates out.

pub mod buffer;
pub mod consumer;
pub mod error;
pub mod event;
pub mod exchange;
#[cfg(feature = "hydrate")]
pub mod fetch;
pub mod session;
pub mod transcript;

pub use buffer::ReceiveBuffer;
pub use consumer::{ErrorPolicy, StreamConsumer, StreamOutcome};
pub use error::{ProtocolError, TransportError};
pub use event::{decode_line, Line, StreamEvent};
pub use exchange::{run_exchange, SessionStore};
pub use session::{error_text, ChatSession, ExchangeId, ExchangePhase, SessionError, Submission};
pub use transcript::Transcript;
