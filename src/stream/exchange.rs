use std::cell::RefCell;
use std::future::Future;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::consumer::{ErrorPolicy, StreamConsumer, StreamOutcome};
use super::error::TransportError;
use super::session::{ChatSession, ExchangeId, ExchangePhase};

/// Somewhere a `ChatSession` lives while an exchange writes into it.
///
/// `update` returns `None` once the owner is gone (an unmounted view), and the
/// exchange then stops touching it.
pub trait SessionStore {
    fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> Option<R>;
}

impl SessionStore for RefCell<ChatSession> {
    fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> Option<R> {
        self.try_borrow_mut().ok().map(|mut session| f(&mut session))
    }
}

impl SessionStore for leptos::prelude::RwSignal<ChatSession> {
    fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> Option<R> {
        use leptos::prelude::Update;
        self.try_update(f)
    }
}

/// Drives one question from request to final phase.
///
/// The caller has already called [`ChatSession::submit`] and passes the returned
/// exchange handle. `open` resolves to the response body once the server accepted
/// the request. Reading stops as soon as the exchange is over in the session, and
/// nothing is written once another exchange has taken its place.
pub async fn run_exchange<S, Fut, Body, Chunk>(
    store: &S,
    exchange: ExchangeId,
    open: Fut,
    policy: ErrorPolicy,
    cancel: &CancellationToken,
) -> ExchangePhase
where
    S: SessionStore,
    Fut: Future<Output = Result<Body, TransportError>>,
    Body: Stream<Item = Result<Chunk, TransportError>>,
    Chunk: AsRef<[u8]>,
{
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            store.update(|s| s.cancel(exchange));
            return ExchangePhase::Cancelled;
        }
        opened = open => opened,
    };

    let body = match opened {
        Ok(body) => body,
        Err(e) => {
            log::warn!("chat request failed: {}", e);
            store.update(|s| s.fail(exchange, &e));
            return ExchangePhase::Errored;
        }
    };

    if store.update(|s| s.start_streaming(exchange)).flatten().is_none() {
        log::debug!("session no longer waiting for {:?}", exchange);
        return ExchangePhase::Cancelled;
    }

    // ends the read once the session has closed this exchange
    let reading = cancel.child_token();
    let mut ended = None;
    let outcome = StreamConsumer::new(policy)
        .consume(body, &reading, |event| {
            let closed = store.update(|s| {
                s.apply(exchange, event);
                (!s.is_current(exchange)).then(|| s.phase())
            });
            match closed {
                Some(None) => {}
                Some(Some(phase)) => {
                    ended.get_or_insert(phase);
                    reading.cancel();
                }
                None => {
                    ended.get_or_insert(ExchangePhase::Cancelled);
                    reading.cancel();
                }
            }
        })
        .await;

    if let Some(phase) = ended {
        return phase;
    }

    let finalize = |s: &mut ChatSession| {
        match &outcome {
            Ok(StreamOutcome::Cancelled) => s.cancel(exchange),
            Ok(_) => s.finish(exchange),
            Err(e) => {
                log::warn!("chat stream failed: {}", e);
                s.fail(exchange, e);
            }
        }
        s.phase()
    };
    store.update(finalize).unwrap_or(ExchangePhase::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::session::error_text;
    use futures::stream::{self, BoxStream, StreamExt};

    type Body = BoxStream<'static, Result<Vec<u8>, TransportError>>;

    fn body(lines: &[&str]) -> Body {
        let parts: Vec<Result<Vec<u8>, TransportError>> =
            lines.iter().map(|l| Ok(l.as_bytes().to_vec())).collect();
        stream::iter(parts).boxed()
    }

    fn submitted(question: &str) -> (RefCell<ChatSession>, ExchangeId) {
        let mut session = ChatSession::new(4);
        let exchange = session.submit(question).unwrap().exchange;
        (RefCell::new(session), exchange)
    }

    struct Unmounted;

    impl SessionStore for Unmounted {
        fn update<R>(&self, _f: impl FnOnce(&mut ChatSession) -> R) -> Option<R> {
            None
        }
    }

    #[tokio::test]
    async fn streamed_answer_completes() {
        let (store, exchange) = submitted("what is in doc A?");
        let open = async {
            Ok::<_, TransportError>(body(&[
                "data: {\"type\":\"sources\",\"sources\":[{\"score\":0.8,\"content\":\"doc A\"}]}\n\n",
                "data: {\"type\":\"chunk\",\"content\":\"Hello\"}\n\n",
                "data: {\"type\":\"chunk\",\"content\":\" world\"}\n\n",
            ]))
        };

        let phase = run_exchange(&store, exchange, open, ErrorPolicy::Continue, &CancellationToken::new()).await;

        assert_eq!(phase, ExchangePhase::Completed);
        let session = store.borrow();
        let answer = session.transcript().last().unwrap();
        assert_eq!(answer.content, "Hello world");
        assert_eq!(answer.sources.as_ref().map(Vec::len), Some(1));
        assert!(!session.is_asking());
    }

    #[tokio::test]
    async fn rejected_request_leaves_a_single_error() {
        let (store, exchange) = submitted("q");
        let open = async { Err::<Body, _>(TransportError::RequestFailed { status: 500 }) };

        let phase = run_exchange(&store, exchange, open, ErrorPolicy::Continue, &CancellationToken::new()).await;

        assert_eq!(phase, ExchangePhase::Errored);
        let session = store.borrow();
        let errors: Vec<_> = session.transcript().messages().iter().filter(|m| m.is_error).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].content.contains("500"));
        assert!(!session.is_asking());
    }

    #[tokio::test]
    async fn in_band_error_under_halt_policy() {
        let (store, exchange) = submitted("q");
        let open = async {
            Ok::<_, TransportError>(body(&[
                "data: {\"type\":\"answer\",\"content\":\"partial\"}\n",
                "data: {\"type\":\"error\",\"content\":\"boom\"}\n",
                "data: {\"type\":\"answer\",\"content\":\" more\"}\n",
            ]))
        };

        let phase = run_exchange(&store, exchange, open, ErrorPolicy::Halt, &CancellationToken::new()).await;

        assert_eq!(phase, ExchangePhase::Errored);
        let session = store.borrow();
        let last = session.transcript().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.content, error_text("boom"));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn cancel_before_response_drops_nothing_but_the_wait() {
        let (store, exchange) = submitted("q");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let phase = run_exchange(
            &store,
            exchange,
            std::future::pending::<Result<Body, TransportError>>(),
            ErrorPolicy::Continue,
            &cancel,
        )
        .await;

        assert_eq!(phase, ExchangePhase::Cancelled);
        assert_eq!(store.borrow().transcript().len(), 1);
        assert!(!store.borrow().is_asking());
    }

    #[tokio::test]
    async fn unmounted_store_is_left_alone() {
        let open = async { Ok::<_, TransportError>(body(&["data: {\"type\":\"chunk\",\"content\":\"x\"}\n"])) };
        let phase = run_exchange(&Unmounted, ExchangeId(0), open, ErrorPolicy::Continue, &CancellationToken::new()).await;
        assert_eq!(phase, ExchangePhase::Cancelled);
    }

    #[tokio::test]
    async fn finished_exchange_never_writes_into_the_next_one() {
        for terminal in [
            "data: {\"type\":\"done\"}\n",
            "data: {\"type\":\"error\",\"content\":\"boom\"}\n",
        ] {
            let (store, first) = submitted("q1");
            let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Vec<u8>, TransportError>>();
            let open = async move { Ok::<_, TransportError>(rx) };

            let cancel = CancellationToken::new();
            let driver = run_exchange(&store, first, open, ErrorPolicy::Continue, &cancel);
            let user = async {
                let _ = tx.unbounded_send(Ok(b"data: {\"type\":\"chunk\",\"content\":\"a1\"}\n".to_vec()));
                let _ = tx.unbounded_send(Ok(terminal.as_bytes().to_vec()));
                while store.borrow().is_asking() {
                    tokio::task::yield_now().await;
                }

                let second = store.borrow_mut().submit("q2").unwrap().exchange;
                let second_id = store.borrow_mut().start_streaming(second).unwrap();
                let _ = tx.unbounded_send(Ok(b"data: {\"type\":\"chunk\",\"content\":\"STALE\"}\n".to_vec()));
                drop(tx);
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                (second, second_id)
            };

            let (first_phase, (second, second_id)) = tokio::join!(driver, user);

            assert_ne!(first_phase, ExchangePhase::Streaming);
            let session = store.borrow();
            assert_eq!(session.transcript().get(second_id).unwrap().content, "");
            assert_eq!(session.phase(), ExchangePhase::Streaming);
            assert_eq!(session.in_flight(), Some(second_id));
            assert!(session.is_current(second));
            assert!(!session.transcript().messages().iter().any(|m| m.content.contains("STALE")));
        }
    }
}
