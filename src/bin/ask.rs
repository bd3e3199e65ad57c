//! Ask a chatbot one question from the terminal, printing the answer as it streams.
//!
//! ```text
//! ask public <share_token> <question...>
//! RAGBOT_TOKEN=... ask owned <chatbot_id> <question...>
//! ```

use dotenv::dotenv;

#[cfg(feature = "ssr")]
mod cli {
    use std::cell::{Cell, RefCell};
    use std::io::Write;

    use anyhow::{anyhow, bail, Context};
    use ragbot::backend::BackendClient;
    use ragbot::config::BackendConfig;
    use ragbot::endpoints::ChatTarget;
    use ragbot::stream::{run_exchange, ChatSession, ExchangePhase, SessionStore};
    use ragbot::types::{ChatMessage, Role};
    use tokio_util::sync::CancellationToken;

    pub const TOKEN_VAR: &str = "RAGBOT_TOKEN";

    /// Session that echoes new assistant text to stdout after every update.
    struct EchoSession {
        session: RefCell<ChatSession>,
        printed: Cell<usize>,
    }

    impl EchoSession {
        fn new() -> Self {
            Self {
                session: RefCell::new(ChatSession::default()),
                printed: Cell::new(0),
            }
        }

        fn last_message(&self) -> Option<ChatMessage> {
            self.session.borrow().transcript().last().cloned()
        }
    }

    impl SessionStore for EchoSession {
        fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> Option<R> {
            let result = self.session.update(f)?;
            if let Some(message) = self.session.borrow().transcript().last() {
                if message.role == Role::Assistant && !message.is_error {
                    let printed = self.printed.get();
                    if let Some(fresh) = message.content.get(printed..) {
                        if !fresh.is_empty() {
                            print!("{}", fresh);
                            let _ = std::io::stdout().flush();
                            self.printed.set(message.content.len());
                        }
                    }
                }
            }
            Some(result)
        }
    }

    fn parse_target(kind: &str, id: String) -> anyhow::Result<ChatTarget> {
        match kind {
            "public" => Ok(ChatTarget::Public { share_token: id }),
            "owned" => Ok(ChatTarget::Owned { chatbot_id: id }),
            other => bail!("unknown target '{}', expected 'public' or 'owned'", other),
        }
    }

    pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
        let [kind, id, question @ ..] = args.as_slice() else {
            bail!("usage: ask <public|owned> <share_token|chatbot_id> <question...>");
        };
        let target = parse_target(kind, id.clone())?;
        let question = question.join(" ");

        let token = if target.needs_token() {
            Some(std::env::var(TOKEN_VAR).with_context(|| format!("{} must be set for owned chatbots", TOKEN_VAR))?)
        } else {
            None
        };

        let client = BackendClient::new(&BackendConfig::from_env()?)?;
        let store = EchoSession::new();
        let submission = store
            .session
            .borrow_mut()
            .submit(&question)
            .map_err(|e| anyhow!(e))?;
        let exchange = submission.exchange;
        let request = target.request(submission);
        let path = target.stream_path();
        log::debug!("asking {}{}", client.base_url(), path);

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let phase = run_exchange(
            &store,
            exchange,
            client.open_stream(&path, token.as_deref(), &request),
            target.error_policy(),
            &cancel,
        )
        .await;
        println!();

        if phase == ExchangePhase::Cancelled {
            bail!("cancelled");
        }
        let last = store.last_message();
        if let Some(failed) = last.as_ref().filter(|m| m.is_error) {
            bail!(failed.content.clone());
        }
        if phase != ExchangePhase::Completed {
            bail!("request ended in state {:?}", phase);
        }

        for (i, source) in last.and_then(|m| m.sources).unwrap_or_default().iter().enumerate() {
            let excerpt: String = source.content.chars().take(120).collect();
            println!("[{}] ({:.2}) {}", i + 1, source.score, excerpt.replace('\n', " "));
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn target_kinds() {
            assert_eq!(
                parse_target("public", "tok".to_string()).unwrap(),
                ChatTarget::Public { share_token: "tok".to_string() }
            );
            assert!(parse_target("owned", "id".to_string()).unwrap().needs_token());
            assert!(parse_target("shared", "id".to_string()).is_err());
        }
    }
}

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    if let Err(e) = cli::run(std::env::args().skip(1).collect()).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    dotenv().ok();
    eprintln!("This binary requires the 'ssr' feature");
    std::process::exit(1);
}
