use leptos::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::auth::use_auth;
use crate::components::markdown::MarkdownRenderer;
use crate::endpoints::ChatTarget;
use crate::stream::{ChatSession, Submission};
use crate::types::{MessageId, Role, Source};

const SOURCE_PREVIEW_CHARS: usize = 200;

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(SOURCE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

#[cfg(feature = "hydrate")]
fn start_exchange(
    session: RwSignal<ChatSession>,
    target: ChatTarget,
    submission: Submission,
    bearer: Option<String>,
    cancel: CancellationToken,
) {
    use crate::stream::{fetch, run_exchange};

    leptos::task::spawn_local(async move {
        let exchange = submission.exchange;
        let request = target.request(submission);
        let url = target.relay_url();
        let open = fetch::open_stream(&url, &request, bearer.as_deref());
        let phase = run_exchange(&session, exchange, open, target.error_policy(), &cancel).await;
        log::debug!("exchange with {} ended as {:?}", url, phase);
    });
}

// questions are only ever sent from the browser
#[cfg(not(feature = "hydrate"))]
fn start_exchange(
    _session: RwSignal<ChatSession>,
    _target: ChatTarget,
    _submission: Submission,
    _bearer: Option<String>,
    _cancel: CancellationToken,
) {
}

/// Question box plus streamed transcript, for either an owned or a public chatbot.
#[component]
pub fn ChatPanel(
    target: ChatTarget,
    #[prop(into, optional)] disabled: Signal<bool>,
    #[prop(into, default = "Ask a question about your documents...".to_string())] placeholder: String,
) -> impl IntoView {
    let auth = use_auth();
    let session = RwSignal::new(ChatSession::default());
    let cancel = StoredValue::new(None::<CancellationToken>);
    let target = StoredValue::new(target);
    let (input, set_input) = signal(String::new());

    let is_asking = Memo::new(move |_| session.with(|s| s.is_asking()));

    on_cleanup(move || {
        if let Some(Some(token)) = cancel.try_get_value() {
            token.cancel();
        }
    });

    let send = move || {
        if disabled.get_untracked() {
            return;
        }
        let question = input.get_untracked();
        let submission = match session.try_update(|s| s.submit(&question)) {
            Some(Ok(submission)) => submission,
            Some(Err(e)) => {
                log::debug!("question not sent: {}", e);
                return;
            }
            None => return,
        };
        set_input.set(String::new());

        let token = CancellationToken::new();
        if let Some(previous) = cancel.get_value() {
            previous.cancel();
        }
        cancel.set_value(Some(token.clone()));
        let target = target.get_value();
        let bearer = if target.needs_token() {
            auth.token_untracked()
        } else {
            None
        };

        start_exchange(session, target, submission, bearer, token);
    };

    let stop = move |_| {
        if let Some(token) = cancel.get_value() {
            token.cancel();
        }
    };

    let clear = move |_| session.update(|s| s.clear());

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="chat-panel flex flex-col h-[600px]">
            <div class="flex-1 overflow-y-auto p-4 space-y-4">
                {move || {
                    session
                        .with(|s| s.transcript().is_empty())
                        .then(|| {
                            view! {
                                <p class="text-center text-gray-500">
                                    "Ask your first question to start the conversation."
                                </p>
                            }
                        })
                }}
                <For
                    each=move || session.with(|s| s.transcript().messages().iter().map(|m| m.id).collect::<Vec<_>>())
                    key=|id| *id
                    children=move |id| view! { <MessageBubble session=session id=id /> }
                />
            </div>

            <div class="p-4 border-t flex gap-2">
                <textarea
                    class="flex-1 p-3 border rounded-lg resize-none"
                    rows="2"
                    placeholder=placeholder
                    prop:value=input
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                    prop:disabled=move || disabled.get() || is_asking.get()
                ></textarea>
                {move || {
                    if is_asking.get() {
                        view! {
                            <button class="px-4 py-2 rounded-lg bg-salmon-500 text-white" on:click=stop>
                                "Stop"
                            </button>
                        }
                            .into_any()
                    } else {
                        view! {
                            <button
                                class="px-4 py-2 rounded-lg bg-seafoam-600 text-white disabled:bg-gray-400"
                                on:click=move |_| send()
                                prop:disabled=move || disabled.get() || input.get().trim().is_empty()
                            >
                                "Send"
                            </button>
                        }
                            .into_any()
                    }
                }}
                <button
                    class="px-3 py-2 rounded-lg bg-gray-500 text-white"
                    on:click=clear
                    prop:disabled=is_asking
                >
                    "Clear"
                </button>
            </div>
        </div>
    }
}

#[component]
fn MessageBubble(session: RwSignal<ChatSession>, id: MessageId) -> impl IntoView {
    let message = Memo::new(move |_| session.with(|s| s.transcript().get(id).cloned()));
    let streaming = Memo::new(move |_| session.with(|s| s.in_flight() == Some(id)));

    move || {
        let Some(message) = message.get() else {
            return view! { <div></div> }.into_any();
        };

        match message.role {
            Role::User => view! {
                <div class="ml-auto max-w-3xl rounded-lg p-3 bg-seafoam-600 text-white whitespace-pre-wrap">
                    {message.content}
                </div>
            }
                .into_any(),
            Role::Assistant if message.is_error => view! {
                <div class="max-w-3xl rounded-lg p-3 bg-red-100 text-red-800">{message.content}</div>
            }
                .into_any(),
            Role::Assistant => {
                let waiting = message.content.is_empty() && streaming.get();
                view! {
                    <div class="max-w-3xl rounded-lg p-3 bg-gray-100">
                        {message.sources.filter(|s| !s.is_empty()).map(|sources| view! { <SourcesList sources=sources /> })}
                        {if waiting {
                            view! { <span class="animate-pulse">"…"</span> }.into_any()
                        } else {
                            view! { <MarkdownRenderer content=message.content /> }.into_any()
                        }}
                    </div>
                }
                    .into_any()
            }
        }
    }
}

#[component]
fn SourcesList(sources: Vec<Source>) -> impl IntoView {
    view! {
        <details class="mb-2 text-sm">
            <summary class="cursor-pointer text-gray-600">{format!("Sources ({})", sources.len())}</summary>
            <ul class="mt-2 space-y-2">
                {sources
                    .into_iter()
                    .map(|source| {
                        view! {
                            <li class="bg-white rounded p-2 border">
                                <span class="text-xs bg-gray-200 px-2 py-0.5 rounded mr-2">
                                    {format!("{:.1}%", source.score * 100.0)}
                                </span>
                                {preview(&source.content)}
                            </li>
                        }
                    })
                    .collect_view()}
            </ul>
        </details>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_sources_are_shortened() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(SOURCE_PREVIEW_CHARS + 5);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), SOURCE_PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
    }
}
