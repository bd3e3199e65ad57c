use leptos::prelude::*;
use leptos_router::hooks::use_params_map;

use crate::auth::error_message;
use crate::components::chat_panel::ChatPanel;
use crate::endpoints::ChatTarget;
use crate::server_fn::get_public_chatbot;
use crate::types::ChatbotView;

fn use_share_token() -> Memo<String> {
    let params = use_params_map();
    Memo::new(move |_| params.with(|p| p.get("share_token").unwrap_or_default()))
}

fn use_public_chatbot(share_token: Memo<String>) -> Resource<Result<ChatbotView, ServerFnError>> {
    Resource::new(move || share_token.get(), get_public_chatbot)
}

/// Full-page chat reached through a chatbot's share link.
#[component]
pub fn PublicChatPage() -> impl IntoView {
    let share_token = use_share_token();
    let chatbot = use_public_chatbot(share_token);

    view! {
        <div class="min-h-screen bg-gray-100 p-4">
            <div class="max-w-4xl mx-auto bg-white rounded-lg shadow">
                <Suspense fallback=|| view! { <p class="p-4">"Loading..."</p> }>
                    {move || {
                        chatbot
                            .get()
                            .map(|result| match result {
                                Ok(chatbot) => {
                                    let target = ChatTarget::Public {
                                        share_token: share_token.get_untracked(),
                                    };
                                    view! {
                                        <div class="p-4 border-b">
                                            <h1 class="text-2xl font-bold">{chatbot.name}</h1>
                                            {chatbot.description.map(|d| view! { <p class="text-gray-600">{d}</p> })}
                                        </div>
                                        <ChatPanel target=target placeholder="Ask your question..." />
                                    }
                                        .into_any()
                                }
                                Err(e) => view! { <UnavailableChatbot error=error_message(&e) /> }.into_any(),
                            })
                    }}
                </Suspense>
            </div>
        </div>
    }
}

/// Floating chat window meant to be embedded in an iframe.
#[component]
pub fn ChatWidget() -> impl IntoView {
    let share_token = use_share_token();
    let chatbot = use_public_chatbot(share_token);
    let (open, set_open) = signal(true);

    view! {
        <div class="fixed bottom-4 right-4 flex flex-col items-end gap-2">
            <div class="w-96 bg-white rounded-lg shadow-xl" class:hidden=move || !open.get()>
                <Suspense fallback=|| view! { <p class="p-4">"Loading..."</p> }>
                    {move || {
                        chatbot
                            .get()
                            .map(|result| match result {
                                Ok(chatbot) => {
                                    let target = ChatTarget::Public {
                                        share_token: share_token.get_untracked(),
                                    };
                                    view! {
                                        <div class="flex justify-between items-center p-3 border-b bg-seafoam-600 text-white rounded-t-lg">
                                            <span class="font-semibold">{chatbot.name}</span>
                                            <button on:click=move |_| set_open.set(false) aria-label="Close chat">
                                                "×"
                                            </button>
                                        </div>
                                        <ChatPanel target=target placeholder="Type a message..." />
                                    }
                                        .into_any()
                                }
                                Err(e) => view! { <UnavailableChatbot error=error_message(&e) /> }.into_any(),
                            })
                    }}
                </Suspense>
            </div>
            <button
                class="w-14 h-14 rounded-full bg-seafoam-600 text-white shadow-lg text-2xl"
                on:click=move |_| set_open.update(|o| *o = !*o)
                aria-label="Toggle chat"
            >
                {move || if open.get() { "×" } else { "💬" }}
            </button>
        </div>
    }
}

#[component]
fn UnavailableChatbot(error: String) -> impl IntoView {
    view! {
        <div class="p-6 text-center">
            <h2 class="text-xl font-semibold mb-2">"Chatbot unavailable"</h2>
            <p class="text-gray-600">{error}</p>
        </div>
    }
}
