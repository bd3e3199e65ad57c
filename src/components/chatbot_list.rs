use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::{error_message, use_auth};
use crate::components::browser::{confirm, copy_to_clipboard};
use crate::server_fn::{create_chatbot, delete_chatbot, list_chatbots};
use crate::types::{ChatbotDraft, ChatbotView};

/// The owner's chatbots, with creation and deletion.
#[component]
pub fn ChatbotList(#[prop(into)] on_select: Callback<String>) -> impl IntoView {
    let auth = use_auth();
    let (version, set_version) = signal(0u32);
    let (creating, set_creating) = signal(false);
    let (name, set_name) = signal(String::new());
    let (description, set_description) = signal(String::new());
    let (system_prompt, set_system_prompt) = signal(String::new());
    let (error, set_error) = signal(None::<String>);

    let chatbots = Resource::new(
        move || (auth.token.get(), version.get()),
        |(token, _)| async move {
            match token {
                Some(token) => list_chatbots(token).await,
                None => Ok(Vec::new()),
            }
        },
    );

    let reload = move || set_version.update(|v| *v += 1);

    let on_create = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let Some(token) = auth.token_untracked() else {
            return;
        };
        let draft = ChatbotDraft {
            name: name.get_untracked(),
            description: Some(description.get_untracked()),
            system_prompt: Some(system_prompt.get_untracked()),
        };
        spawn_local(async move {
            match create_chatbot(token, draft).await {
                Ok(_) => {
                    set_name.set(String::new());
                    set_description.set(String::new());
                    set_system_prompt.set(String::new());
                    set_creating.set(false);
                    set_error.set(None);
                    reload();
                }
                Err(e) => set_error.set(Some(error_message(&e))),
            }
        });
    };

    let on_delete = Callback::new(move |chatbot: ChatbotView| {
        if !confirm(&format!("Delete \"{}\" and all of its documents?", chatbot.name)) {
            return;
        }
        let Some(token) = auth.token_untracked() else {
            return;
        };
        spawn_local(async move {
            match delete_chatbot(token, chatbot.id).await {
                Ok(()) => reload(),
                Err(e) => set_error.set(Some(error_message(&e))),
            }
        });
    });

    view! {
        <div class="space-y-6">
            <div class="flex justify-between items-center">
                <h2 class="text-2xl font-bold">"My chatbots"</h2>
                <button
                    class="px-4 py-2 rounded bg-seafoam-600 text-white"
                    on:click=move |_| set_creating.update(|c| *c = !*c)
                >
                    {move || if creating.get() { "Close" } else { "New chatbot" }}
                </button>
            </div>

            {move || error.get().map(|e| view! { <p class="text-red-600">{e}</p> })}

            <Show when=move || creating.get()>
                <form class="bg-white rounded-lg shadow p-4 space-y-3" on:submit=on_create>
                    <input
                        class="w-full p-2 border rounded"
                        placeholder="Name"
                        required
                        maxlength="100"
                        prop:value=name
                        on:input=move |ev| set_name.set(event_target_value(&ev))
                    />
                    <textarea
                        class="w-full p-2 border rounded"
                        placeholder="Description"
                        maxlength="500"
                        prop:value=description
                        on:input=move |ev| set_description.set(event_target_value(&ev))
                    ></textarea>
                    <textarea
                        class="w-full p-2 border rounded"
                        placeholder="System prompt (optional)"
                        maxlength="2000"
                        prop:value=system_prompt
                        on:input=move |ev| set_system_prompt.set(event_target_value(&ev))
                    ></textarea>
                    <button type="submit" class="px-4 py-2 rounded bg-seafoam-600 text-white">
                        "Create"
                    </button>
                </form>
            </Show>

            <Transition fallback=|| view! { <p>"Loading chatbots..."</p> }>
                {move || {
                    chatbots
                        .get()
                        .map(|result| match result {
                            Ok(list) if list.is_empty() => {
                                view! { <p class="text-gray-500">"No chatbot yet. Create one to get started."</p> }
                                    .into_any()
                            }
                            Ok(list) => {
                                view! {
                                    <div class="grid gap-4 md:grid-cols-2">
                                        {list
                                            .into_iter()
                                            .map(|chatbot| {
                                                view! { <ChatbotCard chatbot=chatbot on_select=on_select on_delete=on_delete /> }
                                            })
                                            .collect_view()}
                                    </div>
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! { <p class="text-red-600">{error_message(&e)}</p> }.into_any()
                            }
                        })
                }}
            </Transition>
        </div>
    }
}

#[component]
fn ChatbotCard(chatbot: ChatbotView, on_select: Callback<String>, on_delete: Callback<ChatbotView>) -> impl IntoView {
    let id = chatbot.id.clone();
    let for_delete = chatbot.clone();

    view! {
        <div class="bg-white rounded-lg shadow p-4 space-y-2">
            <h3 class="text-lg font-semibold">{chatbot.name.clone()}</h3>
            {chatbot.description.clone().map(|d| view! { <p class="text-gray-600">{d}</p> })}
            <p class="text-sm text-gray-500">
                {format!(
                    "{} document(s) · {} tokens · ${:.4}",
                    chatbot.documents.len(),
                    chatbot.total_tokens,
                    chatbot.estimated_cost,
                )}
            </p>
            <ShareLinks chatbot=chatbot />
            <div class="flex gap-2 pt-2">
                <button
                    class="px-3 py-1 rounded bg-seafoam-600 text-white"
                    on:click=move |_| on_select.run(id.clone())
                >
                    "Open"
                </button>
                <button
                    class="px-3 py-1 rounded bg-salmon-600 text-white"
                    on:click=move |_| on_delete.run(for_delete.clone())
                >
                    "Delete"
                </button>
            </div>
        </div>
    }
}

/// Public link, widget link and embed snippet, each copyable.
#[component]
pub fn ShareLinks(chatbot: ChatbotView) -> impl IntoView {
    let rows = [
        ("Share link", chatbot.share_link),
        ("Widget link", chatbot.widget_link),
        ("Embed code", chatbot.embed_code),
    ];

    rows.into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .map(|(label, value)| {
            let copied = value.clone();
            view! {
                <div class="text-xs">
                    <span class="font-medium mr-1">{label}":"</span>
                    <code class="break-all bg-gray-100 px-1 rounded">{value}</code>
                    <button
                        class="ml-2 text-seafoam-600 hover:underline"
                        on:click=move |_| copy_to_clipboard(copied.clone())
                    >
                        "Copy"
                    </button>
                </div>
            }
        })
        .collect_view()
}
