use leptos::html::Input;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::{error_message, use_auth};
use crate::components::chat_panel::ChatPanel;
use crate::components::chatbot_list::ShareLinks;
use crate::endpoints::ChatTarget;
use crate::server_fn::{get_chatbot, list_conversations, update_chatbot};
use crate::types::{format_timestamp, ChatbotDraft, ChatbotView, ConversationRecord, Role};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

pub fn is_supported_document(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Chat,
    Documents,
    Settings,
    History,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Chat, Tab::Documents, Tab::Settings, Tab::History];

    fn label(self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Documents => "Documents",
            Tab::Settings => "Settings",
            Tab::History => "History",
        }
    }
}

#[component]
pub fn ChatbotDetail(id: String, #[prop(into)] on_back: Callback<()>) -> impl IntoView {
    let auth = use_auth();
    let (tab, set_tab) = signal(Tab::Chat);
    let (version, set_version) = signal(0u32);
    let chatbot_id = StoredValue::new(id);

    let chatbot = Resource::new(
        move || (auth.token.get(), chatbot_id.get_value(), version.get()),
        |(token, id, _)| async move {
            match token {
                Some(token) => get_chatbot(token, id).await,
                None => Err(ServerFnError::ServerError("You need to log in first".to_string())),
            }
        },
    );
    let reload = Callback::new(move |_: ()| set_version.update(|v| *v += 1));

    view! {
        <div class="space-y-4">
            <button class="text-seafoam-600 hover:underline" on:click=move |_| on_back.run(())>
                "← Back to my chatbots"
            </button>
            <Transition fallback=|| view! { <p>"Loading chatbot..."</p> }>
                {move || {
                    chatbot
                        .get()
                        .map(|result| match result {
                            Ok(chatbot) => view! { <ChatbotTabs chatbot=chatbot tab=tab set_tab=set_tab reload=reload /> }.into_any(),
                            Err(e) => view! { <p class="text-red-600">{error_message(&e)}</p> }.into_any(),
                        })
                }}
            </Transition>
        </div>
    }
}

#[component]
fn ChatbotTabs(
    chatbot: ChatbotView,
    tab: ReadSignal<Tab>,
    set_tab: WriteSignal<Tab>,
    reload: Callback<()>,
) -> impl IntoView {
    let has_documents = !chatbot.documents.is_empty();
    let chat_target = ChatTarget::Owned {
        chatbot_id: chatbot.id.clone(),
    };
    let stored = StoredValue::new(chatbot.clone());

    view! {
        <div class="bg-white rounded-lg shadow p-4">
            <h2 class="text-2xl font-bold">{chatbot.name.clone()}</h2>
            {chatbot.description.clone().map(|d| view! { <p class="text-gray-600">{d}</p> })}
            <p class="text-sm text-gray-500 mt-1">
                {format!("{} tokens used · estimated cost ${:.4}", chatbot.total_tokens, chatbot.estimated_cost)}
            </p>
            <div class="mt-2">
                <ShareLinks chatbot=chatbot.clone() />
            </div>
        </div>

        <nav class="flex gap-2 border-b">
            {Tab::ALL
                .into_iter()
                .map(|t| {
                    view! {
                        <button
                            class=move || {
                                if tab.get() == t {
                                    "px-4 py-2 border-b-2 border-seafoam-600 font-semibold"
                                } else {
                                    "px-4 py-2 text-gray-500"
                                }
                            }
                            on:click=move |_| set_tab.set(t)
                        >
                            {t.label()}
                        </button>
                    }
                })
                .collect_view()}
        </nav>

        // the chat stays mounted across tab switches so an answer keeps streaming
        <div class:hidden=move || tab.get() != Tab::Chat>
            {(!has_documents)
                .then(|| {
                    view! {
                        <p class="text-amber-700 mb-2">
                            "Upload a document first: the chatbot answers from your documents only."
                        </p>
                    }
                })}
            <ChatPanel target=chat_target disabled=!has_documents />
        </div>

        {move || match tab.get() {
            Tab::Chat => ().into_any(),
            Tab::Documents => view! { <DocumentsTab chatbot=stored.get_value() reload=reload /> }.into_any(),
            Tab::Settings => view! { <SettingsTab chatbot=stored.get_value() reload=reload /> }.into_any(),
            Tab::History => view! { <HistoryTab chatbot_id=stored.with_value(|c| c.id.clone()) /> }.into_any(),
        }}
    }
}

type Feedback = WriteSignal<Option<(bool, String)>>;

#[cfg(feature = "hydrate")]
fn start_upload(
    file_input: NodeRef<Input>,
    url: String,
    token: Option<String>,
    set_uploading: WriteSignal<bool>,
    set_message: Feedback,
    reload: Callback<()>,
) {
    use crate::config::{CHUNK_OVERLAP, CHUNK_SIZE};
    use crate::stream::fetch::post_form;

    let Some(file) = file_input
        .get_untracked()
        .and_then(|input| input.files())
        .and_then(|files| files.get(0))
    else {
        set_message.set(Some((false, "Choose a file first".to_string())));
        return;
    };
    if !is_supported_document(&file.name()) {
        set_message.set(Some((false, "Only .pdf, .txt and .md files are supported".to_string())));
        return;
    }

    let form = match web_sys::FormData::new() {
        Ok(form) => form,
        Err(e) => {
            log::error!("could not build upload form: {:?}", e);
            return;
        }
    };
    let filled = form
        .append_with_blob("file", &file)
        .and_then(|_| form.append_with_str("chunk_size", &CHUNK_SIZE.to_string()))
        .and_then(|_| form.append_with_str("chunk_overlap", &CHUNK_OVERLAP.to_string()));
    if let Err(e) = filled {
        log::error!("could not build upload form: {:?}", e);
        return;
    }

    set_uploading.set(true);
    set_message.set(None);
    spawn_local(async move {
        match post_form(&url, &form, token.as_deref()).await {
            Ok(_) => {
                if let Some(input) = file_input.get_untracked() {
                    input.set_value("");
                }
                set_message.set(Some((true, "Document indexed".to_string())));
                reload.run(());
            }
            Err(e) => {
                log::error!("document upload to {} failed: {}", url, e);
                set_message.set(Some((false, format!("Upload failed: {}", e))));
            }
        }
        set_uploading.set(false);
    });
}

#[cfg(not(feature = "hydrate"))]
fn start_upload(
    _file_input: NodeRef<Input>,
    _url: String,
    _token: Option<String>,
    _set_uploading: WriteSignal<bool>,
    _set_message: Feedback,
    _reload: Callback<()>,
) {
}

#[component]
fn DocumentsTab(chatbot: ChatbotView, reload: Callback<()>) -> impl IntoView {
    let auth = use_auth();
    let file_input = NodeRef::<Input>::new();
    let (uploading, set_uploading) = signal(false);
    let (message, set_message) = signal(None::<(bool, String)>);
    let upload_url = crate::endpoints::relayed(&crate::endpoints::chatbot_documents(&chatbot.id));

    let on_upload = move |_| {
        start_upload(
            file_input,
            upload_url.clone(),
            auth.token_untracked(),
            set_uploading,
            set_message,
            reload,
        );
    };

    view! {
        <div class="bg-white rounded-lg shadow p-4 space-y-4">
            <div class="flex gap-2 items-center">
                <input node_ref=file_input type="file" accept=".pdf,.txt,.md" />
                <button
                    class="px-4 py-2 rounded bg-seafoam-600 text-white disabled:bg-gray-400"
                    on:click=on_upload
                    prop:disabled=uploading
                >
                    {move || if uploading.get() { "Indexing..." } else { "Upload" }}
                </button>
            </div>
            {move || {
                message
                    .get()
                    .map(|(ok, text)| {
                        let class = if ok { "text-green-700" } else { "text-red-600" };
                        view! { <p class=class>{text}</p> }
                    })
            }}
            {if chatbot.documents.is_empty() {
                view! { <p class="text-gray-500">"No document indexed yet."</p> }.into_any()
            } else {
                view! {
                    <table class="w-full text-sm">
                        <thead>
                            <tr class="text-left text-gray-500">
                                <th>"File"</th>
                                <th>"Uploaded"</th>
                                <th>"Chunks"</th>
                            </tr>
                        </thead>
                        <tbody>
                            {chatbot
                                .documents
                                .into_iter()
                                .map(|doc| {
                                    view! {
                                        <tr>
                                            <td>{doc.filename}</td>
                                            <td>{format_timestamp(&doc.upload_date)}</td>
                                            <td>{doc.chunks_count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())}</td>
                                        </tr>
                                    }
                                })
                                .collect_view()}
                        </tbody>
                    </table>
                }
                    .into_any()
            }}
        </div>
    }
}

#[component]
fn SettingsTab(chatbot: ChatbotView, reload: Callback<()>) -> impl IntoView {
    let auth = use_auth();
    let draft = ChatbotDraft::from_chatbot(&chatbot);
    let (name, set_name) = signal(draft.name);
    let (description, set_description) = signal(draft.description.unwrap_or_default());
    let (system_prompt, set_system_prompt) = signal(draft.system_prompt.unwrap_or_default());
    let (message, set_message) = signal(None::<(bool, String)>);
    let id = StoredValue::new(chatbot.id);

    let on_save = move |ev: leptos::ev::SubmitEvent| {
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
            match update_chatbot(token, id.get_value(), draft).await {
                Ok(_) => {
                    set_message.set(Some((true, "Settings saved".to_string())));
                    reload.run(());
                }
                Err(e) => set_message.set(Some((false, error_message(&e)))),
            }
        });
    };

    view! {
        <form class="bg-white rounded-lg shadow p-4 space-y-3" on:submit=on_save>
            <label class="block">
                <span class="text-sm text-gray-600">"Name"</span>
                <input
                    class="w-full p-2 border rounded"
                    required
                    maxlength="100"
                    prop:value=name
                    on:input=move |ev| set_name.set(event_target_value(&ev))
                />
            </label>
            <label class="block">
                <span class="text-sm text-gray-600">"Description"</span>
                <textarea
                    class="w-full p-2 border rounded"
                    maxlength="500"
                    prop:value=description
                    on:input=move |ev| set_description.set(event_target_value(&ev))
                ></textarea>
            </label>
            <label class="block">
                <span class="text-sm text-gray-600">"System prompt"</span>
                <textarea
                    class="w-full p-2 border rounded"
                    rows="5"
                    maxlength="2000"
                    prop:value=system_prompt
                    on:input=move |ev| set_system_prompt.set(event_target_value(&ev))
                ></textarea>
            </label>
            {move || {
                message
                    .get()
                    .map(|(ok, text)| {
                        let class = if ok { "text-green-700" } else { "text-red-600" };
                        view! { <p class=class>{text}</p> }
                    })
            }}
            <button type="submit" class="px-4 py-2 rounded bg-seafoam-600 text-white">
                "Save"
            </button>
        </form>
    }
}

#[component]
fn HistoryTab(chatbot_id: String) -> impl IntoView {
    let auth = use_auth();
    let conversations = Resource::new(
        move || auth.token.get(),
        move |token| {
            let id = chatbot_id.clone();
            async move {
                match token {
                    Some(token) => list_conversations(token, id).await,
                    None => Ok(Vec::new()),
                }
            }
        },
    );

    view! {
        <Suspense fallback=|| view! { <p>"Loading history..."</p> }>
            {move || {
                conversations
                    .get()
                    .map(|result| match result {
                        Ok(list) if list.is_empty() => {
                            view! { <p class="text-gray-500">"No conversation yet."</p> }.into_any()
                        }
                        Ok(list) => {
                            list.into_iter()
                                .map(|conversation| view! { <ConversationCard conversation=conversation /> })
                                .collect_view()
                                .into_any()
                        }
                        Err(e) => view! { <p class="text-red-600">{error_message(&e)}</p> }.into_any(),
                    })
            }}
        </Suspense>
    }
}

#[component]
fn ConversationCard(conversation: ConversationRecord) -> impl IntoView {
    view! {
        <div class="bg-white rounded-lg shadow p-4 mb-3">
            <p class="text-xs text-gray-500 mb-2">{format_timestamp(&conversation.created_at)}</p>
            {conversation
                .messages
                .into_iter()
                .map(|turn| {
                    let who = match turn.role {
                        Role::User => "You",
                        Role::Assistant => "Bot",
                    };
                    view! {
                        <p class="text-sm">
                            <span class="font-semibold mr-1">{who}":"</span>
                            {turn.content}
                        </p>
                    }
                })
                .collect_view()}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_indexable_documents_are_accepted() {
        assert!(is_supported_document("notes.md"));
        assert!(is_supported_document("Report.PDF"));
        assert!(is_supported_document("a.b.txt"));
        assert!(!is_supported_document("image.png"));
        assert!(!is_supported_document("README"));
    }
}
