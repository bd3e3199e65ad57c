use leptos::prelude::*;
use leptos_meta::{provide_meta_context, MetaTags, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    path,
};

use crate::auth::{provide_auth, use_auth, AccountPanel, AuthPage, LogoutButton};
use crate::components::chatbot_detail::ChatbotDetail;
use crate::components::chatbot_list::ChatbotList;
use crate::components::public_chat::{ChatWidget, PublicChatPage};

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    provide_auth();

    view! {
        <Title text="ragbot" />
        <Router>
            <main>
                <Routes fallback=|| view! { <p class="p-4">"Page not found."</p> }>
                    <Route path=path!("/") view=Dashboard />
                    <Route path=path!("/chat/:share_token") view=PublicChatPage />
                    <Route path=path!("/widget/:share_token") view=ChatWidget />
                </Routes>
            </main>
        </Router>
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Chatbots,
    Account,
}

/// Opening a chatbot from the list, and going back to the list.
fn selection_callbacks(set_selected: WriteSignal<Option<String>>) -> (Callback<String>, Callback<()>) {
    let open = Callback::new(move |id: String| set_selected.set(Some(id)));
    let back = Callback::from(move || set_selected.set(None));
    (open, back)
}

/// Owner area: login when signed out, chatbots and account otherwise.
#[component]
fn Dashboard() -> impl IntoView {
    let auth = use_auth();
    let (section, set_section) = signal(Section::Chatbots);
    let (selected, set_selected) = signal(None::<String>);
    let (on_select, on_back) = selection_callbacks(set_selected);

    let nav_class = move |s: Section| {
        if section.get() == s {
            "px-3 py-1 rounded bg-seafoam-600 text-white"
        } else {
            "px-3 py-1 rounded text-gray-700"
        }
    };

    move || {
        if !auth.ready.get() {
            return view! { <p class="p-4">"Loading..."</p> }.into_any();
        }
        if !auth.is_authenticated() {
            return view! { <AuthPage /> }.into_any();
        }

        let name = auth.user.get().map(|u| u.display_name()).unwrap_or_default();
        view! {
            <div class="min-h-screen bg-gray-100">
                <header class="flex justify-between items-center p-4 bg-white shadow">
                    <span class="text-2xl font-bold text-seafoam-600">"ragbot"</span>
                    <nav class="flex gap-2">
                        <button class=move || nav_class(Section::Chatbots) on:click=move |_| set_section.set(Section::Chatbots)>
                            "My chatbots"
                        </button>
                        <button class=move || nav_class(Section::Account) on:click=move |_| set_section.set(Section::Account)>
                            "My account"
                        </button>
                    </nav>
                    <div class="flex items-center gap-3">
                        <span class="text-gray-700">{name}</span>
                        <LogoutButton />
                    </div>
                </header>
                <div class="max-w-6xl mx-auto p-6">
                    {move || match (section.get(), selected.get()) {
                        (Section::Account, _) => view! { <AccountPanel /> }.into_any(),
                        (Section::Chatbots, Some(id)) => {
                            view! { <ChatbotDetail id=id on_back=on_back /> }.into_any()
                        }
                        (Section::Chatbots, None) => {
                            view! { <ChatbotList on_select=on_select /> }.into_any()
                        }
                    }}
                </div>
            </div>
        }
            .into_any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_and_leaving_a_chatbot() {
        let (selected, set_selected) = signal(None::<String>);
        let (on_select, on_back) = selection_callbacks(set_selected);

        on_select.run("65f0".to_string());
        assert_eq!(selected.get_untracked(), Some("65f0".to_string()));

        on_back.run(());
        assert_eq!(selected.get_untracked(), None);
    }
}
