use leptos::prelude::*;
use leptos::task::spawn_local;

use super::api::{current_user, login, register, update_current_user};
use super::context::{use_auth, AuthContext};
use super::types::{error_message, UserUpdate};
use crate::types::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    Login,
    Register,
}

async fn sign_in(auth: AuthContext, email: String, password: String) -> Result<(), ServerFnError> {
    let token = login(email, password).await?;
    let user = current_user(token.access_token.clone()).await?;
    auth.sign_in(token.access_token, user);
    Ok(())
}

/// Login and registration, toggled in place.
#[component]
pub fn AuthPage() -> impl IntoView {
    let auth = use_auth();
    let (mode, set_mode) = signal(AuthMode::Login);
    let (first_name, set_first_name) = signal(String::new());
    let (last_name, set_last_name) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (error, set_error) = signal(None::<String>);
    let (loading, set_loading) = signal(false);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }
        set_loading.set(true);
        set_error.set(None);

        let mode = mode.get_untracked();
        let email = email.get_untracked();
        let password = password.get_untracked();
        let first_name = first_name.get_untracked();
        let last_name = last_name.get_untracked();

        spawn_local(async move {
            let result = match mode {
                AuthMode::Login => sign_in(auth, email, password).await,
                AuthMode::Register => match register(first_name, last_name, email.clone(), password.clone()).await {
                    Ok(_) => sign_in(auth, email, password).await,
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = result {
                log::warn!("authentication failed: {}", e);
                set_error.set(Some(error_message(&e)));
            }
            set_loading.set(false);
        });
    };

    let toggle = move |_| {
        set_error.set(None);
        set_mode.update(|m| {
            *m = match m {
                AuthMode::Login => AuthMode::Register,
                AuthMode::Register => AuthMode::Login,
            }
        });
    };

    view! {
        <div class="min-h-screen flex items-center justify-center bg-gray-100">
            <div class="max-w-md w-full bg-white rounded-lg shadow-md p-6">
                <h2 class="text-2xl font-bold text-center mb-6">
                    {move || if mode.get() == AuthMode::Login { "Log in" } else { "Create an account" }}
                </h2>
                <form class="space-y-4" on:submit=on_submit>
                    <Show when=move || mode.get() == AuthMode::Register>
                        <input
                            class="w-full p-2 border rounded"
                            type="text"
                            placeholder="First name"
                            required
                            prop:value=first_name
                            on:input=move |ev| set_first_name.set(event_target_value(&ev))
                        />
                        <input
                            class="w-full p-2 border rounded"
                            type="text"
                            placeholder="Last name"
                            required
                            prop:value=last_name
                            on:input=move |ev| set_last_name.set(event_target_value(&ev))
                        />
                    </Show>
                    <input
                        class="w-full p-2 border rounded"
                        type="email"
                        placeholder="Email"
                        required
                        prop:value=email
                        on:input=move |ev| set_email.set(event_target_value(&ev))
                    />
                    <input
                        class="w-full p-2 border rounded"
                        type="password"
                        placeholder="Password"
                        required
                        prop:value=password
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                    />
                    {move || error.get().map(|e| view! { <p class="text-sm text-red-600">{e}</p> })}
                    <button
                        type="submit"
                        class="w-full py-2 rounded bg-seafoam-600 text-white disabled:bg-gray-400"
                        prop:disabled=loading
                    >
                        {move || match (loading.get(), mode.get()) {
                            (true, _) => "Please wait...",
                            (false, AuthMode::Login) => "Log in",
                            (false, AuthMode::Register) => "Sign up",
                        }}
                    </button>
                </form>
                <button class="mt-4 w-full text-sm text-seafoam-600 hover:underline" on:click=toggle>
                    {move || {
                        if mode.get() == AuthMode::Login {
                            "No account yet? Sign up"
                        } else {
                            "Already registered? Log in"
                        }
                    }}
                </button>
            </div>
        </div>
    }
}

#[component]
pub fn LogoutButton() -> impl IntoView {
    let auth = use_auth();
    view! {
        <button
            class="px-3 py-1 text-sm bg-salmon-600 text-white rounded-md"
            on:click=move |_| auth.sign_out()
        >
            "Log out"
        </button>
    }
}

/// View and edit the logged-in user's profile.
#[component]
pub fn AccountPanel() -> impl IntoView {
    let auth = use_auth();
    let (editing, set_editing) = signal(false);
    let (first_name, set_first_name) = signal(String::new());
    let (last_name, set_last_name) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (message, set_message) = signal(None::<(bool, String)>);

    let start_edit = move |_| {
        if let Some(user) = auth.user.get_untracked() {
            set_first_name.set(user.first_name);
            set_last_name.set(user.last_name);
            set_email.set(user.email);
            set_message.set(None);
            set_editing.set(true);
        }
    };

    let save = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let (Some(user), Some(token)) = (auth.user.get_untracked(), auth.token_untracked()) else {
            return;
        };
        let update = UserUpdate::changes_from(
            &user,
            &first_name.get_untracked(),
            &last_name.get_untracked(),
            &email.get_untracked(),
        );
        if update.is_empty() {
            set_editing.set(false);
            return;
        }
        spawn_local(async move {
            match update_current_user(token, update).await {
                Ok(updated) => {
                    auth.user.set(Some(updated));
                    set_editing.set(false);
                    set_message.set(Some((true, "Profile updated".to_string())));
                }
                Err(e) => set_message.set(Some((false, error_message(&e)))),
            }
        });
    };

    view! {
        <div class="bg-white rounded-lg shadow-md p-6 max-w-lg">
            <h2 class="text-xl font-semibold mb-4">"My account"</h2>
            {move || {
                message
                    .get()
                    .map(|(ok, text)| {
                        let class = if ok { "text-green-700" } else { "text-red-600" };
                        view! { <p class=format!("mb-3 text-sm {}", class)>{text}</p> }
                    })
            }}
            {move || {
                let Some(user) = auth.user.get() else {
                    return view! { <p>"Not logged in."</p> }.into_any();
                };
                if editing.get() {
                    view! {
                        <form class="space-y-3" on:submit=save>
                            <input
                                class="w-full p-2 border rounded"
                                prop:value=first_name
                                on:input=move |ev| set_first_name.set(event_target_value(&ev))
                            />
                            <input
                                class="w-full p-2 border rounded"
                                prop:value=last_name
                                on:input=move |ev| set_last_name.set(event_target_value(&ev))
                            />
                            <input
                                class="w-full p-2 border rounded"
                                type="email"
                                prop:value=email
                                on:input=move |ev| set_email.set(event_target_value(&ev))
                            />
                            <div class="flex gap-2">
                                <button type="submit" class="px-4 py-2 rounded bg-seafoam-600 text-white">
                                    "Save"
                                </button>
                                <button
                                    type="button"
                                    class="px-4 py-2 rounded bg-gray-300"
                                    on:click=move |_| set_editing.set(false)
                                >
                                    "Cancel"
                                </button>
                            </div>
                        </form>
                    }
                        .into_any()
                } else {
                    view! {
                        <dl class="space-y-2">
                            <div><dt class="text-sm text-gray-500">"Name"</dt><dd>{user.display_name()}</dd></div>
                            <div><dt class="text-sm text-gray-500">"Email"</dt><dd>{user.email.clone()}</dd></div>
                            {user.created_at.as_deref().map(|created| view! {
                                <div>
                                    <dt class="text-sm text-gray-500">"Member since"</dt>
                                    <dd>{format_timestamp(created)}</dd>
                                </div>
                            })}
                        </dl>
                        <button class="mt-4 px-4 py-2 rounded bg-seafoam-600 text-white" on:click=start_edit>
                            "Edit"
                        </button>
                    }
                        .into_any()
                }
            }}
        </div>
    }
}
