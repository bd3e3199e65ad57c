use leptos::prelude::*;
use leptos::task::spawn_local;

use super::api::current_user;
use super::token::{clear_token, load_token, store_token};
use super::types::UserView;

/// Who is logged in, shared by every page below `App`.
#[derive(Clone, Copy)]
pub struct AuthContext {
    pub token: RwSignal<Option<String>>,
    pub user: RwSignal<Option<UserView>>,
    /// False until the stored token has been checked in the browser.
    pub ready: RwSignal<bool>,
}

impl AuthContext {
    fn new() -> Self {
        Self {
            token: RwSignal::new(None),
            user: RwSignal::new(None),
            ready: RwSignal::new(false),
        }
    }

    pub fn sign_in(&self, token: String, user: UserView) {
        store_token(&token);
        self.token.set(Some(token));
        self.user.set(Some(user));
        self.ready.set(true);
    }

    pub fn sign_out(&self) {
        clear_token();
        self.token.set(None);
        self.user.set(None);
    }

    pub fn token_untracked(&self) -> Option<String> {
        self.token.get_untracked()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.get().is_some() && self.user.get().is_some()
    }
}

/// Creates the context and restores a saved session once hydrated.
pub fn provide_auth() -> AuthContext {
    let auth = AuthContext::new();
    provide_context(auth);

    Effect::new(move |_| {
        let Some(token) = load_token() else {
            auth.ready.set(true);
            return;
        };
        spawn_local(async move {
            match current_user(token.clone()).await {
                Ok(user) => {
                    auth.token.set(Some(token));
                    auth.user.set(Some(user));
                }
                Err(e) => {
                    log::warn!("stored token rejected: {}", e);
                    auth.sign_out();
                }
            }
            auth.ready.set(true);
        });
    });

    auth
}

pub fn use_auth() -> AuthContext {
    expect_context::<AuthContext>()
}
