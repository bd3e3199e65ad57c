//! Small browser helpers with inert fallbacks when rendered on the server.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "hydrate")] {
        pub fn confirm(message: &str) -> bool {
            web_sys::window()
                .and_then(|w| w.confirm_with_message(message).ok())
                .unwrap_or(false)
        }

        pub fn copy_to_clipboard(text: String) {
            leptos::task::spawn_local(async move {
                let Some(window) = web_sys::window() else {
                    return;
                };
                let promise = window.navigator().clipboard().write_text(&text);
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::warn!("copy to clipboard failed: {:?}", e);
                }
            });
        }
    } else {
        pub fn confirm(_message: &str) -> bool {
            false
        }

        pub fn copy_to_clipboard(_text: String) {}
    }
}
