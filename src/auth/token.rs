use cfg_if::cfg_if;

/// Logs a failed storage write. Returns whether it went through.
#[cfg_attr(not(feature = "hydrate"), allow(dead_code))]
fn checked<E: std::fmt::Debug>(action: &str, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("could not {} auth token: {:?}", action, e);
            false
        }
    }
}

cfg_if! {
    if #[cfg(feature = "hydrate")] {
        use super::types::TOKEN_STORAGE_KEY;

        fn storage() -> Option<web_sys::Storage> {
            web_sys::window().and_then(|w| w.local_storage().ok().flatten())
        }

        /// The token saved by a previous login, if the browser kept it.
        pub fn load_token() -> Option<String> {
            storage()
                .and_then(|storage| storage.get_item(TOKEN_STORAGE_KEY).ok().flatten())
                .filter(|token| !token.trim().is_empty())
        }

        pub fn store_token(token: &str) {
            if let Some(storage) = storage() {
                checked("persist", storage.set_item(TOKEN_STORAGE_KEY, token));
            }
        }

        pub fn clear_token() {
            if let Some(storage) = storage() {
                checked("remove", storage.remove_item(TOKEN_STORAGE_KEY));
            }
        }
    } else {
        pub fn load_token() -> Option<String> {
            None
        }

        pub fn store_token(_token: &str) {}

        pub fn clear_token() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_reported() {
        assert!(checked::<String>("persist", Ok(())));
        assert!(!checked("remove", Err("quota exceeded".to_string())));
    }
}
