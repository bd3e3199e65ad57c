mod client;

pub use client::{error_detail, BackendClient, BackendError};

use leptos::prelude::*;

use crate::state::AppState;

/// The shared client, as provided to server functions by the server fn handler.
pub fn backend_from_context() -> Result<BackendClient, ServerFnError> {
    use_context::<AppState>()
        .map(|state| state.backend)
        .ok_or_else(|| ServerFnError::ServerError("application state is not available".to_string()))
}

pub fn to_server_error(e: BackendError) -> ServerFnError {
    ServerFnError::ServerError(e.to_string())
}
