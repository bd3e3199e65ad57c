use leptos::prelude::*;

use super::types::{Token, UserUpdate, UserView};

#[server(LoginFn, "/api")]
pub async fn login(email: String, password: String) -> Result<Token, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use super::types::LoginRequest;
        use crate::backend::{backend_from_context, to_server_error};
        use crate::endpoints;
        use http::Method;

        let backend = backend_from_context()?;
        let request = LoginRequest {
            email: email.trim().to_string(),
            password,
        };
        let token: Token = backend
            .send_json(Method::POST, &endpoints::login(), None, &request)
            .await
            .map_err(to_server_error)?;
        log::info!("user {} logged in", request.email);
        Ok(token)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(RegisterFn, "/api")]
pub async fn register(
    first_name: String,
    last_name: String,
    email: String,
    password: String,
) -> Result<UserView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use super::types::{to_server_error as auth_error, validate_registration, RegisterRequest};
        use crate::backend::{backend_from_context, to_server_error};
        use crate::endpoints;
        use http::Method;

        let request = RegisterRequest {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            password,
        };
        validate_registration(&request).map_err(auth_error)?;

        let backend = backend_from_context()?;
        let user: UserView = backend
            .send_json(Method::POST, &endpoints::register(), None, &request)
            .await
            .map_err(to_server_error)?;
        log::info!("registered user {}", user.id);
        Ok(user)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(CurrentUserFn, "/api")]
pub async fn current_user(token: String) -> Result<UserView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use super::types::{require_token, to_server_error as auth_error};
        use crate::backend::{backend_from_context, to_server_error};
        use crate::endpoints;

        let token = require_token(&token).map_err(auth_error)?;
        backend_from_context()?
            .get_json(&endpoints::me(), Some(token))
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(UpdateCurrentUserFn, "/api")]
pub async fn update_current_user(token: String, update: UserUpdate) -> Result<UserView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use super::types::{require_token, to_server_error as auth_error};
        use crate::backend::{backend_from_context, to_server_error};
        use crate::endpoints;
        use http::Method;

        let token = require_token(&token).map_err(auth_error)?;
        backend_from_context()?
            .send_json(Method::PUT, &endpoints::me(), Some(token), &update)
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}
