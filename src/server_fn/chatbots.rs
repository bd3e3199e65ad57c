use leptos::prelude::*;

use crate::types::{ChatbotDraft, ChatbotView, ConversationRecord, QueryRequest, QueryResponse};

#[cfg(feature = "ssr")]
mod server {
    use leptos::prelude::ServerFnError;

    use crate::auth::{require_token, to_server_error as auth_error};
    use crate::backend::{backend_from_context, BackendClient};

    pub fn authorized(token: &str) -> Result<(BackendClient, String), ServerFnError> {
        let token = require_token(token).map_err(auth_error)?.to_string();
        Ok((backend_from_context()?, token))
    }

    pub fn invalid(message: &str) -> ServerFnError {
        ServerFnError::ServerError(message.to_string())
    }
}

#[server(ListChatbots, "/api")]
pub async fn list_chatbots(token: String) -> Result<Vec<ChatbotView>, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::endpoints;

        let (backend, token) = server::authorized(&token)?;
        backend
            .get_json(&endpoints::chatbots(), Some(&token))
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(CreateChatbot, "/api")]
pub async fn create_chatbot(token: String, draft: ChatbotDraft) -> Result<ChatbotView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::endpoints;
        use http::Method;

        let draft = draft.normalized();
        if draft.name.is_empty() {
            return Err(server::invalid("Chatbot name is required"));
        }
        let (backend, token) = server::authorized(&token)?;
        let chatbot: ChatbotView = backend
            .send_json(Method::POST, &endpoints::chatbots(), Some(&token), &draft)
            .await
            .map_err(to_server_error)?;
        log::info!("created chatbot {} ({})", chatbot.id, chatbot.name);
        Ok(chatbot)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(GetChatbot, "/api")]
pub async fn get_chatbot(token: String, id: String) -> Result<ChatbotView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::endpoints;

        let (backend, token) = server::authorized(&token)?;
        backend
            .get_json(&endpoints::chatbot(&id), Some(&token))
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(UpdateChatbot, "/api")]
pub async fn update_chatbot(token: String, id: String, draft: ChatbotDraft) -> Result<ChatbotView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::endpoints;
        use http::Method;

        let draft = draft.normalized();
        if draft.name.is_empty() {
            return Err(server::invalid("Chatbot name is required"));
        }
        let (backend, token) = server::authorized(&token)?;
        backend
            .send_json(Method::PUT, &endpoints::chatbot(&id), Some(&token), &draft)
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(DeleteChatbot, "/api")]
pub async fn delete_chatbot(token: String, id: String) -> Result<(), ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::endpoints;

        let (backend, token) = server::authorized(&token)?;
        backend
            .delete(&endpoints::chatbot(&id), Some(&token))
            .await
            .map_err(to_server_error)?;
        log::info!("deleted chatbot {}", id);
        Ok(())
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(ListConversations, "/api")]
pub async fn list_conversations(token: String, id: String) -> Result<Vec<ConversationRecord>, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::endpoints;

        let (backend, token) = server::authorized(&token)?;
        backend
            .get_json(&endpoints::chatbot_conversations(&id), Some(&token))
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

#[server(GetPublicChatbot, "/api")]
pub async fn get_public_chatbot(share_token: String) -> Result<ChatbotView, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::{backend_from_context, to_server_error};
        use crate::endpoints;

        if share_token.trim().is_empty() {
            return Err(server::invalid("Share link is incomplete"));
        }
        backend_from_context()?
            .get_json(&endpoints::public_chatbot(share_token.trim()), None)
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}

/// Non-streaming question, answered in one piece.
#[server(AskChatbot, "/api")]
pub async fn ask_chatbot(token: String, id: String, request: QueryRequest) -> Result<QueryResponse, ServerFnError> {
    #[cfg(feature = "ssr")]
    {
        use crate::backend::to_server_error;
        use crate::config::clamp_k;
        use crate::endpoints;
        use http::Method;

        if request.question.trim().is_empty() {
            return Err(server::invalid("Question is empty"));
        }
        let request = QueryRequest {
            k: clamp_k(request.k),
            ..request
        };
        let (backend, token) = server::authorized(&token)?;
        backend
            .send_json(Method::POST, &endpoints::chatbot_query(&id), Some(&token), &request)
            .await
            .map_err(to_server_error)
    }

    #[cfg(not(feature = "ssr"))]
    Err(ServerFnError::ServerError("Server-side function called on client".to_string()))
}
