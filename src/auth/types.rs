use std::fmt;

use leptos::prelude::*;
use serde::{Deserialize, Serialize};

/// localStorage key holding the bearer token.
pub const TOKEN_STORAGE_KEY: &str = "ragbot_token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "nom")]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "nom")]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserView {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Partial profile update. Unset fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(rename = "prenom", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "nom", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserUpdate {
    /// Only the fields that differ from `current`, trimmed.
    pub fn changes_from(current: &UserView, first_name: &str, last_name: &str, email: &str) -> Self {
        let changed = |new: &str, old: &str| {
            let new = new.trim();
            (!new.is_empty() && new != old).then(|| new.to_string())
        };
        UserUpdate {
            first_name: changed(first_name, &current.first_name),
            last_name: changed(last_name, &current.last_name),
            email: changed(email, &current.email),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidInput(String),
    Backend(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "You need to log in first"),
            AuthError::InvalidInput(e) => write!(f, "{}", e),
            AuthError::Backend(e) => write!(f, "{}", e),
        }
    }
}

pub fn to_server_error(e: AuthError) -> ServerFnError {
    ServerFnError::ServerError(e.to_string())
}

/// Rejects an empty token before it reaches the backend.
pub fn require_token(token: &str) -> Result<&str, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        Err(AuthError::MissingToken)
    } else {
        Ok(token)
    }
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    for (label, value) in [("First name", &request.first_name), ("Last name", &request.last_name)] {
        let len = value.trim().chars().count();
        if !(2..=50).contains(&len) {
            return Err(AuthError::InvalidInput(format!(
                "{} must be between 2 and 50 characters",
                label
            )));
        }
    }
    if !request.email.contains('@') {
        return Err(AuthError::InvalidInput("Email address is not valid".to_string()));
    }
    if request.password.chars().count() < 6 {
        return Err(AuthError::InvalidInput(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// Turns a server fn error into the text shown under a form.
pub fn error_message(e: &ServerFnError) -> String {
    match e {
        ServerFnError::ServerError(message) => message.clone(),
        other => other.to_string(),
    }
}
