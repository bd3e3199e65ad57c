mod api;
pub mod auth_components;
mod context;
mod token;
mod types;

pub use api::*;
pub use auth_components::*;
pub use context::*;
pub use token::*;
pub use types::*;
