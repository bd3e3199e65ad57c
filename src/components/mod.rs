pub mod browser;
pub mod chat_panel;
pub mod chatbot_detail;
pub mod chatbot_list;
pub mod markdown;
pub mod public_chat;
