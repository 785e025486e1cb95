mod assets;
mod provider;

pub mod completion;
pub mod config;
pub mod meal;
pub mod model;
pub mod request;
pub mod session;
pub mod transcript;

pub use crate::assets::get_data_dir;
pub use crate::provider::llm::get_chat_backend;
