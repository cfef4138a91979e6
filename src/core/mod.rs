pub mod assets;
pub mod config;
pub mod content;
pub mod cutscene;
pub mod engine;
pub mod presenter;
pub mod reveal;
pub mod session;
pub mod status;
