pub mod builtins;
pub mod completion;
pub mod config;
pub mod decoder;
pub mod executor;
pub mod history;
pub mod line_buffer;
pub mod render;
pub mod search;
pub mod session;
pub mod terminal;
