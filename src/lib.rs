pub mod api;
pub mod chat;
pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod session;
pub mod stream;
pub mod ui;
