pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod exit;
pub mod logging;
pub mod logs;
pub mod tui;
pub mod ui;
pub mod views;
