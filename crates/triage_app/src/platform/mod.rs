//! Terminal front end: settings, logging, the input loop and text rendering.

mod app;
mod effects;
mod input;
mod render;
mod session;
mod settings;

pub use app::run_app;
