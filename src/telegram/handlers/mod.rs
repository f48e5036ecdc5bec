//! Telegram update handlers

mod commands;
mod schema;
mod types;
mod uploads;

pub use schema::schema;
pub use types::{route_text, HandlerDeps, HandlerError, TextRoute};
