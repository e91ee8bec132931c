//! HTTP surface: carrier webhooks and the actor-facing API.

pub mod handlers;
mod server;

pub use server::ApiServer;
