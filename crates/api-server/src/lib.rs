#![warn(clippy::unwrap_used)]

pub mod rest;
pub mod server;
pub mod ui;

pub use server::ApiServer;
