pub use spowcore::{command, jid, mime, types};

pub mod app;
pub mod client;
pub mod commands;
pub mod config;
pub mod dry_run;
mod files;
pub mod handlers;
pub mod history_sync;
pub mod input;
pub mod pairing;
pub mod presence;
pub mod qrcode;
pub mod session;
pub mod share;
#[cfg(feature = "whatsapp")]
pub mod whatsapp;

#[cfg(test)]
mod test_utils;
