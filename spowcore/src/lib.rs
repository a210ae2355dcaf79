pub mod appstate;
pub mod command;
pub mod history_sync;
pub mod jid;
pub mod mime;
pub mod share;
pub mod types;
