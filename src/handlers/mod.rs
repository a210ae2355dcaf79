pub mod message;
pub mod router;

pub use router::{EventRouter, RouterExit};
