pub mod events;
pub mod group;
pub mod message;
pub mod presence;
