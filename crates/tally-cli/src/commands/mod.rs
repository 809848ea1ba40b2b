pub mod common;
pub mod config;
pub mod health;
pub mod outbox;
pub mod productos;
pub mod sync;
