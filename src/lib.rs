// Library root: re-exports all modules so integration tests and the binary
// can access the crate's public API.

pub mod auction;
pub mod config;
pub mod db;
pub mod player;
pub mod server;
pub mod store;
