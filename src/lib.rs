pub mod components;
pub mod config;
pub mod error;
pub mod presenter;
pub mod server;
pub mod shutdown;
pub mod startup;
