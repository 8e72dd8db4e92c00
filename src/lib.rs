pub mod auth;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod forwarder;
pub mod store;
pub mod trigger;
pub mod webhook;
