pub mod auth;
pub mod commands;
pub mod config;
pub mod consts;
pub mod filter;
pub mod logging;
pub mod outbound;
pub mod reference;
pub mod render;
pub mod session;
pub mod triage;
pub mod warehouse;
