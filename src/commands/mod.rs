pub mod browse;
pub mod config;
pub mod login;
pub mod manage;
pub mod session;
pub mod transfer;
