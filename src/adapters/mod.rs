pub mod http;
pub mod mailserver;
pub mod persistence;
