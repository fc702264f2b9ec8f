pub mod auth;
pub mod mail;
pub mod mail_domain;
pub mod reconcile;
pub mod requests;
pub mod users;
