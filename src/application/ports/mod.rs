pub mod mail_server;
pub mod notifier;
