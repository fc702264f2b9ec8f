use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    /// Bootstrap credentials; the admin is created at startup when both are
    /// set and the username does not exist yet.
    pub default_admin_username: Option<String>,
    pub default_admin_password: Option<String>,
    pub mail_server_url: Url,
    pub mail_server_read_api_key: String,
    pub mail_server_write_api_key: String,
    pub mailbox_poll_secs: u64,
    pub mailbox_quota_mb: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(required("JWT_SECRET").into());

        let access_token_ttl_secs: i64 = parse_default("ACCESS_TOKEN_TTL_SECS", 86_400);

        let cors_origin: HeaderValue = parse_default(
            "CORS_ORIGIN",
            HeaderValue::from_static("http://localhost:3000"),
        );

        let bind_addr: SocketAddr = parse_default("BIND_ADDR", "127.0.0.1:5000".parse().unwrap());
        let database_url: String = required("DATABASE_URL");

        let default_admin_username = std::env::var("DEFAULT_ADMIN_USERNAME").ok();
        let default_admin_password = std::env::var("DEFAULT_ADMIN_PASSWORD").ok();

        let mail_server_url: Url = required("MAIL_SERVER_URL")
            .parse()
            .expect("MAIL_SERVER_URL must be a valid URL");
        let mail_server_read_api_key: String = required("MAIL_SERVER_READ_API_KEY");
        let mail_server_write_api_key: String = required("MAIL_SERVER_WRITE_API_KEY");
        let mailbox_poll_secs: u64 = parse_default("MAILBOX_POLL_SECS", 30);
        let mailbox_quota_mb: i64 = parse_default("MAILBOX_QUOTA_MB", 2048);

        Self {
            bind_addr,
            database_url,
            cors_origin,
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            default_admin_username,
            default_admin_password,
            mail_server_url,
            mail_server_read_api_key,
            mail_server_write_api_key,
            mailbox_poll_secs,
            mailbox_quota_mb,
        }
    }
}

fn required(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn parse_default<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} has an invalid value")),
        Err(_) => default,
    }
}
