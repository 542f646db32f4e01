//! Configuration management for the relay

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub drive: DriveConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Drive files API base, e.g. `https://www.googleapis.com/drive/v3`
    pub api_base: String,

    /// Resumable upload API base, e.g. `https://www.googleapis.com/upload/drive/v3`
    pub upload_base: String,

    /// Origin allowed to call the relay (the host application's domain)
    pub allowed_origin: String,

    /// Default Drive folder name uploads are targeted at
    pub upload_folder: String,

    /// How the bearer credential travels to Google
    pub token_transport: TokenTransport,
}

/// Credential transport variants; deployments differ in which one the
/// backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenTransport {
    /// `access_token` query parameter
    Query,
    /// `Authorization: Bearer` header
    Header,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token-exchange endpoint used to refresh expired credentials
    pub refresh_url: String,

    /// Where the stored credential lives on disk
    pub credential_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            drive: DriveConfig {
                api_base: "https://www.googleapis.com/drive/v3".to_string(),
                upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
                allowed_origin: "http://localhost:3000".to_string(),
                upload_folder: "Attachments".to_string(),
                token_transport: TokenTransport::Query,
            },
            auth: AuthConfig {
                refresh_url: "https://oauth2.googleapis.com/token".to_string(),
                credential_path: "./credential.json".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            drive: DriveConfig {
                api_base: env::var("DRIVE_API_BASE").unwrap_or(defaults.drive.api_base),
                upload_base: env::var("DRIVE_UPLOAD_BASE").unwrap_or(defaults.drive.upload_base),
                allowed_origin: env::var("ALLOWED_ORIGIN")
                    .unwrap_or(defaults.drive.allowed_origin),
                upload_folder: env::var("UPLOAD_FOLDER").unwrap_or(defaults.drive.upload_folder),
                token_transport: match env::var("TOKEN_TRANSPORT").as_deref() {
                    Ok("header") => TokenTransport::Header,
                    _ => TokenTransport::Query,
                },
            },
            auth: AuthConfig {
                refresh_url: env::var("TOKEN_REFRESH_URL").unwrap_or(defaults.auth.refresh_url),
                credential_path: env::var("CREDENTIAL_PATH")
                    .unwrap_or(defaults.auth.credential_path),
            },
        }
    }
}
