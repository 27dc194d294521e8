use secrecy::Secret;
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub identity: IdentitySettings,
    pub storage: StorageSettings,
    pub documents: DocumentSettings,
    pub notifications: NotificationSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Browser-reachable base URL, used in signed links and emails.
    pub public_base_url: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

#[derive(Deserialize, Clone)]
pub struct IdentitySettings {
    /// Base URL of the identity provider's REST surface.
    pub url: String,
}

#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    pub local_path: String,
}

#[derive(Deserialize, Clone)]
pub struct DocumentSettings {
    /// Secret for signing time-limited download links. Not a session
    /// credential; it only scopes one object read.
    pub signing_secret: Secret<String>,
    #[serde(default = "default_url_ttl_seconds")]
    pub url_ttl_seconds: i64,
}

fn default_url_ttl_seconds() -> i64 {
    3600
}

#[derive(Deserialize, Clone)]
pub struct NotificationSettings {
    #[serde(default)]
    pub enabled: bool,
    pub admin_email: String,
    pub from_email: String,
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_password: Secret<String>,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    // Works both from the workspace root and from within the crate.
    let configuration_directory = if base_path.ends_with("member-portal") {
        base_path.join("config")
    } else {
        base_path.join("member-portal").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
