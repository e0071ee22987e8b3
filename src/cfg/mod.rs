use std::{fmt, path::Path, time::Duration};

use config::{Environment, File};
use serde::Deserialize;

use crate::error::SyncError;

#[derive(Deserialize, Clone)]
/// Credentials of the discord application whose commands are managed.
/// Loaded once and never mutated afterwards.
pub struct Credentials {
    /// Identifier of the bot application, scopes every command.
    #[serde(alias = "appID", alias = "appid")]
    pub application_id: String,
    /// Secret bot token, sent in the `Authorization` header.
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("application_id", &self.application_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// What a batch does when the network itself fails during a call.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportPolicy {
    /// Report the failure and go on with the next item.
    #[default]
    Continue,
    /// Report the failure and skip every remaining item.
    Abort,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_pacing() -> String {
    "4500ms".to_string()
}

fn default_timeout() -> String {
    "30s".to_string()
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, SyncError> {
    humantime::parse_duration(value)
        .map_err(|err| SyncError::ConfigMalformed(format!("invalid {} `{}`: {}", key, value, err)))
}

#[derive(Deserialize, Debug, Clone)]
/// Settings of the remote registry and of the synchronizer.
pub struct RegistryConfig {
    /// Base url of the REST api, without trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Minimum time between the start of two calls.
    /// This uses the humantime syntax (`4500ms`, `5s`).
    #[serde(default = "default_pacing")]
    pub pacing: String,
    /// Longest time a single remote call may take before it counts as a transport failure.
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default)]
    pub on_transport_failure: TransportPolicy,
    /// Optional command table file; the built-in catalog is used otherwise.
    pub commands: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            pacing: default_pacing(),
            timeout: default_timeout(),
            on_transport_failure: TransportPolicy::default(),
            commands: None,
        }
    }
}

impl RegistryConfig {
    pub fn pacing(&self) -> Result<Duration, SyncError> {
        parse_duration("pacing", &self.pacing)
    }

    pub fn timeout(&self) -> Result<Duration, SyncError> {
        parse_duration("timeout", &self.timeout)
    }
}

#[derive(Debug, Clone)]
/// Main configuration structure
/// It just contains all the configuration blocks.
pub struct Config {
    pub discord: Credentials,
    pub registry: RegistryConfig,
}

/// Document as written on disk. Credentials live either in a `[discord]`
/// table or, for the legacy `config.json`, at the root of the document.
#[derive(Deserialize)]
struct Document {
    discord: Option<Credentials>,
    #[serde(alias = "appID", alias = "appid")]
    application_id: Option<String>,
    token: Option<String>,
    #[serde(default)]
    registry: RegistryConfig,
}

impl TryFrom<Document> for Config {
    type Error = SyncError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        let discord = match (document.discord, document.application_id, document.token) {
            (Some(discord), _, _) => discord,
            (None, Some(application_id), Some(token)) => Credentials {
                application_id,
                token,
            },
            _ => {
                return Err(SyncError::ConfigMalformed(
                    "missing the [discord] application_id and token".to_string(),
                ))
            }
        };

        Ok(Config {
            discord,
            registry: document.registry,
        })
    }
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> String {
    shellexpand::full_with_context_no_errors(
        path,
        || dirs::home_dir().and_then(|p| p.to_str().map(|s| s.to_string())),
        |f| std::env::var(f).ok(),
    )
    .to_string()
}

/// Loads the configuration using the `config` crate.
/// Values can be overridden with `SLASHSYNC__SECTION__KEY` variables.
pub fn load_config(path: &Path) -> Result<Config, SyncError> {
    if !path.exists() {
        return Err(SyncError::ConfigMissing(path.display().to_string()));
    }

    let document: Document = config::Config::builder()
        .add_source(File::from(path))
        .add_source(Environment::with_prefix("SLASHSYNC").separator("__"))
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(|err| SyncError::ConfigMalformed(format!("{}: {}", path.display(), err)))?;
    let config = Config::try_from(document)?;

    // fail at startup rather than on the first call
    config.registry.pacing()?;
    config.registry.timeout()?;

    Ok(config)
}

#[cfg(test)]
mod test {
    use std::{io::Write, path::Path, time::Duration};

    use super::{expand_path, load_config, TransportPolicy};
    use crate::error::SyncError;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_toml_config() {
        let file = write_config(
            ".toml",
            r#"
[discord]
application_id = "1013538476844658000"
token = "secret"

[registry]
api_base = "http://localhost:8080/api"
pacing = "5s"
on_transport_failure = "abort"
commands = "commands.toml"
"#,
        );

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.discord.application_id, "1013538476844658000");
        assert_eq!(config.discord.token, "secret");
        assert_eq!(config.registry.api_base, "http://localhost:8080/api");
        assert_eq!(config.registry.pacing().unwrap(), Duration::from_secs(5));
        assert_eq!(config.registry.on_transport_failure, TransportPolicy::Abort);
        assert_eq!(config.registry.commands.as_deref(), Some("commands.toml"));
    }

    #[test]
    fn defaults_apply() {
        let file = write_config(
            ".toml",
            "[discord]\napplication_id = \"42\"\ntoken = \"secret\"\n",
        );

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.registry.api_base, "https://discord.com/api/v10");
        assert_eq!(config.registry.pacing().unwrap(), Duration::from_millis(4500));
        assert_eq!(config.registry.on_transport_failure, TransportPolicy::Continue);
        assert_eq!(config.registry.timeout().unwrap(), Duration::from_secs(30));
        assert!(config.registry.commands.is_none());
    }

    #[test]
    fn example_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");

        let config = load_config(&path).unwrap();

        assert_eq!(config.registry.pacing().unwrap(), Duration::from_millis(4500));
    }

    #[test]
    fn app_id_alias_in_discord_table() {
        let file = write_config(
            ".json",
            r#"{ "discord": { "appID": "1013538476844658000", "token": "secret" } }"#,
        );

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.discord.application_id, "1013538476844658000");
    }

    #[test]
    fn legacy_flat_config_json() {
        let file = write_config(
            ".json",
            r#"{ "appID": "1013538476844658000", "token": "secret" }"#,
        );

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.discord.application_id, "1013538476844658000");
        assert_eq!(config.discord.token, "secret");
        assert_eq!(config.registry.pacing().unwrap(), Duration::from_millis(4500));
    }

    #[test]
    fn no_credentials_at_all() {
        let file = write_config(".toml", "[registry]\npacing = \"5s\"\n");

        assert!(matches!(
            load_config(file.path()),
            Err(SyncError::ConfigMalformed(_))
        ));
    }

    #[test]
    fn timeout_setting() {
        let file = write_config(
            ".toml",
            "[discord]\napplication_id = \"42\"\ntoken = \"t\"\n[registry]\ntimeout = \"10s\"\n",
        );

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.registry.timeout().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn invalid_timeout() {
        let file = write_config(
            ".toml",
            "[discord]\napplication_id = \"42\"\ntoken = \"t\"\n[registry]\ntimeout = \"never\"\n",
        );

        assert!(matches!(
            load_config(file.path()),
            Err(SyncError::ConfigMalformed(_))
        ));
    }

    #[test]
    fn expands_home_and_variables() {
        let home = dirs::home_dir().unwrap();

        assert_eq!(expand_path("~/x"), format!("{}/x", home.display()));

        std::env::set_var("MAPPO_TEST_DIR", "/srv/mappo");
        assert_eq!(expand_path("$MAPPO_TEST_DIR/config.json"), "/srv/mappo/config.json");
        assert_eq!(expand_path("config.toml"), "config.toml");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            load_config(&dir.path().join("config.toml")),
            Err(SyncError::ConfigMissing(_))
        ));
    }

    #[test]
    fn missing_token() {
        let file = write_config(".toml", "[discord]\napplication_id = \"42\"\n");

        assert!(matches!(
            load_config(file.path()),
            Err(SyncError::ConfigMalformed(_))
        ));
    }

    #[test]
    fn unparsable_document() {
        let file = write_config(".json", "{ \"discord\": ");

        assert!(matches!(
            load_config(file.path()),
            Err(SyncError::ConfigMalformed(_))
        ));
    }

    #[test]
    fn invalid_pacing() {
        let file = write_config(
            ".toml",
            "[discord]\napplication_id = \"42\"\ntoken = \"t\"\n[registry]\npacing = \"soon\"\n",
        );

        assert!(matches!(
            load_config(file.path()),
            Err(SyncError::ConfigMalformed(_))
        ));
    }

    #[test]
    fn token_is_not_printed() {
        let file = write_config(
            ".toml",
            "[discord]\napplication_id = \"42\"\ntoken = \"hunter2\"\n",
        );

        let config = load_config(file.path()).unwrap();

        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
