//! Build configuration descriptor
//!
//! [`BuildConfig`] holds every setting a build needs: where the source
//! checkout lives, where the output tree goes, which stages are enabled,
//! database credentials, and the branch list driven by the scheduler.
//!
//! The persisted format is the JSON file written by users of the tool,
//! so field names stay camelCase on the wire. Any key can be overridden
//! from the command line with `--key=value` (see [`split_overrides`] and
//! [`BuildConfig::apply_overrides`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Sentinel value in `sugar_config_si` asking for a computed default
pub const AUTO_CONVERT: &str = "{{auto_convert}}";

/// The two product editions built for every scheduled branch, in order
pub const FLAVORS: [&str; 2] = ["ent", "pro"];

/// Errors raised while loading or adjusting a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration JSON was malformed or had the wrong shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A command-line override could not be coerced to the key's type
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The configuration is internally inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Resolved settings for one build
///
/// Every field has a default so partial config files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    /// Source checkout root; the application lives in `<sourceDir>/sugarcrm`
    pub source_dir: PathBuf,

    /// Output root; each flavor is built into `<outputDir>/<flavor>`
    pub output_dir: PathBuf,

    /// Version string handed to the compiler
    pub version: String,

    /// Active build flavor (e.g. "ent", "pro")
    pub flavor: String,

    /// Run the dependency installer before compiling
    pub run_composer: bool,

    /// Compile the application into the output tree
    pub build_sugar: bool,

    /// Build front-end assets in the output tree
    pub build_sidecar: bool,

    /// Run the install wizard against the built instance
    pub install_sugar: bool,

    /// Let the install wizard insert its own demo data
    pub install_demo_data: bool,

    /// Import demo data from a dump instead of the wizard
    pub import_demo_data: bool,

    /// Local dump file stem (inside `sqlDumpDir`, without `.sql`) to import
    pub import_dump_file: String,

    /// Remote dashboard host to fetch a dump from
    pub import_host: String,

    /// Branch whose dump is fetched from `importHost`
    pub import_branch: String,

    /// Pass the language-inclusion flag to the compiler
    pub include_language: bool,

    /// Mirror source changes into the output tree after the build
    pub watch_changes: bool,

    /// Watch for changes without building anything
    pub watch_only: bool,

    /// Export the database after a successful install
    pub create_sql_dump: bool,

    /// Directory holding database dumps
    pub sql_dump_dir: PathBuf,

    /// License key substituted into the install settings and dumps
    pub sugarcrm_license: String,

    /// Install with developer mode enabled
    pub developer_mode: bool,

    /// Base URL the built flavors are served under
    pub base_web_url: String,

    /// Run as a service building every branch on an interval
    pub enable_build_schedule: bool,

    /// Branches built by the scheduler, in order
    pub branches: Vec<String>,

    /// Serve the dashboard
    pub enable_web_server: bool,

    /// Dashboard port
    pub web_server_port: u16,

    /// Directory of static dashboard assets
    pub static_dir: PathBuf,

    /// Mirror every external command's output to the terminal
    pub verbose: bool,

    /// Branch currently checked out by the scheduler (empty when standalone)
    pub current_branch: String,

    /// Only serve the dashboard
    pub build_admin: bool,

    /// Command prefix of the scripted browser; the install URL is appended
    pub install_driver: String,

    /// Maximum install reruns per build, 0 means unbounded
    pub max_reruns: u32,

    /// Seconds between scheduled passes
    pub schedule_interval_secs: u64,

    /// Seconds between scheduler wake-ups
    pub schedule_poll_secs: u64,

    /// Seconds to wait between branches
    pub branch_delay_secs: u64,

    /// File extensions (without the dot) whose change clears the asset cache
    pub cache_invalidating_extensions: Vec<String>,

    /// Cache directory, relative to the flavor output tree
    pub cache_dir: PathBuf,

    /// Remote manifest compared against the local version at startup
    pub version_manifest_url: String,

    /// Settings written to `config_si.php` for the silent installer
    #[serde(rename = "sugar_config_si")]
    pub install_settings: Map<String, Value>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::new(),
            version: "7.0.0".to_string(),
            flavor: FLAVORS[0].to_string(),
            run_composer: false,
            build_sugar: true,
            build_sidecar: true,
            install_sugar: true,
            install_demo_data: true,
            import_demo_data: false,
            import_dump_file: String::new(),
            import_host: String::new(),
            import_branch: String::new(),
            include_language: false,
            watch_changes: false,
            watch_only: false,
            create_sql_dump: false,
            sql_dump_dir: PathBuf::from("data"),
            sugarcrm_license: String::new(),
            developer_mode: false,
            base_web_url: "http://localhost".to_string(),
            enable_build_schedule: false,
            branches: Vec::new(),
            enable_web_server: false,
            web_server_port: 3000,
            static_dir: PathBuf::from("css"),
            verbose: false,
            current_branch: String::new(),
            build_admin: false,
            install_driver: "phantomjs phantom-install.js".to_string(),
            max_reruns: 5,
            schedule_interval_secs: 3 * 60 * 60,
            schedule_poll_secs: 30,
            branch_delay_secs: 10,
            cache_invalidating_extensions: vec!["less".to_string()],
            cache_dir: PathBuf::from("cache/themes/clients/base/default"),
            version_manifest_url:
                "https://raw.githubusercontent.com/ScopeXL/sugarbuild/master/package.json"
                    .to_string(),
            install_settings: default_install_settings(),
        }
    }
}

fn default_install_settings() -> Map<String, Value> {
    let mut settings = Map::new();
    let mut put = |key: &str, value: Value| {
        settings.insert(key.to_string(), value);
    };

    put("setup_db_host_name", Value::from("localhost"));
    put("setup_db_database_name", Value::from(AUTO_CONVERT));
    put("setup_db_admin_user_name", Value::from("root"));
    put("setup_db_admin_password", Value::from("root"));
    put("setup_db_type", Value::from("mysql"));
    put("setup_db_create_database", Value::from(1));
    put("setup_db_drop_tables", Value::from(1));
    put("setup_license_key", Value::from(AUTO_CONVERT));
    put("setup_site_url", Value::from(AUTO_CONVERT));
    put("setup_site_admin_user_name", Value::from("admin"));
    put("setup_site_admin_password", Value::from("asdf"));
    put("setup_system_name", Value::from("SugarCRM"));
    put("demoData", Value::from(AUTO_CONVERT));
    put("developerMode", Value::from(AUTO_CONVERT));
    settings
}

impl BuildConfig {
    /// Loads a configuration file, falling back to defaults for missing keys
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses a configuration from JSON text
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Every key accepted in the config file and as a `--key=value` override
    pub fn keys() -> Vec<String> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// The application tree inside the source checkout
    pub fn sugar_dir(&self) -> PathBuf {
        self.source_dir.join("sugarcrm")
    }

    /// The output tree of the active flavor
    pub fn flavor_output_dir(&self) -> PathBuf {
        self.output_dir.join(&self.flavor)
    }

    /// The URL of the active flavor's install wizard
    pub fn install_url(&self) -> String {
        format!(
            "{}/{}/install.php?goto=SilentInstall&cli=true",
            self.base_web_url.trim_end_matches('/'),
            self.flavor
        )
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }

    pub fn schedule_poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_poll_secs)
    }

    pub fn branch_delay(&self) -> Duration {
        Duration::from_secs(self.branch_delay_secs)
    }

    /// Reads a string install setting, ignoring non-string values
    pub fn install_setting(&self, key: &str) -> Option<&str> {
        self.install_settings.get(key).and_then(Value::as_str)
    }

    /// Applies `--key=value` overrides
    ///
    /// Values are coerced to the type of the key they replace: `true` and
    /// `false` become booleans, numeric keys are parsed, list keys are
    /// split on commas, and everything else is stored as text.
    ///
    /// # Returns
    /// The override keys that do not name a configuration key
    pub fn apply_overrides(
        &mut self,
        overrides: &[(String, String)],
    ) -> Result<Vec<String>, ConfigError> {
        let mut value = serde_json::to_value(&*self)?;
        let Some(fields) = value.as_object_mut() else {
            return Err(ConfigError::Invalid(
                "configuration did not serialize to an object".to_string(),
            ));
        };

        let mut unknown = Vec::new();
        for (key, raw) in overrides {
            match fields.get_mut(key) {
                Some(slot) => {
                    *slot = coerce_override(slot, raw).map_err(|message| {
                        ConfigError::InvalidValue {
                            key: key.clone(),
                            message,
                        }
                    })?;
                }
                None => unknown.push(key.clone()),
            }
        }

        *self = serde_json::from_value(value)?;
        Ok(unknown)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flavor.trim().is_empty() {
            return Err(ConfigError::Invalid("flavor cannot be empty".to_string()));
        }

        if self.schedule_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduleIntervalSecs must be greater than 0".to_string(),
            ));
        }

        if self.schedule_poll_secs == 0 {
            return Err(ConfigError::Invalid(
                "schedulePollSecs must be greater than 0".to_string(),
            ));
        }

        if self.enable_build_schedule && self.branches.is_empty() {
            return Err(ConfigError::Invalid(
                "enableBuildSchedule requires at least one branch".to_string(),
            ));
        }

        if self.install_sugar
            && !self.base_web_url.starts_with("http://")
            && !self.base_web_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(
                "baseWebUrl must start with http:// or https://".to_string(),
            ));
        }

        Ok(())
    }
}

/// Coerces a raw override into the JSON type of the value it replaces
fn coerce_override(current: &Value, raw: &str) -> Result<Value, String> {
    match raw {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    match current {
        Value::Bool(_) => Err(format!("expected true or false, got '{}'", raw)),
        Value::Number(_) => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| format!("expected a non-negative number, got '{}'", raw)),
        Value::Array(_) => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from)
                .collect(),
        )),
        Value::Object(_) => Err("nested settings cannot be overridden".to_string()),
        Value::String(_) | Value::Null => Ok(Value::String(raw.to_string())),
    }
}

/// Separates `--key=value` configuration overrides from other arguments
///
/// Only arguments whose key names a configuration key are taken; all other
/// arguments are returned untouched, in order, for regular flag parsing.
pub fn split_overrides<I>(args: I) -> (Vec<(String, String)>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let keys = BuildConfig::keys();
    let mut overrides = Vec::new();
    let mut rest = Vec::new();

    for arg in args {
        let parsed = arg
            .strip_prefix("--")
            .and_then(|body| body.split_once('='))
            .filter(|(key, _)| keys.iter().any(|known| known == key));

        match parsed {
            Some((key, value)) => overrides.push((key.to_string(), value.to_string())),
            None => rest.push(arg),
        }
    }

    (overrides, rest)
}
