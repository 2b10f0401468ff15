//! Silent installer settings
//!
//! `sugar_config_si` values set to the auto-convert sentinel are resolved
//! from the rest of the configuration, then rendered as the PHP array the
//! installer reads from `config_si.php`.

use serde_json::{Map, Value};
use sugarbuild_core::domain::config::{AUTO_CONVERT, BuildConfig};

use crate::command::quote;
use crate::error::PipelineError;

/// File name of the generated installer settings
pub const CONFIG_SI_FILE: &str = "config_si.php";

/// Returns the install settings with every resolvable sentinel replaced
///
/// The configuration itself is left untouched, so a later flavor or
/// schedule change resolves afresh. Sentinels on keys without a
/// resolution rule are kept as-is.
pub fn resolve_install_settings(config: &BuildConfig) -> Map<String, Value> {
    let mut settings = config.install_settings.clone();

    for (key, value) in settings.iter_mut() {
        if value.as_str() != Some(AUTO_CONVERT) {
            continue;
        }
        if let Some(resolved) = resolve(key, config) {
            *value = resolved;
        }
    }

    settings
}

fn resolve(key: &str, config: &BuildConfig) -> Option<Value> {
    let value = match key {
        "setup_license_key" => Value::from(config.sugarcrm_license.clone()),
        "developerMode" => Value::from(u8::from(config.developer_mode)),
        "setup_db_database_name" => Value::from(database_name(config)),
        "demoData" => Value::from(if config.install_demo_data { "yes" } else { "no" }),
        "setup_site_url" => Value::from(format!(
            "{}/{}/",
            config.base_web_url.trim_end_matches('/'),
            config.flavor
        )),
        _ => return None,
    };
    Some(value)
}

/// Default database name of the active flavor
///
/// Scheduled builds use a separate schema so they never clobber a
/// developer's working instance.
pub fn database_name(config: &BuildConfig) -> String {
    if config.enable_build_schedule {
        format!("sugar7{}_build", config.flavor)
    } else {
        format!("sugar7{}", config.flavor)
    }
}

/// Renders the settings as a PHP `$sugar_config_si` array
///
/// Numbers and booleans are written bare; everything else is a
/// single-quoted PHP string.
pub fn render_config_si(settings: &Map<String, Value>) -> String {
    let mut out = String::from("<?php\n$sugar_config_si = array(\n");
    for (key, value) in settings {
        out.push_str("    ");
        out.push_str(&php_string(key));
        out.push_str(" => ");
        out.push_str(&php_value(value));
        out.push_str(",\n");
    }
    out.push_str(");\n");
    out
}

fn php_value(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::String(s) => php_string(s),
        other => php_string(&other.to_string()),
    }
}

fn php_string(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Database connection details taken from the resolved install settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbCredentials {
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self, PipelineError> {
        let get = |key: &str| -> Result<String, PipelineError> {
            match settings.get(key) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                _ => Err(PipelineError::Setting(format!(
                    "sugar_config_si.{} must be set",
                    key
                ))),
            }
        };

        let database = get("setup_db_database_name")?;
        if database.is_empty() || database == AUTO_CONVERT {
            return Err(PipelineError::Setting(
                "sugar_config_si.setup_db_database_name must be set".to_string(),
            ));
        }

        Ok(Self {
            host: get("setup_db_host_name")?,
            user: get("setup_db_admin_user_name")?,
            password: get("setup_db_admin_password")?,
            database,
        })
    }

    /// Connection options shared by `mysql` and `mysqldump`
    pub fn client_options(&self) -> String {
        format!(
            "--host={} --user={} --password={}",
            quote(&self.host),
            quote(&self.user),
            quote(&self.password)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Reads back a rendered `config_si.php`
    fn parse_config_si(text: &str) -> Map<String, Value> {
        let body = text
            .strip_prefix("<?php\n$sugar_config_si = array(\n")
            .and_then(|rest| rest.strip_suffix(");\n"))
            .unwrap();

        body.lines()
            .map(|line| {
                let line = line.trim().strip_suffix(',').unwrap();
                let (key, value) = line.split_once(" => ").unwrap();
                (unquote(key).unwrap(), parse_value(value))
            })
            .collect()
    }

    fn unquote(text: &str) -> Option<String> {
        let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                out.extend(chars.next());
            } else {
                out.push(c);
            }
        }
        Some(out)
    }

    fn parse_value(text: &str) -> Value {
        if let Some(s) = unquote(text) {
            return Value::String(s);
        }
        serde_json::from_str(text).unwrap()
    }

    fn config() -> BuildConfig {
        BuildConfig {
            flavor: "pro".to_string(),
            sugarcrm_license: "LIC-123".to_string(),
            base_web_url: "http://dev.local".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sentinels_resolved() {
        let mut config = config();
        config.developer_mode = true;
        config.install_demo_data = false;

        let settings = resolve_install_settings(&config);

        assert_eq!(settings["setup_license_key"], json!("LIC-123"));
        assert_eq!(settings["developerMode"], json!(1));
        assert_eq!(settings["setup_db_database_name"], json!("sugar7pro"));
        assert_eq!(settings["demoData"], json!("no"));
        assert_eq!(settings["setup_site_url"], json!("http://dev.local/pro/"));
        assert_eq!(settings["setup_db_admin_user_name"], json!("root"));
    }

    #[test]
    fn test_config_is_not_mutated() {
        let config = config();
        let _ = resolve_install_settings(&config);
        assert_eq!(config.install_setting("setup_license_key"), Some(AUTO_CONVERT));

        let mut scheduled = config.clone();
        scheduled.enable_build_schedule = true;
        scheduled.flavor = "ent".to_string();
        let settings = resolve_install_settings(&scheduled);
        assert_eq!(settings["setup_db_database_name"], json!("sugar7ent_build"));
    }

    #[test]
    fn test_explicit_values_and_unknown_sentinels_kept() {
        let mut config = config();
        config
            .install_settings
            .insert("setup_db_database_name".to_string(), json!("custom"));
        config
            .install_settings
            .insert("setup_fts_type".to_string(), json!(AUTO_CONVERT));

        let settings = resolve_install_settings(&config);
        assert_eq!(settings["setup_db_database_name"], json!("custom"));
        assert_eq!(settings["setup_fts_type"], json!(AUTO_CONVERT));
    }

    #[test]
    fn test_render_format() {
        let mut settings = Map::new();
        settings.insert("setup_db_host_name".to_string(), json!("localhost"));
        settings.insert("setup_db_create_database".to_string(), json!(1));
        settings.insert("verbose".to_string(), json!(false));

        assert_eq!(
            render_config_si(&settings),
            "<?php\n$sugar_config_si = array(\n    'setup_db_host_name' => 'localhost',\n    'setup_db_create_database' => 1,\n    'verbose' => false,\n);\n"
        );
    }

    #[test]
    fn test_rendered_file_reads_back() {
        let mut config = config();
        config
            .install_settings
            .insert("setup_site_admin_password".to_string(), json!("it's a \\ secret"));
        let settings = resolve_install_settings(&config);

        let parsed = parse_config_si(&render_config_si(&settings));

        assert_eq!(parsed, settings);
        assert_eq!(
            parsed.keys().collect::<Vec<_>>(),
            settings.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_db_credentials() {
        let settings = resolve_install_settings(&config());
        let creds = DbCredentials::from_settings(&settings).unwrap();

        assert_eq!(creds.database, "sugar7pro");
        assert_eq!(
            creds.client_options(),
            "--host=localhost --user=root --password=root"
        );

        let mut broken = settings.clone();
        broken.remove("setup_db_host_name");
        assert!(DbCredentials::from_settings(&broken).is_err());
    }
}
