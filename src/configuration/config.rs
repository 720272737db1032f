#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::collections::HashMap;
use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::BackendName;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ArtifactSuffix,
    ArtifactsDir,
    Backend,
    BackendHealthCheckTimeout,
    ConfigFile,
    ExecutionTimeout,
    Interpreter,
    MaxIterations,
    Model,
    OllamaURL,
    #[strum(to_string = "openai-token")]
    OpenAiToken,
    #[strum(to_string = "openai-url")]
    OpenAiURL,
    Username,
}

impl ConfigKey {
    /// Keys that must hold a non-negative whole number.
    pub fn is_numeric(&self) -> bool {
        return [
            ConfigKey::BackendHealthCheckTimeout,
            ConfigKey::ExecutionTimeout,
            ConfigKey::MaxIterations,
        ]
        .contains(self);
    }
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    /// Directory holding the config file and debug logs.
    pub fn app_dir() -> path::PathBuf {
        return dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("mender");
    }

    pub fn default(key: ConfigKey) -> String {
        if key == ConfigKey::Username {
            let mut user = env::var("USER").unwrap_or_else(|_| return "".to_string());
            if user.is_empty() {
                user = "User".to_string();
            }

            return user;
        }

        if key == ConfigKey::ConfigFile {
            return Config::app_dir()
                .join("config.toml")
                .to_string_lossy()
                .to_string();
        }

        let default_backend = BackendName::OpenAI.to_string();

        let res = match key {
            ConfigKey::ArtifactSuffix => ".py",
            ConfigKey::ArtifactsDir => "generated_programs",
            ConfigKey::Backend => &default_backend,
            ConfigKey::BackendHealthCheckTimeout => "1000",
            ConfigKey::ExecutionTimeout => "30",
            ConfigKey::Interpreter => "python3",
            ConfigKey::MaxIterations => "5",
            ConfigKey::Model => "gpt-4o-mini",
            ConfigKey::OllamaURL => "http://localhost:11434",
            ConfigKey::OpenAiToken => "",
            ConfigKey::OpenAiURL => "https://api.openai.com",

            // Handled above.
            ConfigKey::ConfigFile => "",
            ConfigKey::Username => "",
        };

        return res.to_string();
    }

    fn possible_values(cmd: &Command, key: ConfigKey) -> Vec<String> {
        let arg = cmd
            .get_arguments()
            .find(|e| return e.get_long() == Some(key.to_string().as_str()));

        if let Some(arg) = arg {
            return arg
                .get_possible_values()
                .iter()
                .map(|e| return e.get_name().to_string())
                .collect::<Vec<String>>();
        }

        return vec![];
    }

    fn validate(cmd: &Command, key: ConfigKey, val: &str) -> Result<()> {
        let possible_values = Config::possible_values(cmd, key);
        if !possible_values.is_empty() && !possible_values.contains(&val.to_string()) {
            bail!(format!(
                "Invalid value for '{key}': {val}\nPossible values are: {}",
                possible_values.join(", ")
            ));
        }

        if key.is_numeric() && val.parse::<u64>().is_err() {
            bail!(format!(
                "Invalid value for '{key}': {val}\nExpected a whole number."
            ));
        }

        return Ok(());
    }

    /// Resolves every key from defaults, the config file, then the parsed CLI
    /// flags and environment. Nothing is committed unless every value
    /// validates.
    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        let mut values: HashMap<ConfigKey, String> = ConfigKey::iter()
            .map(|key| return (key, Config::default(key)))
            .collect();

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(&config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    let val_str = if let Some(val_int) = val.as_integer() {
                        val_int.to_string()
                    } else if let Some(val_str) = val.as_str() {
                        val_str.to_string()
                    } else {
                        bail!(format!(
                            "{config_file} has an unsupported value type for key '{key}'"
                        ));
                    };

                    if val_str.is_empty() {
                        continue;
                    }

                    if let Err(err) = Config::validate(&cmd, key, &val_str) {
                        bail!(format!("{config_file}: {err}"));
                    }
                    values.insert(key, val_str);
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::validate(&cmd, key, val)?;
                    values.insert(key, val.to_string());
                }
            }
        }

        values.insert(ConfigKey::ConfigFile, config_file);
        for (key, val) in values.iter() {
            Config::set(*key, val);
        }

        tracing::debug!(
            username = Config::get(ConfigKey::Username),
            backend = Config::get(ConfigKey::Backend),
            model = Config::get(ConfigKey::Model),
            interpreter = Config::get(ConfigKey::Interpreter),
            artifacts_dir = Config::get(ConfigKey::ArtifactsDir),
            max_iterations = Config::get(ConfigKey::MaxIterations),
            execution_timeout = Config::get(ConfigKey::ExecutionTimeout),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                if key == ConfigKey::Username {
                    return Some(
                        "# Your user name displayed in all chat bubbles.\n# username = \"\""
                            .to_string(),
                    );
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let possible_values = Config::possible_values(&cmd, key);
                if !possible_values.is_empty() {
                    description = format!(
                        "{description} [possible values: {}]",
                        possible_values.join(", ")
                    );
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if key.is_numeric() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
