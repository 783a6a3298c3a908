/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use super::{AutogradConfig, ConfigError};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from("./autograd.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("autograd").join("config.toml"));
        }

        search_paths.push(PathBuf::from("/etc/autograd/config.toml"));

        Self { search_paths }
    }

    #[cfg(test)]
    /// Create a config loader with custom search paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Load configuration from the given file, `AUTOGRAD_CONFIG`, or the
    /// first search path that exists. Falls back to defaults when no file is
    /// found and none was asked for.
    pub fn load_config(&self, config_file: Option<&Path>) -> Result<AutogradConfig, ConfigError> {
        let config_path = if let Some(path) = config_file {
            Some(path.to_path_buf())
        } else if let Ok(env_config) = env::var("AUTOGRAD_CONFIG") {
            Some(PathBuf::from(env_config))
        } else {
            self.find_config_file()
        };

        let config = match config_path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                self.load_config_from_file(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                AutogradConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_config_from_file(&self, path: &Path) -> Result<AutogradConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let substituted = self.substitute_env_vars(&content)?;
        Ok(toml::from_str::<AutogradConfig>(&substituted)?)
    }

    /// Find the first existing configuration file in search paths
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .find(|path| path.is_file())
            .cloned()
    }

    /// Replaces `${VAR}` and `${VAR:-default}` with values from the environment
    fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::EnvSubstitutionError(e.to_string()))?;
        let mut result = String::with_capacity(content.len());
        let mut last = 0;

        for cap in re.captures_iter(content) {
            let (Some(full), Some(expr)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            result.push_str(&content[last..full.start()]);
            result.push_str(&self.process_var_expression(expr.as_str())?);
            last = full.end();
        }
        result.push_str(&content[last..]);

        Ok(result)
    }

    fn process_var_expression(&self, expr: &str) -> Result<String, ConfigError> {
        if let Some((var_name, default_value)) = expr.split_once(":-") {
            Ok(env::var(var_name).unwrap_or_else(|_| default_value.to_string()))
        } else {
            env::var(expr).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "Required environment variable '{}' is not set",
                    expr
                ))
            })
        }
    }

}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
