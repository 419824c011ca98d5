// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log_directory: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub provider: ProviderSettings,
}

/// Claims handed out by the reference attribute provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_tdf_spec_version")]
    pub tdf_spec_version: String,
    #[serde(default = "default_subject_attributes")]
    pub subject_attributes: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            tdf_spec_version: default_tdf_spec_version(),
            subject_attributes: default_subject_attributes(),
        }
    }
}

fn default_tdf_spec_version() -> String {
    "4.0.0".to_string()
}

fn default_subject_attributes() -> Vec<String> {
    vec![
        "https://example.com/attr/Classification/value/S".to_string(),
        "https://example.com/attr/COI/value/PRX".to_string(),
    ]
}

impl Settings {
    pub fn new(config_sources: Option<Vec<String>>) -> Result<Self, ConfigError> {
        let mut config =
            Config::builder().add_source(File::with_name("settings.toml").required(false));

        for source in config_sources.unwrap_or_default() {
            config = config.add_source(File::with_name(&source).required(false));
        }

        config.build()?.try_deserialize()
    }
}
