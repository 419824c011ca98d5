// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{collections::HashMap, str::FromStr, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{identity::ClaimRequestType, mapper::TokenType, remote::RequestProfile};

pub const REMOTE_URL: &str = "remote.url";
pub const REMOTE_HEADERS: &str = "remote.headers";
pub const REMOTE_PARAMETERS: &str = "remote.parameters";
pub const REMOTE_PARAMETERS_USERNAME: &str = "remote.parameters.username";
pub const REMOTE_PARAMETERS_CLIENTID: &str = "remote.parameters.clientid";
pub const REMOTE_PROFILE: &str = "remote.profile";
pub const REMOTE_TIMEOUT_MS: &str = "remote.timeout.ms";
pub const CLAIM_NAME: &str = "claim.name";
pub const CLAIM_REQUEST_TYPE: &str = "claim.request.type";
pub const PUBLIC_KEY_HEADER: &str = "client.publickey";
pub const INCLUDE_IN_ACCESS_TOKEN: &str = "access.token.claim";
pub const INCLUDE_IN_ID_TOKEN: &str = "id.token.claim";
pub const INCLUDE_IN_USERINFO: &str = "userinfo.token.claim";

pub const DEFAULT_PUBLIC_KEY_HEADER: &str = "X-VirtruPubKey";
pub const DEFAULT_CLAIM_NAME: &str = "tdf_claims";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable supplying the attribute provider URL when a mapper has none configured.
pub static ATTRIBUTE_PROVIDER_URL_ENV: &str = "ATTRIBUTE_PROVIDER_URL";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("remote.url property is not set via an env variable or configuration value")]
    MissingEndpoint,
    #[error("Attribute provider URL {url} is invalid: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("Configured header {0} is not a valid HTTP header")]
    InvalidHeader(String),
}

/// Admin-supplied settings for a single mapper instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MapperConfiguration {
    config: HashMap<String, String>,
}

impl MapperConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration pre-populated with the defaults an administrator sees when first adding
    /// the mapper.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(PUBLIC_KEY_HEADER, DEFAULT_PUBLIC_KEY_HEADER)
            .with(CLAIM_NAME, DEFAULT_CLAIM_NAME)
            .with(INCLUDE_IN_ACCESS_TOKEN, "true")
            .with(INCLUDE_IN_ID_TOKEN, "true")
            .with(INCLUDE_IN_USERINFO, "true")
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.config.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|value| value.trim().parse().ok())
    }

    pub fn include_in(&self, token_type: TokenType) -> bool {
        let key = match token_type {
            TokenType::AccessToken => INCLUDE_IN_ACCESS_TOKEN,
            TokenType::IdToken => INCLUDE_IN_ID_TOKEN,
            TokenType::UserInfo => INCLUDE_IN_USERINFO,
        };
        self.get_bool(key).unwrap_or(true)
    }

    pub fn claim_name(&self) -> &str {
        self.get(CLAIM_NAME)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_CLAIM_NAME)
    }

    /// Name of the request header carrying the client public key. `None` disables the remote
    /// lookup entirely.
    pub fn public_key_header(&self) -> Option<&str> {
        self.get(PUBLIC_KEY_HEADER)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.get(REMOTE_URL)
    }

    pub fn remote_headers(&self) -> Option<&str> {
        self.get(REMOTE_HEADERS)
    }

    pub fn remote_parameters(&self) -> Option<&str> {
        self.get(REMOTE_PARAMETERS)
    }

    pub fn send_username(&self) -> bool {
        self.get_bool(REMOTE_PARAMETERS_USERNAME).unwrap_or(false)
    }

    pub fn send_client_id(&self) -> bool {
        self.get_bool(REMOTE_PARAMETERS_CLIENTID).unwrap_or(false)
    }

    pub fn profile(&self) -> RequestProfile {
        parse_or_default(self.get(REMOTE_PROFILE), REMOTE_PROFILE)
    }

    pub fn claim_request_type(&self) -> ClaimRequestType {
        parse_or_default(self.get(CLAIM_REQUEST_TYPE), CLAIM_REQUEST_TYPE)
    }

    pub fn timeout(&self) -> Duration {
        self.get(REMOTE_TIMEOUT_MS)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

fn parse_or_default<T>(value: Option<&str>, key: &str) -> T
where
    T: FromStr + Default,
{
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value, "Unrecognized mapper setting, using the default");
            T::default()
        }),
        None => T::default(),
    }
}

/// Snapshot of the process environment values the mapper falls back on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub attribute_provider_url: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            attribute_provider_url: std::env::var(ATTRIBUTE_PROVIDER_URL_ENV).ok(),
        }
    }

    pub fn with_attribute_provider_url(url: impl Into<String>) -> Self {
        Self {
            attribute_provider_url: Some(url.into()),
        }
    }
}

/// Pick the endpoint to call: the mapper's own URL if set, otherwise the environment default.
pub fn resolve_endpoint(
    configured: Option<&str>,
    environment: &Environment,
) -> Result<Url, ConfigurationError> {
    let url = configured
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .or_else(|| {
            environment
                .attribute_provider_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
        })
        .ok_or(ConfigurationError::MissingEndpoint)?;

    Url::parse(url).map_err(|err| ConfigurationError::InvalidEndpoint {
        url: url.to_string(),
        reason: err.to_string(),
    })
}
