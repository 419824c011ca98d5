// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{collections::HashMap, fmt::Display, str::FromStr, time::Duration};

use reqwest::{
    Client, StatusCode, Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
    redirect,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tap::TapFallible;
use thiserror::Error;
use tracing::instrument;

use crate::{
    config::{ConfigurationError, Environment, MapperConfiguration, resolve_endpoint},
    identity::IdentityParams,
    mapper::{TokenClaims, TokenType},
    pairs::parse_pairs,
    pubkey::client_public_key,
    session::SessionContext,
};

static SIGNER_ALGORITHM: &str = "ec:secp256r1";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Wrong status received for remote claim - Expected: 200, Received: {status}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("Failed to communicate with the attribute provider")]
    Transport(#[source] reqwest::Error),
    #[error("Attribute provider returned a body that is not JSON")]
    MalformedResponse(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    RemoteProvider,
    MalformedResponse,
}

/// Failure to obtain remote claims. Token issuance must be aborted when this is returned.
#[derive(Debug, Error)]
#[error("Error when accessing remote claim - Configured URL: {}", .url.as_deref().unwrap_or("<unresolved>"))]
pub struct RemoteClaimError {
    pub url: Option<String>,
    #[source]
    pub source: FetchError,
}

impl RemoteClaimError {
    fn new(url: Option<&Url>, source: impl Into<FetchError>) -> Self {
        Self {
            url: url.map(Url::to_string),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.source {
            FetchError::Configuration(_) => ErrorKind::Configuration,
            FetchError::UnexpectedStatus { .. } | FetchError::Transport(_) => {
                ErrorKind::RemoteProvider
            }
            FetchError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match &self.source {
            FetchError::UnexpectedStatus { status, .. } => Some(*status),
            FetchError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Shape of the request body sent to the attribute provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestProfile {
    /// `signerPublicKey`, `primary_entity_id` and `secondary_entity_ids`.
    #[default]
    Entity,
    /// `client_pk` and the token being built, with optional `username` and `client_id`.
    Legacy,
}

impl Display for RequestProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestProfile::Entity => f.write_str("entity"),
            RequestProfile::Legacy => f.write_str("legacy"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown request profile {0}")]
pub struct UnknownRequestProfile(String);

impl FromStr for RequestProfile {
    type Err = UnknownRequestProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity" => Ok(RequestProfile::Entity),
            "legacy" => Ok(RequestProfile::Legacy),
            other => Err(UnknownRequestProfile(other.to_string())),
        }
    }
}

/// JSON document posted to the attribute provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RemoteRequestEntity {
    fields: Map<String, Value>,
}

impl RemoteRequestEntity {
    /// Free-form parameters are laid down first so that the structured fields always take
    /// precedence over a colliding configured parameter. This includes `algorithm` and
    /// `signerPublicKey`, which older deployments could override through `remote.parameters`.
    pub fn new(
        profile: RequestProfile,
        public_key: &str,
        identity: &IdentityParams,
        parameters: HashMap<String, String>,
        config: &MapperConfiguration,
        token: &TokenClaims,
    ) -> Self {
        let mut fields: Map<String, Value> = parameters
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();

        match profile {
            RequestProfile::Entity => {
                fields.insert("algorithm".into(), SIGNER_ALGORITHM.into());
                fields.insert("signerPublicKey".into(), public_key.into());
                fields.insert(
                    "primary_entity_id".into(),
                    identity.primary_entity_id.clone().into(),
                );
                fields.insert(
                    "secondary_entity_ids".into(),
                    identity.secondary_entity_ids.clone().into(),
                );
            }
            RequestProfile::Legacy => {
                fields.insert("client_pk".into(), public_key.into());
                fields.insert("token".into(), Value::Object(token.clone()));
                if config.send_username() {
                    fields.insert("username".into(), identity.login_username.clone().into());
                }
                if config.send_client_id() {
                    fields.insert("client_id".into(), identity.client_ids.join(",").into());
                }
            }
        }
        fields.insert(
            "claim_request_type".into(),
            identity.claim_request_type.as_str().into(),
        );

        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// HTTP client for the remote attribute provider.
#[derive(Debug, Clone)]
pub struct AttributeProviderClient {
    client: Client,
    environment: Environment,
}

impl AttributeProviderClient {
    /// The provider must answer the POST itself, so redirects are never followed.
    pub fn new(environment: Environment) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self::with_client(client, environment))
    }

    pub fn with_client(client: Client, environment: Environment) -> Self {
        Self {
            client,
            environment,
        }
    }

    /// Fetch the claim document for this session from the attribute provider.
    ///
    /// Returns `Ok(None)` without contacting the provider when the client did not supply a public
    /// key. Otherwise exactly one request is made; anything but a `200` with a JSON body is an
    /// error.
    pub async fn fetch_claims(
        &self,
        config: &MapperConfiguration,
        session: &dyn SessionContext,
        token_type: TokenType,
        token: &TokenClaims,
    ) -> Result<Option<Value>, RemoteClaimError> {
        let Some(public_key) = client_public_key(config, session) else {
            tracing::warn!(
                subject = session.principal_id(),
                header = ?config.public_key_header(),
                "No client public key supplied, skipping remote claims"
            );
            return Ok(None);
        };
        tracing::debug!(%public_key, "Client public key");

        let endpoint = resolve_endpoint(config.remote_url(), &self.environment)
            .map_err(|err| RemoteClaimError::new(None, err))?;

        let identity = IdentityParams::build(session, config, token_type);
        let parameters = parse_pairs(config.remote_parameters());
        let headers = request_headers(parse_pairs(config.remote_headers()))
            .map_err(|err| RemoteClaimError::new(Some(&endpoint), err))?;
        let entity = RemoteRequestEntity::new(
            config.profile(),
            &public_key,
            &identity,
            parameters,
            config,
            token,
        );

        tracing::info!(
            subject = %identity.primary_entity_id,
            profile = %config.profile(),
            "Request attributes for subject"
        );

        self.post(&endpoint, headers, &entity, config.timeout())
            .await
            .map(Some)
            .map_err(|err| RemoteClaimError::new(Some(&endpoint), err))
    }

    #[instrument(skip(self, headers, entity), fields(url = %endpoint))]
    async fn post(
        &self,
        endpoint: &Url,
        headers: HeaderMap,
        entity: &RemoteRequestEntity,
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        let response = self
            .client
            .post(endpoint.clone())
            .headers(headers)
            .timeout(timeout)
            .json(entity)
            .send()
            .await
            .map_err(FetchError::Transport)
            .tap_err(|err| tracing::error!(?err, "Attribute provider request failed"))?;

        let status = response.status();
        let body = response.text().await.map_err(FetchError::Transport)?;

        if status != StatusCode::OK {
            tracing::warn!(%status, %body, "Attribute provider rejected the request");
            return Err(FetchError::UnexpectedStatus { status, body });
        }
        tracing::debug!(%body, "Attribute provider response");

        serde_json::from_str(&body)
            .map_err(FetchError::MalformedResponse)
            .tap_err(|err| tracing::error!(?err, "Failed to parse attribute provider response"))
    }
}

/// `Content-Type: application/json` plus the configured headers, which may replace it.
fn request_headers(configured: HashMap<String, String>) -> Result<HeaderMap, ConfigurationError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in configured {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigurationError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(&value).map_err(|_| ConfigurationError::InvalidHeader(name))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::{REMOTE_PARAMETERS_CLIENTID, REMOTE_PARAMETERS_USERNAME},
        identity::ClaimRequestType,
    };

    fn identity() -> IdentityParams {
        IdentityParams {
            primary_entity_id: "8f2c".to_string(),
            login_username: "alice@test.org".to_string(),
            secondary_entity_ids: vec!["id-a".to_string(), "id-b".to_string()],
            client_ids: vec!["web".to_string(), "cli".to_string()],
            claim_request_type: ClaimRequestType::FullClaims,
        }
    }

    #[test]
    fn test_entity_profile_body() {
        let entity = RemoteRequestEntity::new(
            RequestProfile::Entity,
            "12345",
            &identity(),
            HashMap::from([("scope".to_string(), "all".to_string())]),
            &MapperConfiguration::with_defaults(),
            &TokenClaims::new(),
        );
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({
                "algorithm": "ec:secp256r1",
                "signerPublicKey": "12345",
                "primary_entity_id": "8f2c",
                "secondary_entity_ids": ["id-a", "id-b"],
                "claim_request_type": "full_claims",
                "scope": "all",
            })
        );
    }

    #[test]
    fn test_legacy_profile_body() {
        let mut token = TokenClaims::new();
        token.insert("sub".into(), "alice@test.org".into());

        let config = MapperConfiguration::with_defaults()
            .with(REMOTE_PARAMETERS_USERNAME, "true")
            .with(REMOTE_PARAMETERS_CLIENTID, "true");
        let entity = RemoteRequestEntity::new(
            RequestProfile::Legacy,
            "12345",
            &identity(),
            HashMap::new(),
            &config,
            &token,
        );
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({
                "client_pk": "12345",
                "token": {"sub": "alice@test.org"},
                "username": "alice@test.org",
                "client_id": "web,cli",
                "claim_request_type": "full_claims",
            })
        );

        let entity = RemoteRequestEntity::new(
            RequestProfile::Legacy,
            "12345",
            &identity(),
            HashMap::new(),
            &MapperConfiguration::with_defaults(),
            &token,
        );
        assert_eq!(entity.get("username"), None);
        assert_eq!(entity.get("client_id"), None);
    }

    #[test]
    fn test_structured_fields_win_over_parameters() {
        let entity = RemoteRequestEntity::new(
            RequestProfile::Entity,
            "12345",
            &identity(),
            HashMap::from([
                ("primary_entity_id".to_string(), "mallory".to_string()),
                ("claim_request_type".to_string(), "min_claims".to_string()),
                ("signerPublicKey".to_string(), "other-key".to_string()),
                ("algorithm".to_string(), "rsa:2048".to_string()),
            ]),
            &MapperConfiguration::with_defaults(),
            &TokenClaims::new(),
        );
        assert_eq!(entity.get("primary_entity_id"), Some(&json!("8f2c")));
        assert_eq!(entity.get("claim_request_type"), Some(&json!("full_claims")));
        assert_eq!(entity.get("signerPublicKey"), Some(&json!("12345")));
        assert_eq!(entity.get("algorithm"), Some(&json!("ec:secp256r1")));
    }

    #[test]
    fn test_configured_headers_override_content_type() {
        let headers = request_headers(HashMap::from([
            ("Content-Type".to_string(), "application/vnd.claims+json".to_string()),
            ("Authorization".to_string(), "Bearer a=b".to_string()),
        ]))
        .unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/vnd.claims+json");
        assert_eq!(headers["authorization"], "Bearer a=b");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_invalid_header_name() {
        let err = request_headers(HashMap::from([("bad header".to_string(), "x".to_string())]))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidHeader(name) if name == "bad header"));
    }

    #[test]
    fn test_error_kinds() {
        let err = RemoteClaimError::new(None, ConfigurationError::MissingEndpoint);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.url, None);

        let url = Url::parse("http://provider.example/claims").unwrap();
        let err = RemoteClaimError::new(
            Some(&url),
            FetchError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::RemoteProvider);
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.to_string().contains("http://provider.example/claims"));

        let parse_err = serde_json::from_str::<Value>("not-json").unwrap_err();
        let err = RemoteClaimError::new(Some(&url), FetchError::MalformedResponse(parse_err));
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
