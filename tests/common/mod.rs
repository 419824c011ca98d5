//! Shared fixtures for the claims mapper integration tests.

#![allow(dead_code)]

use entity_claims_mapper::{
    AttributeClaimMapper, AttributeProviderClient, DelegatedClient, Environment,
    MapperConfiguration, MemorySession,
    config::{CLAIM_NAME, PUBLIC_KEY_HEADER, REMOTE_URL},
};
use serde_json::{Value, json};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const PK_HEADER: &str = "testPK";
pub const USER_ID: &str = "2f9a54f6-8ad4-4d5c-b4e1-0f86ad6c2a11";
pub const USERNAME: &str = "alice@test.org";
pub const CLAIM: &str = "customAttrs";

/// Answers every request with the posted JSON body wrapped in `{"echo": ...}`.
pub struct EchoResponder;

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({ "echo": body }))
    }
}

pub fn mapper() -> AttributeClaimMapper {
    AttributeClaimMapper::new(AttributeProviderClient::new(Environment::default()).unwrap())
}

pub fn mapper_with_env(environment: Environment) -> AttributeClaimMapper {
    AttributeClaimMapper::new(AttributeProviderClient::new(environment).unwrap())
}

/// Mapper configuration pointed at the mock server's root.
pub fn config_for(server: &MockServer) -> MapperConfiguration {
    base_config().with(REMOTE_URL, format!("{}/", server.uri()))
}

pub fn base_config() -> MapperConfiguration {
    MapperConfiguration::with_defaults()
        .with(CLAIM_NAME, CLAIM)
        .with(PUBLIC_KEY_HEADER, PK_HEADER)
}

/// Session for alice, who came in through one client and presented `public_key`.
pub fn session(public_key: Option<&str>) -> MemorySession {
    let session =
        MemorySession::new(USER_ID, USERNAME).with_client(DelegatedClient::new("xxx-yyy", "web"));
    match public_key {
        Some(public_key) => session.with_header(PK_HEADER, public_key),
        None => session,
    }
}

pub async fn received(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}
