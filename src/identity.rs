// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{collections::HashSet, fmt::Display, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::MapperConfiguration, mapper::TokenType, session::SessionContext};

/// How much of the claim set the attribute provider should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRequestType {
    #[default]
    FullClaims,
    MinClaims,
}

impl ClaimRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimRequestType::FullClaims => "full_claims",
            ClaimRequestType::MinClaims => "min_claims",
        }
    }
}

impl Display for ClaimRequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown claim request type {0}")]
pub struct UnknownClaimRequestType(String);

impl FromStr for ClaimRequestType {
    type Err = UnknownClaimRequestType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_claims" => Ok(ClaimRequestType::FullClaims),
            "min_claims" => Ok(ClaimRequestType::MinClaims),
            other => Err(UnknownClaimRequestType(other.to_string())),
        }
    }
}

/// Identity fields describing who claims are being requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityParams {
    pub primary_entity_id: String,
    pub login_username: String,
    /// Internal ids of every delegated client, deduplicated in discovery order.
    pub secondary_entity_ids: Vec<String>,
    /// OAuth client ids of every delegated client, deduplicated in discovery order.
    pub client_ids: Vec<String>,
    pub claim_request_type: ClaimRequestType,
}

impl IdentityParams {
    pub fn build(
        session: &dyn SessionContext,
        config: &MapperConfiguration,
        token_type: TokenType,
    ) -> Self {
        let clients = session.delegated_clients();
        let secondary_entity_ids = distinct(clients.iter().map(|client| client.id.as_str()));
        let client_ids = distinct(clients.iter().map(|client| client.client_id.as_str()));

        // User-info responses always carry the full claim set
        let claim_request_type = match token_type {
            TokenType::UserInfo => ClaimRequestType::FullClaims,
            TokenType::AccessToken | TokenType::IdToken => config.claim_request_type(),
        };

        tracing::debug!(
            primary_entity_id = session.principal_id(),
            ?secondary_entity_ids,
            %claim_request_type,
            "Built identity parameters"
        );

        Self {
            primary_entity_id: session.principal_id().to_string(),
            login_username: session.login_username().to_string(),
            secondary_entity_ids,
            client_ids,
            claim_request_type,
        }
    }
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
