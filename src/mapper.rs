// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    cache::{cached_claims, store_claims},
    config::MapperConfiguration,
    remote::{AttributeProviderClient, RemoteClaimError, RequestProfile},
    session::SessionContext,
};

/// Claims of the token being produced.
pub type TokenClaims = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    AccessToken,
    IdToken,
    UserInfo,
}

/// Protocol mapper placing attribute provider claims into issued tokens.
#[derive(Debug, Clone)]
pub struct AttributeClaimMapper {
    client: AttributeProviderClient,
}

impl AttributeClaimMapper {
    pub const PROVIDER_ID: &str = "virtru-oidc-protocolmapper";

    pub fn new(client: AttributeProviderClient) -> Self {
        Self { client }
    }

    pub async fn transform_access_token(
        &self,
        token: &mut TokenClaims,
        config: &MapperConfiguration,
        session: &dyn SessionContext,
    ) -> Result<(), RemoteClaimError> {
        self.transform(TokenType::AccessToken, token, config, session)
            .await
    }

    pub async fn transform_id_token(
        &self,
        token: &mut TokenClaims,
        config: &MapperConfiguration,
        session: &dyn SessionContext,
    ) -> Result<(), RemoteClaimError> {
        self.transform(TokenType::IdToken, token, config, session)
            .await
    }

    pub async fn transform_userinfo(
        &self,
        token: &mut TokenClaims,
        config: &MapperConfiguration,
        session: &dyn SessionContext,
    ) -> Result<(), RemoteClaimError> {
        self.transform(TokenType::UserInfo, token, config, session)
            .await
    }

    /// Add the remote claims to `token`. On error the token must not be issued.
    pub async fn transform(
        &self,
        token_type: TokenType,
        token: &mut TokenClaims,
        config: &MapperConfiguration,
        session: &dyn SessionContext,
    ) -> Result<(), RemoteClaimError> {
        if !config.include_in(token_type) {
            return Ok(());
        }
        tracing::info!(?token_type, "Custom claims mapper triggered");

        // Downstream consumers key their dissemination lists off the subject
        let subject = match config.profile() {
            RequestProfile::Entity => session.principal_id(),
            RequestProfile::Legacy => session.login_username(),
        };
        token.insert("sub".to_string(), subject.into());

        let claims = match cached_claims(session) {
            Some(claims) if token_type != TokenType::UserInfo => {
                tracing::debug!(%claims, "Remote claims already cached, not refreshing");
                claims
            }
            _ => {
                tracing::debug!("Getting remote authorizations");
                let claims = self
                    .client
                    .fetch_claims(config, session, token_type, token)
                    .await?;
                store_claims(session, claims.as_ref());
                claims.unwrap_or(Value::Null)
            }
        };

        if !claims.is_null() {
            map_claim(token, config.claim_name(), claims);
        }

        Ok(())
    }
}

/// Place `value` at `claim_name`, where unescaped `.` separates nested objects and `\.` is a
/// literal dot.
pub fn map_claim(token: &mut TokenClaims, claim_name: &str, value: Value) {
    let path = split_claim_path(claim_name);
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = token;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        current = map;
    }
    current.insert(last.clone(), value);
}

fn split_claim_path(claim_name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut segment = String::new();
    let mut chars = claim_name.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                segment.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut segment)),
            c => segment.push(c),
        }
    }
    segments.push(segment);

    segments
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_map_flat_claim() {
        let mut token = TokenClaims::new();
        map_claim(&mut token, "tdf_claims", json!({"a": 1}));
        assert_eq!(Value::Object(token), json!({"tdf_claims": {"a": 1}}));
    }

    #[test]
    fn test_map_nested_claim() {
        let mut token = TokenClaims::new();
        token.insert("attrs".into(), json!({"existing": true}));
        map_claim(&mut token, "attrs.tdf.claims", json!([1, 2]));
        assert_eq!(
            Value::Object(token),
            json!({"attrs": {"existing": true, "tdf": {"claims": [1, 2]}}})
        );
    }

    #[test]
    fn test_map_escaped_dots() {
        let mut token = TokenClaims::new();
        map_claim(&mut token, r"http://www\.virtru\.com/tdf_claims", json!("x"));
        assert_eq!(
            Value::Object(token),
            json!({"http://www.virtru.com/tdf_claims": "x"})
        );
    }

    #[test]
    fn test_map_replaces_scalar_parent() {
        let mut token = TokenClaims::new();
        token.insert("attrs".into(), json!("scalar"));
        map_claim(&mut token, "attrs.inner", json!(1));
        assert_eq!(Value::Object(token), json!({"attrs": {"inner": 1}}));
    }

    #[test]
    fn test_split_claim_path() {
        assert_eq!(split_claim_path("a"), vec!["a"]);
        assert_eq!(split_claim_path("a.b"), vec!["a", "b"]);
        assert_eq!(split_claim_path(r"a\.b.c"), vec!["a.b", "c"]);
    }
}
