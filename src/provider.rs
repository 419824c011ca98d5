// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::{identity::ClaimRequestType, settings::ProviderSettings};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Client public key is not valid base64")]
    InvalidKeyEncoding(#[source] base64::DecodeError),
    #[error("Client public key is not valid UTF-8")]
    InvalidKeyText(#[source] std::string::FromUtf8Error),
}

/// Body posted by the claims mapper, in either request profile.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ClaimsRequest {
    #[serde(rename = "signerPublicKey")]
    pub signer_public_key: Option<String>,
    pub client_pk: Option<String>,
    pub claim_request_type: Option<ClaimRequestType>,
    pub primary_entity_id: Option<String>,
    #[serde(default)]
    pub secondary_entity_ids: Vec<String>,
}

/// Assemble the claims returned for a mapper request.
///
/// Without a public key the answer is an empty object, which amounts to access denied. With one,
/// the proof-of-possession claims are always present and subject attributes are added when the
/// full claim set is requested.
pub fn build_claims(
    settings: &ProviderSettings,
    request: &ClaimsRequest,
) -> Result<Value, ProviderError> {
    let public_key = match (&request.signer_public_key, &request.client_pk) {
        (Some(key), _) => key.clone(),
        (None, Some(encoded)) => decode_client_key(encoded)?,
        (None, None) => {
            tracing::debug!("No client public key in request, returning no claims");
            return Ok(Value::Object(Map::new()));
        }
    };

    let mut claims = Map::new();
    claims.insert("client_public_signing_key".into(), public_key.into());
    claims.insert(
        "tdf_spec_version".into(),
        settings.tdf_spec_version.clone().into(),
    );

    if request.claim_request_type == Some(ClaimRequestType::FullClaims) {
        tracing::debug!(
            primary_entity_id = ?request.primary_entity_id,
            "Appending full claims"
        );
        claims.insert(
            "subject_attributes".into(),
            settings
                .subject_attributes
                .iter()
                .map(|attribute| json!({ "attribute": attribute }))
                .collect(),
        );
    }

    Ok(Value::Object(claims))
}

// Not every encoder pads, so restore the padding before decoding
fn decode_client_key(encoded: &str) -> Result<String, ProviderError> {
    let encoded = encoded.trim();
    let padding = (4 - encoded.len() % 4) % 4;
    let padded = format!("{encoded}{}", "=".repeat(padding));
    let bytes = STANDARD
        .decode(padded)
        .map_err(ProviderError::InvalidKeyEncoding)?;
    String::from_utf8(bytes).map_err(ProviderError::InvalidKeyText)
}
