// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::{config::MapperConfiguration, session::SessionContext};

// Base64 of the "-----" that opens every PEM block
static PEM_BASE64_PREFIX: &str = "LS0";

// Clients may or may not pad the encoded key
const PEM_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Read the client public key from the header named in the mapper configuration.
///
/// Returns `None` when no header is configured or the request does not carry it.
pub fn client_public_key(
    config: &MapperConfiguration,
    session: &dyn SessionContext,
) -> Option<String> {
    let header = config.public_key_header()?;
    let value = session
        .header(header)
        .filter(|value| !value.trim().is_empty())?;
    Some(normalize_public_key(&value))
}

/// Base64-encoded PEM blocks are decoded back to PEM text; anything else passes through.
pub fn normalize_public_key(value: &str) -> String {
    let value = value.trim();
    if !value.starts_with(PEM_BASE64_PREFIX) {
        return value.to_string();
    }

    match PEM_ENGINE
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    {
        Some(pem) => pem,
        None => {
            tracing::warn!("Client public key looks base64 encoded but does not decode");
            value.to_string()
        }
    }
}
