// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde_json::Value;

use crate::session::SessionContext;

/// Session attribute holding the claims retrieved for the current token-issuance context.
pub static REMOTE_AUTHORIZATION_ATTR: &str = "remote-authorizations";

/// Claims previously cached on the session.
///
/// `Some(Value::Null)` records that a lookup already happened and produced no claims, which is
/// distinct from `None` (no lookup yet).
pub fn cached_claims(session: &dyn SessionContext) -> Option<Value> {
    session.attribute(REMOTE_AUTHORIZATION_ATTR)
}

pub fn store_claims(session: &dyn SessionContext, claims: Option<&Value>) {
    session.set_attribute(
        REMOTE_AUTHORIZATION_ATTR,
        claims.cloned().unwrap_or(Value::Null),
    );
}
