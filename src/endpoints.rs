// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use dropshot::{HttpError, HttpResponseOk, RequestContext, TypedBody, endpoint};
use serde_json::Value;
use tap::TapFallible;

use crate::{
    context::Context,
    provider::{ClaimsRequest, build_claims},
};

/// Return entity attribute claims for the principal described in the body.
#[endpoint {
    path = "/",
    method = POST,
}]
pub async fn claims(
    rqctx: RequestContext<Context>,
    body: TypedBody<ClaimsRequest>,
) -> Result<HttpResponseOk<Value>, HttpError> {
    let ctx = rqctx.context();
    let request = body.into_inner();

    tracing::info!(
        primary_entity_id = ?request.primary_entity_id,
        secondary_entity_ids = ?request.secondary_entity_ids,
        claim_request_type = ?request.claim_request_type,
        "Claims requested"
    );

    let claims = build_claims(&ctx.provider, &request)
        .tap_err(|err| {
            tracing::info!(?err, "Rejecting claims request");
        })
        .map_err(|err| HttpError::for_bad_request(None, err.to_string()))?;

    Ok(HttpResponseOk(claims))
}
