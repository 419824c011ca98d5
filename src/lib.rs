// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Augments issued identity tokens with entity attribute claims fetched from a remote attribute
//! provider, caching the result on the token-issuance session.
//!
//! The library also carries a reference attribute provider service (see the `attribute-provider`
//! binary) that answers the mapper's requests.

pub mod cache;
pub mod config;
pub mod context;
pub mod endpoints;
pub mod identity;
pub mod mapper;
pub mod pairs;
pub mod provider;
pub mod pubkey;
pub mod remote;
pub mod server;
pub mod session;
pub mod settings;

pub use config::{Environment, MapperConfiguration};
pub use mapper::{AttributeClaimMapper, TokenClaims, TokenType};
pub use remote::{AttributeProviderClient, ErrorKind, RemoteClaimError};
pub use session::{DelegatedClient, MemorySession, SessionContext};
