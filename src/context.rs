// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::settings::{ProviderSettings, Settings};

#[derive(Debug)]
pub struct Context {
    pub provider: ProviderSettings,
}

impl Context {
    pub fn new(settings: &Settings) -> Self {
        Self {
            provider: settings.provider.clone(),
        }
    }
}
