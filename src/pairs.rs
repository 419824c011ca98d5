// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

/// Parse a `key1=val1&key2=val2` configuration string into a map.
///
/// Each entry is split on its first `=` only, so values may themselves contain `=`. Entries
/// without any `=` are dropped. A missing or blank string yields an empty map.
pub fn parse_pairs(config: Option<&str>) -> HashMap<String, String> {
    let Some(config) = config.map(str::trim).filter(|config| !config.is_empty()) else {
        return HashMap::new();
    };

    config
        .split('&')
        .filter_map(|entry| entry.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
