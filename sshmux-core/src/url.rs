// Copyright 2026 The sshmux Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Produces the observer endpoint URL for a session name, a
//! collaborator-facing helper for `getObserverUrl`.

use crate::config::Config;

/// Builds `http://<observer_host>:<observer_port>/session/<name>`, per
/// the configured observer-socket side channel.
pub fn observer_url(config: &Config, session_name: &str) -> String {
    format!("http://{}:{}/session/{}", config.observer_host, config.observer_port, session_name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_expected_shape() {
        let config = Config::default();
        let url = observer_url(&config, "my-session");
        assert_eq!(url, "http://localhost:9000/session/my-session");
    }
}
