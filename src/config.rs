use std::path::Path;

use serde::{Deserialize, Serialize};

use empower_e2e_core::config::{LoggingConfig, RetryConfig};

use crate::{network::NetworkConfig, suite::SuiteConfig};

pub const ENV_PREFIX: &str = "EMPOWER_E2E";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub network: NetworkConfig,
    pub suite: SuiteConfig,
    pub retries: RetryConfig,
    pub logging: LoggingConfig,
}

impl HarnessConfig {
    pub fn new(explicit_file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut s = config::Config::builder();

        // base config always lives in /etc/empower-e2e
        s = s.add_source(config::File::with_name("/etc/empower-e2e/harness.toml").required(false));

        // a file in the working dir overrides it
        s = s.add_source(config::File::with_name("empower-e2e.toml").required(false));

        // an explicit file is mandatory
        if let Some(explicit) = explicit_file.and_then(|x| x.to_str()) {
            s = s.add_source(config::File::with_name(explicit).required(true));
        }

        // env vars go last, e.g. EMPOWER_E2E_NETWORK__NUM_VALIDATORS=4
        s = s.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        s.build()?.try_deserialize()
    }
}
