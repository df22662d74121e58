//! Controller configuration
//!
//! Every flag has an environment variable fallback so the controller can be
//! configured from a Deployment manifest without overriding its command.

use std::collections::HashSet;
use std::time::Duration;

use clap::Args;

use crate::controller::DEFAULT_CONTROLLER_NAME;
use crate::session::ServiceEndpoint;
use crate::telemetry::LogFormat;
use crate::Error;

/// Runtime configuration of the controller
#[derive(Args, Clone, Debug)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Name the controller reports in logs and scopes
    #[arg(long, env = "CONTROLLER_NAME", default_value = DEFAULT_CONTROLLER_NAME)]
    pub controller_name: String,

    /// Timeout for a single API server call, in seconds
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 30)]
    pub store_timeout_secs: u64,

    /// Service endpoint override, `service=url[@signing-region]`; repeatable
    #[arg(long = "endpoint", env = "AWS_ENDPOINTS", value_delimiter = ',')]
    pub endpoints: Vec<ServiceEndpoint>,

    /// Log line format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Store call timeout
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Reject settings clap cannot check on its own
    pub fn validate(&self) -> Result<(), Error> {
        if self.store_timeout_secs == 0 {
            return Err(Error::configuration(
                "controller",
                "store timeout must be at least one second",
            ));
        }
        if self.controller_name.trim().is_empty() {
            return Err(Error::configuration("controller", "controller name is empty"));
        }
        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint.service_id.as_str()) {
                return Err(Error::configuration(
                    "controller",
                    format!("duplicate endpoint override for {}", endpoint.service_id),
                ));
            }
        }
        Ok(())
    }
}
