//! National cloud endpoints and adapter settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Microsoft cloud the tenant lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphCloud {
    #[default]
    Global,
    UsGovernment,
    China,
}

impl GraphCloud {
    pub fn login_endpoint(&self) -> &'static str {
        match self {
            GraphCloud::Global => "https://login.microsoftonline.com",
            GraphCloud::UsGovernment => "https://login.microsoftonline.us",
            GraphCloud::China => "https://login.chinacloudapi.cn",
        }
    }

    pub fn graph_endpoint(&self) -> &'static str {
        match self {
            GraphCloud::Global => "https://graph.microsoft.com",
            GraphCloud::UsGovernment => "https://graph.microsoft.us",
            GraphCloud::China => "https://microsoftgraph.chinacloudapi.cn",
        }
    }
}

/// Graph adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSettings {
    #[serde(default)]
    pub cloud: GraphCloud,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Overrides the cloud's login endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_endpoint: Option<String>,

    /// Overrides the cloud's Graph endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_endpoint: Option<String>,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            cloud: GraphCloud::default(),
            api_version: default_api_version(),
            timeout_secs: default_timeout(),
            login_endpoint: None,
            graph_endpoint: None,
        }
    }
}

impl GraphSettings {
    pub fn login_endpoint(&self) -> &str {
        self.login_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.login_endpoint())
            .trim_end_matches('/')
    }

    pub fn graph_endpoint(&self) -> &str {
        self.graph_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.graph_endpoint())
            .trim_end_matches('/')
    }

    /// `{graph endpoint}/{api version}`
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.graph_endpoint(), self.api_version)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_version() -> String {
    "v1.0".to_string()
}

fn default_timeout() -> u64 {
    30
}
