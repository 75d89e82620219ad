use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Connection parameters for the consensus layer node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClClientConfig {
    /// Label used in logs.
    pub name: String,
    /// Beacon REST API base URL, e.g. http://localhost:5052
    pub address: Url,
    /// Extra headers attached to every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}
