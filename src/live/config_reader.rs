use std::fs;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::live::*;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 90;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_KEY: &str = "election_data_local_backup";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStoreSettings {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    pub collection: String,
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl RemoteStoreSettings {
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.collection)
    }

    pub fn document_url(&self) -> String {
        format!("{}/{}", self.collection_url(), self.document_id)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheSettings {
    pub path: Option<String>,
    pub key: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(rename = "remoteStore")]
    pub remote_store: RemoteStoreSettings,
    #[serde(rename = "localCache")]
    pub local_cache: Option<LocalCacheSettings>,
    #[serde(rename = "refreshIntervalSecs")]
    pub refresh_interval_secs: Option<u64>,
    #[serde(rename = "adminUser")]
    pub admin_user: Option<String>,
    #[serde(rename = "adminPasswordSha256")]
    pub admin_password_sha256: Option<String>,
}

impl LiveConfig {
    pub fn refresh_interval(&self) -> LiveResult<Duration> {
        let secs = self
            .refresh_interval_secs
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        ensure!(secs > 0, InvalidRefreshIntervalSnafu {});
        if !(60..=120).contains(&secs) {
            warn!(
                "refresh_interval: {}s is outside of the usual 60-120s range",
                secs
            );
        }
        Ok(Duration::from_secs(secs))
    }

    /// The directory of the cache file, if the cache is kept on disk.
    pub fn cache_dir(&self) -> Option<String> {
        self.local_cache.as_ref().and_then(|lc| lc.path.clone())
    }

    pub fn cache_key(&self) -> String {
        self.local_cache
            .as_ref()
            .and_then(|lc| lc.key.clone())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_CACHE_KEY.to_string())
    }
}

pub fn parse_config(contents: &str, path: &str) -> LiveResult<LiveConfig> {
    let config: LiveConfig =
        serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    // Fail early rather than when the refresh task starts.
    config.refresh_interval()?;
    Ok(config)
}

pub fn read_config(path: &str) -> LiveResult<LiveConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config = parse_config(&contents, path)?;
    debug!("read_config: {:?}", config);
    Ok(config)
}
