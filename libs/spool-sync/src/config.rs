use alloc::format;
use alloc::string::String;

use opentag_tag_codec::EnvelopeConfig;

/// Inventory service API root used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://spoolman.local:7912/api/v1";

#[derive(Clone, Debug, PartialEq)]
pub struct SyncConfig {
    /// API root, e.g. `http://10.0.1.50:8000/api/v1/` (trailing slash optional).
    pub base_url: String,
    pub envelope: EnvelopeConfig,
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            envelope: EnvelopeConfig::default(),
        }
    }

    fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `GET` target listing every spool in the catalog.
    pub fn spool_list_url(&self) -> String {
        format!("{}/spool", self.root())
    }

    pub fn spool_url(&self, catalog_id: u32) -> String {
        format!("{}/spool/{}", self.root(), catalog_id)
    }

    /// `PUT` target taking the gross weight currently on the scale.
    pub fn measure_url(&self, catalog_id: u32) -> String {
        format!("{}/spool/{}/measure", self.root(), catalog_id)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
