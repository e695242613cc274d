//! Catalog identity: the canonical spool UUID and the scan that maps it to a
//! catalog id.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SyncConfig;
use crate::http::{HttpClient, Method};
use crate::record::{DecodeStatus, ParseError, SpoolRecord};

/// Globally unique spool identity, independent of the inventory service.
///
/// The service stores it as a JSON-encoded string inside `extra`, so values
/// arrive wrapped in literal quotes; quotes are removed here and nowhere else.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SpoolUuid(String);

impl SpoolUuid {
    /// `None` when nothing but quotes (or nothing at all) is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw.chars().filter(|&c| c != '"').collect();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Fresh UUIDv4 from caller-supplied entropy.
    pub fn generate(random: [u8; 16]) -> Self {
        let uuid = uuid::Builder::from_random_bytes(random).into_uuid();
        Self(uuid.hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpoolUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub catalog_id: u32,
    pub identity: Option<SpoolUuid>,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteError {
    Transport(crate::http::TransportError),
    Rejected(u16),
    Malformed(ParseError),
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The record carries neither a catalog id nor a UUID.
    NoIdentity,
    /// The full catalog was scanned without a match.
    NotFound,
    Remote(RemoteError),
}

impl From<RemoteError> for ResolveError {
    fn from(err: RemoteError) -> Self {
        ResolveError::Remote(err)
    }
}

// Only `id` and `extra` are materialized; every other field of the service's
// spool objects is skipped by the deserializer. `id` stays a raw value so one
// odd row cannot fail the whole listing.
#[derive(Deserialize)]
struct CatalogRow {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    extra: Option<CatalogExtra>,
}

#[derive(Deserialize)]
struct CatalogExtra {
    #[serde(default)]
    serial_number: Option<Value>,
}

/// Decode the service's spool list into `(id, identity)` pairs.
///
/// Rows whose id is missing, zero or not a `u32` are dropped.
pub fn parse_catalog(body: &[u8]) -> Result<Vec<CatalogEntry>, ParseError> {
    let rows: Vec<CatalogRow> = serde_json::from_slice(body).map_err(ParseError::from)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let catalog_id = row
                .id
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .filter(|&id| id != 0)?;
            let identity = row
                .extra
                .and_then(|extra| extra.serial_number)
                .and_then(|sn| sn.as_str().and_then(SpoolUuid::parse));
            Some(CatalogEntry {
                catalog_id,
                identity,
            })
        })
        .collect())
}

/// First entry with an assigned id whose identity equals `uuid`.
pub fn find_in_catalog(entries: &[CatalogEntry], uuid: &SpoolUuid) -> Option<u32> {
    entries
        .iter()
        .filter(|entry| entry.catalog_id != 0)
        .filter_map(|entry| entry.identity.as_ref().map(|id| (entry.catalog_id, id)))
        .find(|(_, id)| *id == uuid)
        .map(|(catalog_id, _)| catalog_id)
}

/// Fetch the catalog listing.
pub async fn fetch_catalog<H: HttpClient>(
    http: &mut H,
    config: &SyncConfig,
) -> Result<Vec<CatalogEntry>, RemoteError> {
    let url = config.spool_list_url();
    debug!("catalog fetch: {}", url.as_str());
    let resp = http
        .request(Method::Get, &url, None)
        .await
        .map_err(RemoteError::Transport)?;
    if !resp.is_ok() {
        return Err(RemoteError::Rejected(resp.status));
    }
    parse_catalog(&resp.body).map_err(RemoteError::Malformed)
}

/// Decide the record's catalog id, scanning the remote catalog when the tag
/// only carries a UUID. Nothing is cached between calls.
pub async fn resolve<H: HttpClient>(
    http: &mut H,
    config: &SyncConfig,
    record: &SpoolRecord,
) -> Result<u32, ResolveError> {
    match record.decode_status {
        DecodeStatus::Resolved => Ok(record.catalog_id),
        DecodeStatus::Invalid => Err(ResolveError::NoIdentity),
        DecodeStatus::NeedsResolution => {
            let uuid = record
                .external_uuid
                .as_ref()
                .ok_or(ResolveError::NoIdentity)?;
            let entries = fetch_catalog(http, config).await?;
            match find_in_catalog(&entries, uuid) {
                Some(catalog_id) => {
                    info!("uuid {} resolved to spool {}", uuid.as_str(), catalog_id);
                    Ok(catalog_id)
                }
                None => {
                    warn!(
                        "uuid {} not in catalog ({} entries)",
                        uuid.as_str(),
                        entries.len()
                    );
                    Err(ResolveError::NotFound)
                }
            }
        }
    }
}
