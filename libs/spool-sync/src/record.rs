//! Canonical spool record and its two JSON sources: the tag payload and the
//! inventory service's spool object.

use alloc::string::String;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::SyncConfig;
use crate::http::{HttpClient, Method};
use crate::identity::{RemoteError, SpoolUuid};

/// Value of `protocol` for records synthesized from the service.
pub const OPENSPOOL_PROTOCOL: &str = "openspool";
pub const OPENSPOOL_VERSION: f32 = 1.0;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DecodeStatus {
    /// A catalog id is embedded; no lookup needed.
    Resolved,
    /// Only a UUID is present; the catalog must be scanned.
    NeedsResolution,
    /// Neither identity is present; the record cannot be synchronized.
    Invalid,
}

impl DecodeStatus {
    pub fn classify(catalog_id: u32, external_uuid: Option<&SpoolUuid>) -> Self {
        if catalog_id != 0 {
            DecodeStatus::Resolved
        } else if external_uuid.is_some() {
            DecodeStatus::NeedsResolution
        } else {
            DecodeStatus::Invalid
        }
    }
}

/// Syntax error position reported by the JSON parser.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            line: err.line(),
            column: err.column(),
        }
    }
}

/// Built once per tag read or remote fetch and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpoolRecord {
    pub protocol: String,
    pub schema_version: f32,
    pub material_type: String,
    pub color: String,
    pub brand: String,
    pub min_temp: u16,
    pub max_temp: u16,
    pub k_factor: f32,
    pub external_uuid: Option<SpoolUuid>,
    pub catalog_id: u32,
    pub decode_status: DecodeStatus,
}

fn field<'a>(obj: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Value> {
    obj.and_then(|o| o.get(key))
}

fn str_field(obj: Option<&Map<String, Value>>, key: &str) -> String {
    field(obj, key)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_default()
}

fn f32_field(obj: Option<&Map<String, Value>>, key: &str) -> f32 {
    field(obj, key).and_then(Value::as_f64).unwrap_or(0.0) as f32
}

// Out-of-range numbers count as absent.
fn u16_field(obj: Option<&Map<String, Value>>, key: &str) -> u16 {
    field(obj, key)
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(0)
}

fn u32_field(obj: Option<&Map<String, Value>>, key: &str) -> u32 {
    field(obj, key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn object<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a Map<String, Value>> {
    value.and_then(|v| v.get(key)).and_then(Value::as_object)
}

/// Decode the JSON document stored on a tag.
///
/// Only malformed JSON is an error; missing or mistyped fields fall back to
/// zero/empty and feed into `decode_status`.
pub fn decode_tag_json(json: &[u8]) -> Result<SpoolRecord, ParseError> {
    let doc: Value = serde_json::from_slice(json)?;
    let obj = doc.as_object();

    let catalog_id = u32_field(obj, "spoolman_id");
    let external_uuid = field(obj, "UUID")
        .and_then(Value::as_str)
        .and_then(SpoolUuid::parse);

    Ok(SpoolRecord {
        protocol: str_field(obj, "protocol"),
        schema_version: f32_field(obj, "version"),
        material_type: str_field(obj, "type"),
        color: str_field(obj, "color_hex"),
        brand: str_field(obj, "brand"),
        min_temp: u16_field(obj, "min_temp"),
        max_temp: u16_field(obj, "max_temp"),
        k_factor: f32_field(obj, "k_factor"),
        decode_status: DecodeStatus::classify(catalog_id, external_uuid.as_ref()),
        external_uuid,
        catalog_id,
    })
}

/// Decode a spool object returned by the inventory service.
///
/// A serial number that is present but empty (`""` or `"\"\""`) is replaced
/// with a fresh UUID from `fresh_uuid`, which is only called in that case. A
/// spool without a serial number, or without an id, is `Invalid`.
pub fn decode_remote_spool(
    json: &[u8],
    fresh_uuid: impl FnOnce() -> [u8; 16],
) -> Result<SpoolRecord, ParseError> {
    let doc: Value = serde_json::from_slice(json)?;
    let root = doc.as_object();
    let filament = object(Some(&doc), "filament");
    let vendor = object(doc.get("filament"), "vendor");
    let extra = object(Some(&doc), "extra");

    let catalog_id = u32_field(root, "id");
    let extruder_temp = u16_field(filament, "settings_extruder_temp");
    let external_uuid = field(extra, "serial_number")
        .and_then(Value::as_str)
        .map(|raw| {
            SpoolUuid::parse(raw).unwrap_or_else(|| {
                let uuid = SpoolUuid::generate(fresh_uuid());
                info!("spool {} has an empty serial number, generated {}", catalog_id, uuid.as_str());
                uuid
            })
        });
    if external_uuid.is_none() {
        warn!("spool {} returned without a serial number", catalog_id);
    }

    Ok(SpoolRecord {
        protocol: String::from(OPENSPOOL_PROTOCOL),
        schema_version: OPENSPOOL_VERSION,
        material_type: str_field(filament, "material"),
        color: str_field(filament, "color_hex"),
        brand: str_field(vendor, "name"),
        min_temp: extruder_temp,
        max_temp: extruder_temp,
        k_factor: 0.0,
        decode_status: if catalog_id != 0 && external_uuid.is_some() {
            DecodeStatus::Resolved
        } else {
            DecodeStatus::Invalid
        },
        external_uuid,
        catalog_id,
    })
}

/// Fetch one spool from the service by catalog id.
pub async fn retrieve_spool<H: HttpClient>(
    http: &mut H,
    config: &SyncConfig,
    catalog_id: u32,
    fresh_uuid: impl FnOnce() -> [u8; 16],
) -> Result<SpoolRecord, RemoteError> {
    let url = config.spool_url(catalog_id);
    debug!("spool fetch: {}", url.as_str());
    let resp = http
        .request(Method::Get, &url, None)
        .await
        .map_err(RemoteError::Transport)?;
    if !resp.is_ok() {
        return Err(RemoteError::Rejected(resp.status));
    }
    decode_remote_spool(&resp.body, fresh_uuid).map_err(RemoteError::Malformed)
}
