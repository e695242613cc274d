use serde::Serialize;

use crate::config::SyncConfig;
use crate::http::{HttpClient, Method};

/// Result of one measurement update.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    /// The service answered with something other than 200.
    Rejected(u16),
    /// The service could not be reached at all.
    TransportError,
}

impl SyncStatus {
    pub fn is_success(self) -> bool {
        self == SyncStatus::Success
    }
}

#[derive(Serialize)]
struct MeasureRequest {
    weight: u32,
}

/// Report the gross weight currently on the scale for `catalog_id`.
///
/// One request, no retries.
pub async fn submit<H: HttpClient>(
    http: &mut H,
    config: &SyncConfig,
    catalog_id: u32,
    weight_grams: u32,
) -> SyncStatus {
    let url = config.measure_url(catalog_id);
    let body = serde_json::to_vec(&MeasureRequest {
        weight: weight_grams,
    })
    .unwrap_or_default();

    match http.request(Method::Put, &url, Some(&body)).await {
        Ok(resp) if resp.is_ok() => {
            info!("spool {}: weight {} g accepted", catalog_id, weight_grams);
            SyncStatus::Success
        }
        Ok(resp) => {
            warn!("spool {}: weight update rejected ({})", catalog_id, resp.status);
            SyncStatus::Rejected(resp.status)
        }
        Err(err) => {
            warn!("spool {}: weight update failed: {:?}", catalog_id, err);
            SyncStatus::TransportError
        }
    }
}
