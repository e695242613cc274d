#![no_std]
#![allow(async_fn_in_trait)]

//! Spool record decoding, catalog identity resolution and weight updates for
//! the inventory service, plus the cycle that ties them to a tag read.

extern crate alloc;
#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

mod config;
mod cycle;
mod http;
mod identity;
mod record;
mod tag;
mod weight;

#[cfg(test)]
mod mock;

pub use config::{DEFAULT_BASE_URL, SyncConfig};
pub use cycle::{CycleError, CycleReport, Indicator, Outcome, Scale, SyncEngine};
pub use http::{HTTP_OK, HttpClient, HttpResponse, Method, TransportError};
pub use identity::{
    CatalogEntry, RemoteError, ResolveError, SpoolUuid, fetch_catalog, find_in_catalog,
    parse_catalog, resolve,
};
pub use record::{
    DecodeStatus, OPENSPOOL_PROTOCOL, OPENSPOOL_VERSION, ParseError, SpoolRecord,
    decode_remote_spool, decode_tag_json, retrieve_spool,
};
pub use tag::{TagJson, read_tag_json};
pub use weight::{SyncStatus, submit};
