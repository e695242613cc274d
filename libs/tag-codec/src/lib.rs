#![no_std]
// The transport traits are implemented by the firmware and by host tools that
// drive them from a single task; `Send` bounds on the futures are not needed.
#![allow(async_fn_in_trait)]

//! Tag-side half of the spool pipeline: windowed reads over block-addressed
//! tag memory and the TLV/NDEF envelope that wraps the JSON spool record.

#[cfg(test)]
extern crate std;

mod block;
mod memory;
mod tlv;

pub use block::{BlockGeometry, BlockReader, MAX_TRANSFER_LEN, TagByteWindow, TagError, TagTransport};
pub use memory::{MemoryTag, MemoryTagError, crc_a};
pub use tlv::{
    DEFAULT_MAX_NULL_TLVS, EnvelopeConfig, EnvelopeError, JSON_MIME_TYPE, MAX_NDEF_PAYLOAD,
    NDEF_RECORD_HEADER_LEN, NdefEnvelope, TLV_AREA_START, TLV_EXTENDED_LENGTH, TLV_NDEF_MESSAGE,
    TLV_NULL, TLV_TERMINATOR, TlvHead, TlvRecord, decode_envelope, json_window, parse_tlv_head,
};
