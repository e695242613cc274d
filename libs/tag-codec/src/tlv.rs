use crate::block::{BlockGeometry, BlockReader, TagByteWindow, TagError, TagTransport};

pub const TLV_NULL: u8 = 0x00;
pub const TLV_NDEF_MESSAGE: u8 = 0x03;
pub const TLV_TERMINATOR: u8 = 0xFE;
/// Length byte announcing a 3-byte length field (marker + u16 big-endian).
pub const TLV_EXTENDED_LENGTH: u8 = 0xFF;

/// First byte after the capability container / lock area on NTAG21x.
pub const TLV_AREA_START: usize = 16;
/// Largest user data area of the supported tags (NTAG216).
pub const MAX_NDEF_PAYLOAD: usize = 889;
pub const DEFAULT_MAX_NULL_TLVS: u8 = 8;

/// Short MIME record header: flags/TNF, type length, payload length.
pub const NDEF_RECORD_HEADER_LEN: usize = 3;
pub const JSON_MIME_TYPE: &[u8; 16] = b"application/json";

const TLV_HEAD_PEEK: usize = 4;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeError {
    Tag(TagError),
    UnsupportedTlv { tag: u8, at: usize },
    TooManyNullTlvs,
    /// Declared TLV length cannot hold the NDEF record header.
    LengthTooShort(u16),
    /// Record payload is non-empty but shorter than the MIME type prefix.
    MissingMimePrefix(u16),
    PayloadTooLarge(u16),
}

impl From<TagError> for EnvelopeError {
    fn from(err: TagError) -> Self {
        EnvelopeError::Tag(err)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlvRecord {
    pub tag: u8,
    pub declared_length: u16,
    /// 2 for the short form, 4 for the extended form.
    pub header_len: usize,
    pub value: TagByteWindow,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlvHead {
    Null,
    Ndef(TlvRecord),
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopeConfig {
    pub geometry: BlockGeometry,
    pub start_offset: usize,
    pub max_null_tlvs: u8,
    pub max_payload_len: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            geometry: BlockGeometry::NTAG21X,
            start_offset: TLV_AREA_START,
            max_null_tlvs: DEFAULT_MAX_NULL_TLVS,
            max_payload_len: MAX_NDEF_PAYLOAD,
        }
    }
}

/// Where the pieces of the NDEF message live on the tag.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NdefEnvelope {
    pub tlv: TlvRecord,
    /// Record payload after the record header (MIME type + JSON).
    pub payload: TagByteWindow,
    /// JSON document with the MIME type already stripped.
    pub json: TagByteWindow,
}

/// Interpret the bytes found at `at` as the start of a TLV.
pub fn parse_tlv_head(at: usize, head: &[u8; 4]) -> Result<TlvHead, EnvelopeError> {
    match head[0] {
        TLV_NULL => Ok(TlvHead::Null),
        TLV_NDEF_MESSAGE => {
            let (declared_length, header_len) = if head[1] == TLV_EXTENDED_LENGTH {
                (u16::from_be_bytes([head[2], head[3]]), 4)
            } else {
                (head[1] as u16, 2)
            };
            Ok(TlvHead::Ndef(TlvRecord {
                tag: TLV_NDEF_MESSAGE,
                declared_length,
                header_len,
                value: TagByteWindow::new(at + header_len, declared_length as usize),
            }))
        }
        tag => Err(EnvelopeError::UnsupportedTlv { tag, at }),
    }
}

/// Skip the record header and MIME type, leaving the JSON span.
///
/// An empty record payload is accepted and yields an empty span.
pub fn json_window(tlv: &TlvRecord) -> Result<(TagByteWindow, TagByteWindow), EnvelopeError> {
    let payload = tlv
        .value
        .skip(NDEF_RECORD_HEADER_LEN)
        .ok_or(EnvelopeError::LengthTooShort(tlv.declared_length))?;
    if payload.is_empty() {
        return Ok((payload, payload));
    }
    let json = payload
        .skip(JSON_MIME_TYPE.len())
        .ok_or(EnvelopeError::MissingMimePrefix(payload.len as u16))?;
    Ok((payload, json))
}

/// Locate the NDEF message TLV and return the window of its JSON payload.
pub async fn decode_envelope<T: TagTransport>(
    reader: &mut BlockReader<'_, T>,
    config: &EnvelopeConfig,
) -> Result<NdefEnvelope, EnvelopeError> {
    let mut at = config.start_offset;

    for _ in 0..=config.max_null_tlvs {
        let mut head = [0u8; TLV_HEAD_PEEK];
        reader
            .read(TagByteWindow::new(at, TLV_HEAD_PEEK), &mut head)
            .await?;

        let tlv = match parse_tlv_head(at, &head)? {
            TlvHead::Null => {
                at += 1;
                continue;
            }
            TlvHead::Ndef(tlv) => tlv,
        };

        if tlv.declared_length as usize > config.max_payload_len {
            return Err(EnvelopeError::PayloadTooLarge(tlv.declared_length));
        }
        let (payload, json) = json_window(&tlv)?;
        return Ok(NdefEnvelope { tlv, payload, json });
    }

    Err(EnvelopeError::TooManyNullTlvs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTag;
    use embassy_futures::block_on;
    use proptest::prelude::*;
    use std::vec::Vec;

    /// Capability container + lock bytes, then `tlvs`, zero padded.
    fn tag_image(tlvs: &[u8]) -> Vec<u8> {
        let mut image = Vec::from([0u8; TLV_AREA_START]);
        image[12..16].copy_from_slice(&[0xE1, 0x10, 0x6D, 0x00]);
        image.extend_from_slice(tlvs);
        image.resize(image.len().max(64) + 16, 0);
        image
    }

    fn ndef_json(json: &[u8], extended: bool) -> Vec<u8> {
        let payload_len = JSON_MIME_TYPE.len() + json.len();
        let record_len = NDEF_RECORD_HEADER_LEN + payload_len;
        let mut out = Vec::new();
        out.push(TLV_NDEF_MESSAGE);
        if extended {
            out.push(TLV_EXTENDED_LENGTH);
            out.extend_from_slice(&(record_len as u16).to_be_bytes());
        } else {
            out.push(record_len as u8);
        }
        out.extend_from_slice(&[0xD2, JSON_MIME_TYPE.len() as u8, json.len() as u8]);
        out.extend_from_slice(JSON_MIME_TYPE);
        out.extend_from_slice(json);
        out.push(TLV_TERMINATOR);
        out
    }

    fn decode(image: &[u8]) -> Result<NdefEnvelope, EnvelopeError> {
        let mut tag = MemoryTag::new(image);
        let mut reader = BlockReader::new(&mut tag, BlockGeometry::NTAG21X);
        block_on(decode_envelope(&mut reader, &EnvelopeConfig::default()))
    }

    fn read_json(image: &[u8], env: &NdefEnvelope) -> Vec<u8> {
        image[env.json.start..env.json.end()].to_vec()
    }

    #[test]
    fn short_form_ndef_exposes_json() {
        let json = br#"{"spoolman_id":42}"#;
        let image = tag_image(&ndef_json(json, false));
        let env = decode(&image).unwrap();
        assert_eq!(env.tlv.header_len, 2);
        assert_eq!(env.tlv.declared_length as usize, 3 + 16 + json.len());
        assert_eq!(env.json.start, TLV_AREA_START + 2 + 3 + 16);
        assert_eq!(read_json(&image, &env), json);
    }

    #[test]
    fn extended_form_ndef_exposes_json() {
        let json = [b' '; 300];
        let image = tag_image(&ndef_json(&json, true));
        let env = decode(&image).unwrap();
        assert_eq!(env.tlv.header_len, 4);
        assert_eq!(env.tlv.declared_length, 319);
        assert_eq!(env.json.len, 300);
        assert_eq!(env.json.start, TLV_AREA_START + 4 + 3 + 16);
    }

    #[test]
    fn null_tlvs_are_skipped() {
        let mut tlvs = Vec::from([TLV_NULL; 3]);
        tlvs.extend_from_slice(&ndef_json(b"{}", false));
        let image = tag_image(&tlvs);
        let env = decode(&image).unwrap();
        assert_eq!(env.tlv.value.start, TLV_AREA_START + 3 + 2);
        assert_eq!(read_json(&image, &env), b"{}");
    }

    #[test]
    fn endless_null_tlvs_are_bounded() {
        let image = tag_image(&[TLV_NULL; 32]);
        assert_eq!(decode(&image).unwrap_err(), EnvelopeError::TooManyNullTlvs);
    }

    #[test]
    fn null_tlv_limit_is_inclusive() {
        let nulls = DEFAULT_MAX_NULL_TLVS as usize;

        let mut tlvs = std::vec![TLV_NULL; nulls];
        tlvs.extend_from_slice(&ndef_json(b"{}", false));
        let image = tag_image(&tlvs);
        let env = decode(&image).unwrap();
        assert_eq!(env.tlv.value.start, TLV_AREA_START + nulls + 2);

        let mut tlvs = std::vec![TLV_NULL; nulls + 1];
        tlvs.extend_from_slice(&ndef_json(b"{}", false));
        let image = tag_image(&tlvs);
        assert_eq!(decode(&image).unwrap_err(), EnvelopeError::TooManyNullTlvs);

        let mut tag = MemoryTag::new(&image[..]);
        let mut reader = BlockReader::new(&mut tag, BlockGeometry::NTAG21X);
        let config = EnvelopeConfig {
            max_null_tlvs: 9,
            ..EnvelopeConfig::default()
        };
        assert!(block_on(decode_envelope(&mut reader, &config)).is_ok());
    }

    #[test]
    fn unsupported_tlv_is_fatal() {
        let image = tag_image(&[0x05, 0x02, 0x00, 0x00]);
        assert_eq!(
            decode(&image).unwrap_err(),
            EnvelopeError::UnsupportedTlv {
                tag: 0x05,
                at: TLV_AREA_START
            }
        );
        let image = tag_image(&[TLV_TERMINATOR]);
        assert!(matches!(
            decode(&image).unwrap_err(),
            EnvelopeError::UnsupportedTlv { tag: TLV_TERMINATOR, .. }
        ));
    }

    #[test]
    fn extended_length_below_record_header_fails() {
        let image = tag_image(&[TLV_NDEF_MESSAGE, TLV_EXTENDED_LENGTH, 0x00, 0x02]);
        assert_eq!(decode(&image).unwrap_err(), EnvelopeError::LengthTooShort(2));
    }

    #[test]
    fn empty_record_payload_yields_empty_json() {
        let image = tag_image(&[TLV_NDEF_MESSAGE, 0x03, 0xD2, 0x00, 0x00]);
        let env = decode(&image).unwrap();
        assert!(env.json.is_empty());
    }

    #[test]
    fn payload_shorter_than_mime_type_fails() {
        let image = tag_image(&[TLV_NDEF_MESSAGE, 0x08, 0xD2, 0x10, 0x00, b'a', b'p', b'p']);
        assert_eq!(decode(&image).unwrap_err(), EnvelopeError::MissingMimePrefix(5));
    }

    #[test]
    fn oversized_declaration_is_rejected_before_payload_read() {
        let image = tag_image(&[TLV_NDEF_MESSAGE, TLV_EXTENDED_LENGTH, 0x10, 0x00]);
        assert_eq!(decode(&image).unwrap_err(), EnvelopeError::PayloadTooLarge(0x1000));
    }

    #[test]
    fn unreadable_tag_surfaces_block() {
        let image = tag_image(&ndef_json(b"{}", false));
        let mut tag = MemoryTag::new(&image[..]).fail_at(4);
        let mut reader = BlockReader::new(&mut tag, BlockGeometry::NTAG21X);
        let err = block_on(decode_envelope(&mut reader, &EnvelopeConfig::default())).unwrap_err();
        assert_eq!(err, EnvelopeError::Tag(TagError::Io { block: 4 }));
    }

    proptest! {
        #[test]
        fn short_form_json_length(len in 3u8..=254) {
            let head = [TLV_NDEF_MESSAGE, len, 0xD2, 0x10];
            let TlvHead::Ndef(tlv) = parse_tlv_head(TLV_AREA_START, &head).unwrap() else {
                panic!("expected NDEF TLV");
            };
            match json_window(&tlv) {
                Ok((_, json)) => {
                    if len > 3 {
                        prop_assert_eq!(json.len, len as usize - 3 - 16);
                    } else {
                        prop_assert!(json.is_empty());
                    }
                    prop_assert!(json.end() <= TLV_AREA_START + 2 + len as usize);
                }
                Err(err) => {
                    prop_assert!((len as usize) < 3 + 16);
                    prop_assert_eq!(err, EnvelopeError::MissingMimePrefix(len as u16 - 3));
                }
            }
        }

        #[test]
        fn extended_form_length_is_big_endian(hi in any::<u8>(), lo in any::<u8>()) {
            let head = [TLV_NDEF_MESSAGE, TLV_EXTENDED_LENGTH, hi, lo];
            let TlvHead::Ndef(tlv) = parse_tlv_head(40, &head).unwrap() else {
                panic!("expected NDEF TLV");
            };
            prop_assert_eq!(tlv.declared_length, ((hi as u16) << 8) | lo as u16);
            prop_assert_eq!(tlv.value, TagByteWindow::new(44, tlv.declared_length as usize));
        }
    }
}
