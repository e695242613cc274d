use opentag_tag_codec::{
    BlockReader, EnvelopeConfig, EnvelopeError, MAX_NDEF_PAYLOAD, NdefEnvelope, TagTransport,
    decode_envelope,
};

/// JSON bytes of one tag, held in fixed memory.
pub type TagJson = heapless::Vec<u8, MAX_NDEF_PAYLOAD>;

/// Locate the NDEF envelope and read its JSON bytes, then release the tag.
///
/// The tag is only halted after a complete read; on failure it is left as is
/// so the next presentation starts from scratch.
pub async fn read_tag_json<T: TagTransport>(
    tag: &mut T,
    config: &EnvelopeConfig,
) -> Result<(NdefEnvelope, TagJson), EnvelopeError> {
    let mut reader = BlockReader::new(tag, config.geometry);
    let envelope = decode_envelope(&mut reader, config).await?;
    let json: TagJson = reader.read_vec(envelope.json).await?;
    debug!(
        "ndef json at {} ({} bytes)",
        envelope.json.start,
        envelope.json.len
    );
    reader.transport().halt().await;
    Ok((envelope, json))
}
