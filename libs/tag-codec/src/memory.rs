use crate::block::{BlockGeometry, TagTransport};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryTagError {
    /// The first block of the transfer lies past the end of the image.
    OutOfRange { block: usize },
    /// Injected failure for this block.
    Injected { block: usize },
    WrongBufferLen,
}

/// A tag backed by a memory image (dump file, test fixture).
///
/// Transfers past the end of the image are zero-padded as long as the first
/// block exists; every transfer carries a CRC_A trailer like the real reader.
pub struct MemoryTag<B> {
    image: B,
    geometry: BlockGeometry,
    fail_at: Option<usize>,
    transfers: usize,
    first_block: Option<usize>,
    last_block: Option<usize>,
    halted: bool,
}

impl<B: AsRef<[u8]>> MemoryTag<B> {
    pub fn new(image: B) -> Self {
        Self {
            image,
            geometry: BlockGeometry::NTAG21X,
            fail_at: None,
            transfers: 0,
            first_block: None,
            last_block: None,
            halted: false,
        }
    }

    pub fn with_geometry(mut self, geometry: BlockGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Make any transfer starting at `block` fail.
    pub fn fail_at(mut self, block: usize) -> Self {
        self.fail_at = Some(block);
        self
    }

    pub fn image(&self) -> &[u8] {
        self.image.as_ref()
    }

    pub fn transfers(&self) -> usize {
        self.transfers
    }

    pub fn first_block_read(&self) -> Option<usize> {
        self.first_block
    }

    pub fn last_block_read(&self) -> Option<usize> {
        self.last_block
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

impl<B: AsRef<[u8]>> TagTransport for MemoryTag<B> {
    type Error = MemoryTagError;

    async fn read_transfer(&mut self, first_block: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        let g = self.geometry;
        if buf.len() != g.transfer_len() {
            return Err(MemoryTagError::WrongBufferLen);
        }
        if self.fail_at == Some(first_block) {
            return Err(MemoryTagError::Injected { block: first_block });
        }

        let image = self.image.as_ref();
        let start = first_block * g.block_size;
        if start >= image.len() {
            return Err(MemoryTagError::OutOfRange { block: first_block });
        }

        let (data, trailer) = buf.split_at_mut(g.data_len());
        let avail = (image.len() - start).min(data.len());
        data[..avail].copy_from_slice(&image[start..start + avail]);
        data[avail..].fill(0);

        let crc = crc_a(data).to_le_bytes();
        for (i, b) in trailer.iter_mut().enumerate() {
            *b = crc.get(i).copied().unwrap_or(0);
        }

        self.transfers += 1;
        self.first_block.get_or_insert(first_block);
        self.last_block = Some(first_block);
        Ok(())
    }

    async fn halt(&mut self) {
        self.halted = true;
    }
}

/// ISO/IEC 14443-3 type A frame CRC, transmitted low byte first.
pub fn crc_a(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0x6363;
    for &b in bytes {
        let mut ch = b ^ (crc as u8);
        ch ^= ch << 4;
        let ch = ch as u16;
        crc = (crc >> 8) ^ (ch << 8) ^ (ch << 3) ^ (ch >> 4);
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn crc_a_reference_vectors() {
        assert_eq!(crc_a(&[0x00, 0x00]), 0x1EA0);
        assert_eq!(crc_a(&[0x12, 0x34]), 0xCF26);
    }

    #[test]
    fn transfer_pads_past_image_end_and_appends_crc() {
        let image = [0xAAu8; 10];
        let mut tag = MemoryTag::new(&image[..]);
        let mut buf = [0u8; 18];
        block_on(tag.read_transfer(2, &mut buf)).unwrap();
        assert_eq!(&buf[..2], &[0xAA, 0xAA]);
        assert!(buf[2..16].iter().all(|&b| b == 0));
        assert_eq!(u16::from_le_bytes([buf[16], buf[17]]), crc_a(&buf[..16]));
    }

    #[test]
    fn transfer_outside_image_fails() {
        let image = [0u8; 16];
        let mut tag = MemoryTag::new(&image[..]);
        let mut buf = [0u8; 18];
        let err = block_on(tag.read_transfer(4, &mut buf)).unwrap_err();
        assert_eq!(err, MemoryTagError::OutOfRange { block: 4 });
        assert_eq!(tag.transfers(), 0);
    }
}
