use core::ops::Range;

use heapless::Vec;

/// Largest physical transfer (data + trailer) the reader will stage on the stack.
pub const MAX_TRANSFER_LEN: usize = 64;

/// Physical layout of a block-addressed tag as seen through the reader.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Bytes per logical block (page).
    pub block_size: usize,
    /// Logical blocks returned by one physical read command.
    pub blocks_per_transfer: usize,
    /// Bytes appended after the data of every transfer (e.g. CRC_A), discarded.
    pub trailer_len: usize,
}

impl BlockGeometry {
    /// NTAG21x behind an MFRC522: READ returns 4 pages of 4 bytes followed by
    /// the 2-byte CRC_A.
    pub const NTAG21X: Self = Self::new(4, 4, 2);

    pub const fn new(block_size: usize, blocks_per_transfer: usize, trailer_len: usize) -> Self {
        Self {
            block_size,
            blocks_per_transfer,
            trailer_len,
        }
    }

    pub const fn data_len(&self) -> usize {
        self.block_size * self.blocks_per_transfer
    }

    pub const fn transfer_len(&self) -> usize {
        self.data_len() + self.trailer_len
    }

    pub const fn block_of(&self, byte: usize) -> usize {
        byte / self.block_size
    }

    pub const fn offset_in_block(&self, byte: usize) -> usize {
        byte % self.block_size
    }

    const fn is_valid(&self) -> bool {
        self.block_size != 0 && self.blocks_per_transfer != 0 && self.transfer_len() <= MAX_TRANSFER_LEN
    }
}

impl Default for BlockGeometry {
    fn default() -> Self {
        Self::NTAG21X
    }
}

/// Logical `[start, start + len)` range over the tag's linear byte space.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TagByteWindow {
    pub start: usize,
    pub len: usize,
}

impl TagByteWindow {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop the first `n` bytes. `None` if the window is shorter than `n`.
    pub const fn skip(&self, n: usize) -> Option<Self> {
        if n > self.len {
            return None;
        }
        Some(Self::new(self.start + n, self.len - n))
    }

    /// Every block that holds at least one byte of the window, and only those.
    pub const fn blocks(&self, geometry: &BlockGeometry) -> Range<usize> {
        let first = geometry.block_of(self.start);
        if self.len == 0 {
            return first..first;
        }
        let mut stop = geometry.block_of(self.end());
        if geometry.offset_in_block(self.end()) != 0 {
            stop += 1;
        }
        first..stop
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagError {
    /// The transfer starting at `block` failed; nothing read so far is returned.
    Io { block: usize },
    BufferTooSmall,
    InvalidGeometry,
}

/// One physical read command against the tag currently in the field.
pub trait TagTransport {
    type Error;

    /// Fill `buf` (exactly `geometry.transfer_len()` bytes) with the blocks
    /// starting at `first_block`, data first, trailer last.
    async fn read_transfer(&mut self, first_block: usize, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Release the tag once a read cycle is done with it.
    async fn halt(&mut self) {}
}

/// Turns byte windows into block transfers.
pub struct BlockReader<'a, T> {
    transport: &'a mut T,
    geometry: BlockGeometry,
}

impl<'a, T: TagTransport> BlockReader<'a, T> {
    pub fn new(transport: &'a mut T, geometry: BlockGeometry) -> Self {
        Self {
            transport,
            geometry,
        }
    }

    pub fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    pub fn transport(&mut self) -> &mut T {
        &mut *self.transport
    }

    /// Read `window` into the front of `out`.
    ///
    /// On error the content of `out` is unspecified.
    pub async fn read(&mut self, window: TagByteWindow, out: &mut [u8]) -> Result<(), TagError> {
        let geometry = self.geometry;
        if !geometry.is_valid() {
            return Err(TagError::InvalidGeometry);
        }
        if out.len() < window.len {
            return Err(TagError::BufferTooSmall);
        }

        let blocks = window.blocks(&geometry);
        let mut raw = [0u8; MAX_TRANSFER_LEN];
        // Only the first transfer can start mid-block.
        let mut offset = geometry.offset_in_block(window.start);
        let mut written = 0usize;
        let mut block = blocks.start;

        while block < blocks.end {
            let transfer = &mut raw[..geometry.transfer_len()];
            self.transport
                .read_transfer(block, transfer)
                .await
                .map_err(|_| TagError::Io { block })?;

            let data = &transfer[offset..geometry.data_len()];
            let take = data.len().min(window.len - written);
            out[written..written + take].copy_from_slice(&data[..take]);
            written += take;

            offset = 0;
            block += geometry.blocks_per_transfer;
        }

        Ok(())
    }

    /// Read `window` into a fresh fixed-capacity buffer.
    pub async fn read_vec<const N: usize>(
        &mut self,
        window: TagByteWindow,
    ) -> Result<Vec<u8, N>, TagError> {
        let mut buf: Vec<u8, N> = Vec::new();
        buf.resize_default(window.len)
            .map_err(|_| TagError::BufferTooSmall)?;
        self.read(window, &mut buf).await?;
        Ok(buf)
    }
}
