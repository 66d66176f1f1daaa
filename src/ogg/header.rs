use crate::error::{OggError, Result};
use crate::ogg::page::PageFlags;
use crate::ogg::{CHECKSUM_END, CHECKSUM_OFFSET, HEADER_SIZE, OGG_SIGNATURE, STREAM_VERSION};

/// Ogg Page Header
///
/// Fixed 27-byte layout, all integers little-endian:
///
/// ```text
/// [ "OggS" (4) ][ version (1) ][ flags (1) ][ granule (8) ]
/// [ serial (4) ][ sequence (4) ][ checksum (4) ][ segments (1) ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub version: u8,
    pub flags: PageFlags,
    pub granule_position: i64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub segment_count: u8,
}

impl PageHeader {
    /// Header for a fresh page. The checksum stays 0 until the page is sealed.
    pub fn new(flags: PageFlags, granule_position: i64, serial: u32, sequence: u32) -> Self {
        PageHeader {
            version: STREAM_VERSION,
            flags,
            granule_position,
            serial,
            sequence,
            checksum: 0,
            segment_count: 0,
        }
    }

    /// Parse a page header from the first 27 bytes of `bytes`.
    ///
    /// Only the length is checked; the capture pattern is the caller's
    /// business and the segment count is validated by the decoder.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(OggError::BadHeader)?;

        Ok(PageHeader {
            version: header[4],
            flags: PageFlags::from_bits_retain(header[5]),
            granule_position: i64::from_le_bytes(le_array(&header[6..14])),
            serial: u32::from_le_bytes(le_array(&header[14..18])),
            sequence: u32::from_le_bytes(le_array(&header[18..22])),
            checksum: u32::from_le_bytes(le_array(&header[22..26])),
            segment_count: header[26],
        })
    }

    /// Serialize into a fixed 27-byte buffer.
    pub fn encode(&self, out: &mut [u8; HEADER_SIZE]) {
        out[0..4].copy_from_slice(OGG_SIGNATURE);
        out[4] = self.version;
        out[5] = self.flags.bits();
        out[6..14].copy_from_slice(&self.granule_position.to_le_bytes());
        out[14..18].copy_from_slice(&self.serial.to_le_bytes());
        out[18..22].copy_from_slice(&self.sequence.to_le_bytes());
        out[22..26].copy_from_slice(&self.checksum.to_le_bytes());
        out[26] = self.segment_count;
    }

    /// Append the serialized header to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut bytes = [0u8; HEADER_SIZE];
        self.encode(&mut bytes);
        out.extend_from_slice(&bytes);
    }
}

/// Zero the checksum field of an assembled page image.
pub fn clear_checksum(page: &mut [u8]) {
    page[CHECKSUM_OFFSET..CHECKSUM_END].fill(0);
}

/// Store `crc` into the checksum field of an assembled page image.
pub fn patch_checksum(page: &mut [u8], crc: u32) {
    page[CHECKSUM_OFFSET..CHECKSUM_END].copy_from_slice(&crc.to_le_bytes());
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
