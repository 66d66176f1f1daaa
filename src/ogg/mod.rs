// Ogg bitstream framing (RFC 3533)
//
// Ogg Page Layout:
// - Page Header (27 bytes, little-endian)
//   - Capture Pattern: "OggS" (4 bytes)
//   - Version: 0 (1 byte)
//   - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
//   - Granule Position (8 bytes, signed)
//   - Bitstream Serial Number (4 bytes)
//   - Page Sequence Number (4 bytes)
//   - CRC Checksum (4 bytes)
//   - Number of Page Segments (1 byte)
// - Segment Table (1-255 lacing values)
// - Payload (sum of the lacing values)
//
// A lacing value of 255 means the packet goes on in the next segment, which
// may live on the next page. Anything below 255 ends the packet.

pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod page;
pub mod segmenter;

pub use decoder::{Decoder, DEFAULT_MAX_PACKET_SIZE};
pub use encoder::Encoder;
pub use header::PageHeader;
pub use page::{OwnedPage, Page, PageFlags};
pub use segmenter::{PageSpan, Segmenter};

// Ogg capture pattern
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

/// MIME type registered for Ogg streams.
pub const MIME_TYPE: &str = "application/ogg";

/// Stream structure version, always 0.
pub const STREAM_VERSION: u8 = 0;

/// Size of the fixed page header.
pub const HEADER_SIZE: usize = 27;

/// Largest value a single lacing entry can hold.
pub const MAX_SEGMENT_SIZE: usize = 255;

/// Largest number of entries in a segment table.
pub const MAX_SEGMENTS: usize = 255;

/// Largest payload one page can carry (255 segments of 255 bytes).
pub const MAX_PAGE_PAYLOAD: usize = MAX_SEGMENT_SIZE * MAX_SEGMENTS;

/// 65307 bytes, per the RFC.
pub const MAX_PAGE_SIZE: usize = HEADER_SIZE + MAX_SEGMENTS + MAX_PAGE_PAYLOAD;

// Byte range of the checksum field inside the header
pub(crate) const CHECKSUM_OFFSET: usize = 22;
pub(crate) const CHECKSUM_END: usize = CHECKSUM_OFFSET + 4;
