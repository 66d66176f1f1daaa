use base64::Engine as _;
use serde::{Serialize, Serializer};

bitflags::bitflags! {
    /// Header type flags. Any combination may be set on one page.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PageFlags: u8 {
        /// The first segment run continues the previous page's last packet
        const CONTINUATION = 0x01;
        /// First page of a logical stream
        const BEGIN_STREAM = 0x02;
        /// Last page of a logical stream
        const END_STREAM = 0x04;
    }
}

impl Serialize for PageFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        names.serialize(serializer)
    }
}

/// A decoded Ogg page.
///
/// Packet slices borrow the decoder's buffers and stay valid only until the
/// next `decode()` call. Use [`Page::to_owned_page`] to keep one around.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub flags: PageFlags,
    pub serial: u32,
    pub sequence: u32,
    pub granule_position: i64,
    pub checksum: u32,
    pub segment_table: &'a [u8],
    /// Packets that ended on this page, in order. The first one may include
    /// bytes carried over from earlier pages.
    pub packets: Vec<&'a [u8]>,
    /// The page ends inside a packet that continues on a later page.
    pub incomplete: bool,
}

impl Page<'_> {
    pub fn is_continuation(&self) -> bool {
        self.flags.contains(PageFlags::CONTINUATION)
    }

    pub fn is_begin_stream(&self) -> bool {
        self.flags.contains(PageFlags::BEGIN_STREAM)
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.contains(PageFlags::END_STREAM)
    }

    /// Copy the page out of the decoder's buffers.
    pub fn to_owned_page(&self) -> OwnedPage {
        OwnedPage {
            flags: self.flags,
            serial: self.serial,
            sequence: self.sequence,
            granule_position: self.granule_position,
            checksum: self.checksum,
            segment_table: self.segment_table.to_vec(),
            packets: self.packets.iter().map(|p| p.to_vec()).collect(),
            incomplete: self.incomplete,
        }
    }
}

/// Owned copy of a [`Page`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedPage {
    pub flags: PageFlags,
    pub serial: u32,
    pub sequence: u32,
    pub granule_position: i64,
    pub checksum: u32,
    #[serde(skip)]
    pub segment_table: Vec<u8>,
    #[serde(serialize_with = "serialize_packets", skip_serializing_if = "Vec::is_empty")]
    pub packets: Vec<Vec<u8>>,
    pub incomplete: bool,
}

fn serialize_packets<S: Serializer>(packets: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
    let encoded: Vec<String> = packets
        .iter()
        .map(|p| base64::engine::general_purpose::STANDARD.encode(p))
        .collect();
    encoded.serialize(serializer)
}
