use std::io::Read;
use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::error::{OggError, Result};
use crate::ogg::crc;
use crate::ogg::header::{clear_checksum, PageHeader};
use crate::ogg::page::{Page, PageFlags};
use crate::ogg::{HEADER_SIZE, MAX_PAGE_SIZE, MAX_SEGMENT_SIZE, OGG_SIGNATURE};
use crate::utils::io::read_full;

/// Default cap on the bytes buffered for one unterminated packet (16 MiB).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Where a reassembled packet lives.
#[derive(Debug, Clone)]
enum PacketSpan {
    // joined with bytes from earlier pages
    Carry,
    // entirely inside the current page buffer
    Page(Range<usize>),
}

/// State of the packet being stitched together across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Carry {
    Empty,
    // holds the head of an unterminated packet
    Open,
    // holds a packet handed out by the last decode() call
    Delivered,
}

/// Reads Ogg pages from a byte stream, one page per [`Decoder::decode`] call.
///
/// The decoder resynchronizes on the capture pattern, so leading garbage and
/// garbage between pages is skipped. Packets split across pages are joined
/// before they are returned.
///
/// Only one unterminated packet is buffered at a time, tagged with the serial
/// of the page it came from. Pages of other logical streams are still
/// returned, but they neither join nor discard that packet; their own split
/// packets are dropped. [`Decoder::set_serial_filter`] pins the buffered
/// packet to one stream up front.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
    // one page: header, segment table, payload
    buf: Box<[u8]>,
    carry: Vec<u8>,
    carry_state: Carry,
    // stream the open carry belongs to
    carry_serial: u32,
    serial_filter: Option<u32>,
    max_packet_size: usize,
    // trailing bytes of the last page that belong to an unfinished packet
    pending_tail: Option<Range<usize>>,
    spans: Vec<PacketSpan>,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            buf: vec![0u8; MAX_PAGE_SIZE].into_boxed_slice(),
            carry: Vec::new(),
            carry_state: Carry::Empty,
            carry_serial: 0,
            serial_filter: None,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            pending_tail: None,
            spans: Vec::new(),
        }
    }

    /// Only reassemble split packets of the stream with this serial.
    ///
    /// Pages of other streams are still returned with their complete
    /// packets. `None` (the default) lets whichever stream first leaves a
    /// packet unterminated own the buffer until that packet ends.
    pub fn set_serial_filter(&mut self, serial: Option<u32>) {
        self.serial_filter = serial;
        if let Some(serial) = serial {
            if self.carry_serial != serial {
                self.pending_tail = None;
                self.discard_carry();
            }
        }
    }

    /// Cap the bytes buffered for one unterminated packet. A packet that grows
    /// past the cap is dropped and the rest of it is skipped as orphaned data.
    pub fn set_max_packet_size(&mut self, max: usize) {
        self.max_packet_size = max;
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next page.
    ///
    /// Returns [`OggError::EndOfStream`] when the input ends between pages and
    /// [`OggError::UnexpectedEndOfStream`] when it ends inside one. The
    /// returned page borrows this decoder; its packets are overwritten by the
    /// next call.
    pub fn decode(&mut self) -> Result<Page<'_>> {
        self.settle_carry();

        let (header, table_len, payload_len) = match self.read_page() {
            Ok(page) => page,
            Err(e) => {
                if !e.is_end_of_stream() {
                    self.discard_carry();
                }
                return Err(e);
            }
        };

        let incomplete = self.reassemble(&header, table_len, payload_len);

        let buf = &self.buf;
        let carry = &self.carry;
        let packets = self
            .spans
            .iter()
            .map(|span| match span {
                PacketSpan::Carry => carry.as_slice(),
                PacketSpan::Page(range) => &buf[range.clone()],
            })
            .collect();

        Ok(Page {
            flags: header.flags,
            serial: header.serial,
            sequence: header.sequence,
            granule_position: header.granule_position,
            checksum: header.checksum,
            segment_table: &buf[HEADER_SIZE..HEADER_SIZE + table_len],
            packets,
            incomplete,
        })
    }

    // Release the packet handed out last time and pick up the unfinished
    // tail of the previous page before the page buffer is reused.
    fn settle_carry(&mut self) {
        if self.carry_state == Carry::Delivered {
            self.carry.clear();
            self.carry_state = Carry::Empty;
        }
        if let Some(tail) = self.pending_tail.take() {
            self.carry.extend_from_slice(&self.buf[tail]);
            self.carry_state = Carry::Open;
        }
    }

    fn discard_carry(&mut self) {
        if self.carry_state == Carry::Open {
            debug!(
                serial = self.carry_serial,
                bytes = self.carry.len(),
                "dropping partial packet"
            );
        }
        self.carry.clear();
        self.carry_state = Carry::Empty;
    }

    // The page belongs to a stream whose split packets are not buffered
    // right now.
    fn is_foreign(&self, serial: u32) -> bool {
        match self.serial_filter {
            Some(tracked) if tracked != serial => true,
            _ => self.carry_state == Carry::Open && self.carry_serial != serial,
        }
    }

    // Fill `buf` with one verified page. Returns the header and the lengths
    // of the segment table and payload.
    fn read_page(&mut self) -> Result<(PageHeader, usize, usize)> {
        self.sync()?;

        let header = PageHeader::parse(&self.buf[..HEADER_SIZE])?;
        if header.segment_count == 0 {
            return Err(OggError::BadSegmentCount);
        }

        let table_len = header.segment_count as usize;
        let table_end = HEADER_SIZE + table_len;
        self.fill(HEADER_SIZE..table_end)?;

        let payload_len: usize = self.buf[HEADER_SIZE..table_end]
            .iter()
            .map(|&v| v as usize)
            .sum();
        let page_end = table_end + payload_len;
        self.fill(table_end..page_end)?;

        let page = &mut self.buf[..page_end];
        clear_checksum(page);
        let computed = crc::checksum(page);
        if computed != header.checksum {
            return Err(OggError::BadChecksum {
                computed,
                expected: header.checksum,
            });
        }

        trace!(
            serial = header.serial,
            sequence = header.sequence,
            flags = header.flags.bits(),
            segments = table_len,
            bytes = page_end,
            "read page"
        );
        Ok((header, table_len, payload_len))
    }

    // Read exactly `range` of the page buffer; running dry is a truncated page.
    fn fill(&mut self, range: Range<usize>) -> Result<()> {
        let want = range.len();
        let got = read_full(&mut self.reader, &mut self.buf[range])?;
        if got < want {
            return Err(OggError::UnexpectedEndOfStream);
        }
        Ok(())
    }

    // Leave a header-sized window starting with the capture pattern at the
    // front of `buf`. Only a matching prefix is kept between refills, so each
    // byte of garbage is read once.
    fn sync(&mut self) -> Result<()> {
        let mut filled = 0;
        let mut skipped = 0usize;

        loop {
            filled += read_full(&mut self.reader, &mut self.buf[filled..HEADER_SIZE])?;
            if filled < HEADER_SIZE {
                let window = &self.buf[..filled];
                if window.windows(OGG_SIGNATURE.len()).any(|w| w == OGG_SIGNATURE) {
                    return Err(OggError::UnexpectedEndOfStream);
                }
                if skipped + filled > 0 {
                    debug!(bytes = skipped + filled, "no page found before end of stream");
                }
                return Err(OggError::EndOfStream);
            }

            match find_capture(&self.buf[..HEADER_SIZE]) {
                Some(0) => break,
                Some(at) => {
                    self.buf.copy_within(at..HEADER_SIZE, 0);
                    filled = HEADER_SIZE - at;
                    skipped += at;
                }
                None => {
                    filled = 0;
                    skipped += HEADER_SIZE;
                }
            }
        }

        if skipped > 0 {
            debug!(bytes = skipped, "skipped garbage before page");
        }
        Ok(())
    }

    // Split the verified page into packets, joining with carried bytes.
    // Returns true when the page ends inside a packet.
    fn reassemble(&mut self, header: &PageHeader, table_len: usize, payload_len: usize) -> bool {
        self.spans.clear();

        let continuation = header.flags.contains(PageFlags::CONTINUATION);
        let foreign = self.is_foreign(header.serial);
        if !foreign && !continuation && self.carry_state == Carry::Open {
            warn!(
                serial = header.serial,
                sequence = header.sequence,
                bytes = self.carry.len(),
                "discarding unterminated packet, next page is not a continuation"
            );
            self.carry.clear();
            self.carry_state = Carry::Empty;
        }
        let joins = !foreign && continuation && self.carry_state == Carry::Open;
        let orphan = continuation && !joins;

        let payload_start = HEADER_SIZE + table_len;
        let mut start = payload_start;
        let mut pos = payload_start;
        let mut first_run = true;

        for i in HEADER_SIZE..payload_start {
            let lace = self.buf[i] as usize;
            pos += lace;
            if lace == MAX_SEGMENT_SIZE {
                continue;
            }

            if first_run && joins {
                self.carry.extend_from_slice(&self.buf[start..pos]);
                self.carry_state = Carry::Delivered;
                self.spans.push(PacketSpan::Carry);
            } else if first_run && orphan {
                debug!(
                    serial = header.serial,
                    sequence = header.sequence,
                    bytes = pos - start,
                    "dropping continued packet with no beginning"
                );
            } else {
                self.spans.push(PacketSpan::Page(start..pos));
            }
            first_run = false;
            start = pos;
        }
        debug_assert_eq!(pos, payload_start + payload_len);

        let incomplete = self.buf[payload_start - 1] as usize == MAX_SEGMENT_SIZE;
        if !incomplete || (first_run && orphan) {
            return incomplete;
        }

        let buffered = if first_run && joins { self.carry.len() } else { 0 };
        if foreign {
            debug!(
                serial = header.serial,
                sequence = header.sequence,
                bytes = pos - start,
                "dropping split packet of another stream"
            );
        } else if buffered + (pos - start) > self.max_packet_size {
            warn!(
                serial = header.serial,
                sequence = header.sequence,
                bytes = buffered + (pos - start),
                limit = self.max_packet_size,
                "discarding packet larger than the buffer limit"
            );
            if first_run && joins {
                self.carry.clear();
                self.carry_state = Carry::Empty;
            }
        } else {
            self.carry_serial = header.serial;
            self.pending_tail = Some(start..pos);
        }
        incomplete
    }
}

// Earliest offset where the capture pattern starts, either whole or cut off
// by the end of the window.
fn find_capture(window: &[u8]) -> Option<usize> {
    (0..window.len()).find(|&i| {
        let tail = &window[i..];
        let n = tail.len().min(OGG_SIGNATURE.len());
        tail[..n] == OGG_SIGNATURE[..n]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::encoder::Encoder;
    use crate::ogg::MAX_PAGE_PAYLOAD;

    #[test]
    fn test_find_capture() {
        assert_eq!(find_capture(b"OggSxxxx"), Some(0));
        assert_eq!(find_capture(b"xxOggSxx"), Some(2));
        assert_eq!(find_capture(b"xxxxxxOg"), Some(6));
        assert_eq!(find_capture(b"xxxxxOgg"), Some(5));
        assert_eq!(find_capture(b"xxxxxxxO"), Some(7));
        assert_eq!(find_capture(b"xxOgxxxx"), None);
        assert_eq!(find_capture(b"OgOggSxx"), Some(2));
    }

    #[test]
    fn test_empty_input_is_end_of_stream() {
        let mut decoder = Decoder::new(&b""[..]);
        assert!(matches!(decoder.decode(), Err(OggError::EndOfStream)));
    }

    #[test]
    fn test_garbage_only_is_end_of_stream() {
        let garbage = vec![b'x'; 100];
        let mut decoder = Decoder::new(&garbage[..]);
        assert!(matches!(decoder.decode(), Err(OggError::EndOfStream)));
    }

    #[test]
    fn test_capture_pattern_then_eof_is_truncated() {
        let mut decoder = Decoder::new(&b"xxOggS\0\0"[..]);
        assert!(matches!(decoder.decode(), Err(OggError::UnexpectedEndOfStream)));
    }

    // Serves `data`, then fails every read
    struct BrokenReader<'a> {
        data: &'a [u8],
    }

    impl Read for BrokenReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "peer went away",
                ));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn two_page_packet(serial: u32, len: usize) -> Vec<u8> {
        let mut encoder = Encoder::new(serial, Vec::new());
        encoder.encode(0, &[vec![0x11u8; len]]).unwrap();
        encoder.into_inner()
    }

    #[test]
    fn test_read_error_inside_payload() {
        let page = two_page_packet(1, 100);
        let mut decoder = Decoder::new(BrokenReader { data: &page[..40] });
        match decoder.decode() {
            Err(OggError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_error_drops_partial_packet() {
        let bytes = two_page_packet(1, MAX_PAGE_PAYLOAD + 10);
        let mut decoder = Decoder::new(BrokenReader {
            data: &bytes[..MAX_PAGE_SIZE + 20],
        });
        assert!(decoder.decode().unwrap().incomplete);
        assert!(matches!(decoder.decode(), Err(OggError::Io(_))));
        assert_eq!(decoder.carry_state, Carry::Empty);
        assert!(decoder.carry.is_empty());
    }

    #[test]
    fn test_packet_over_limit_is_dropped() {
        let mut encoder = Encoder::new(1, Vec::new());
        encoder
            .encode(0, &[vec![0x22u8; 70_000], b"small".to_vec()])
            .unwrap();
        let bytes = encoder.into_inner();

        let mut decoder = Decoder::new(bytes.as_slice());
        decoder.set_max_packet_size(1000);
        let first = decoder.decode().unwrap();
        assert!(first.incomplete);
        assert!(first.packets.is_empty());
        assert!(decoder.carry.is_empty());

        let second = decoder.decode().unwrap();
        assert_eq!(second.packets, vec![b"small".as_slice()]);
    }

    #[test]
    fn test_packet_at_limit_is_kept() {
        let bytes = two_page_packet(1, 70_000);
        let mut decoder = Decoder::new(bytes.as_slice());
        decoder.set_max_packet_size(70_000);
        decoder.decode().unwrap();
        let page = decoder.decode().unwrap();
        assert_eq!(page.packets.len(), 1);
        assert_eq!(page.packets[0].len(), 70_000);
    }

    #[test]
    fn test_serial_filter_skips_other_split_packets() {
        let mut bytes = two_page_packet(2, MAX_PAGE_PAYLOAD + 10);
        bytes.extend_from_slice(&two_page_packet(1, MAX_PAGE_PAYLOAD + 20));

        let mut decoder = Decoder::new(bytes.as_slice());
        decoder.set_serial_filter(Some(1));
        assert!(decoder.decode().unwrap().packets.is_empty());
        assert_eq!(decoder.pending_tail, None);
        assert!(decoder.decode().unwrap().packets.is_empty());
        assert!(decoder.decode().unwrap().packets.is_empty());
        let page = decoder.decode().unwrap();
        assert_eq!(page.serial, 1);
        assert_eq!(page.packets.len(), 1);
        assert_eq!(page.packets[0].len(), MAX_PAGE_PAYLOAD + 20);
    }
}
