use std::io::Write;

use tracing::trace;

use crate::error::Result;
use crate::ogg::crc;
use crate::ogg::header::{patch_checksum, PageHeader};
use crate::ogg::page::PageFlags;
use crate::ogg::segmenter::{PageSpan, Segmenter};
use crate::ogg::MAX_PAGE_SIZE;

/// Writes the packets of one logical stream as Ogg pages.
///
/// Every page carries this encoder's serial number and the next value of its
/// page sequence counter. Distinct encoders writing to distinct sinks are
/// independent; a single encoder must not be shared between threads.
#[derive(Debug)]
pub struct Encoder<W> {
    serial: u32,
    sequence: u32,
    writer: W,
    // scratch space for the page being assembled
    page: Vec<u8>,
}

impl<W: Write> Encoder<W> {
    pub fn new(serial: u32, writer: W) -> Self {
        Encoder {
            serial,
            sequence: 0,
            writer,
            page: Vec::with_capacity(MAX_PAGE_SIZE),
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Sequence number the next page will get.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write `packets` with the beginning-of-stream flag on the first page.
    ///
    /// Returns the number of bytes written.
    pub fn encode_begin<P: AsRef<[u8]>>(&mut self, granule: i64, packets: &[P]) -> Result<usize> {
        self.write_packets(PageFlags::BEGIN_STREAM, granule, packets)
    }

    /// Write `packets` as ordinary pages. An empty slice writes one empty packet.
    pub fn encode<P: AsRef<[u8]>>(&mut self, granule: i64, packets: &[P]) -> Result<usize> {
        self.write_packets(PageFlags::empty(), granule, packets)
    }

    /// Write `packets` with the end-of-stream flag on the last page.
    pub fn encode_end<P: AsRef<[u8]>>(&mut self, granule: i64, packets: &[P]) -> Result<usize> {
        self.write_packets(PageFlags::END_STREAM, granule, packets)
    }

    /// Write `packets` with stream flags chosen by the caller.
    ///
    /// `BEGIN_STREAM` in `kind` goes on the first page and `END_STREAM` on the
    /// last, so a whole stream fitting in one call can carry both.
    /// `CONTINUATION` is always derived from the segmentation and is ignored
    /// here.
    pub fn write_packets<P: AsRef<[u8]>>(
        &mut self,
        kind: PageFlags,
        granule: i64,
        packets: &[P],
    ) -> Result<usize> {
        let mut written = 0;
        let mut first = true;

        for span in Segmenter::new(packets) {
            let mut flags = PageFlags::empty();
            if span.continued {
                flags |= PageFlags::CONTINUATION;
            }
            if first && kind.contains(PageFlags::BEGIN_STREAM) {
                flags |= PageFlags::BEGIN_STREAM;
            }
            if span.last && kind.contains(PageFlags::END_STREAM) {
                flags |= PageFlags::END_STREAM;
            }
            first = false;

            written += self.write_page(flags, granule, &span)?;
        }

        Ok(written)
    }

    fn write_page(&mut self, flags: PageFlags, granule: i64, span: &PageSpan<'_>) -> Result<usize> {
        let mut header = PageHeader::new(flags, granule, self.serial, self.sequence);
        header.segment_count = span.lacing.len() as u8;

        self.page.clear();
        header.write_to(&mut self.page);
        self.page.extend_from_slice(&span.lacing);
        for chunk in &span.chunks {
            self.page.extend_from_slice(chunk);
        }

        let crc = crc::checksum(&self.page);
        patch_checksum(&mut self.page, crc);

        // The counter moves even if the write fails; the stream is unusable then.
        self.sequence = self.sequence.wrapping_add(1);
        self.writer.write_all(&self.page)?;

        trace!(
            serial = self.serial,
            sequence = header.sequence,
            flags = flags.bits(),
            segments = span.lacing.len(),
            bytes = self.page.len(),
            "wrote page"
        );
        Ok(self.page.len())
    }
}
