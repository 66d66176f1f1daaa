//! Packet-to-page segmentation.
//!
//! Walks a list of packets and cuts it into page-sized spans, each with its
//! own lacing table. A packet is laced as `len / 255` entries of 255 followed
//! by one terminating entry of `len % 255`, so a packet whose length is an
//! exact multiple of 255 always ends with an explicit 0. When a table runs out
//! of room before a packet is terminated, the rest of that packet opens the
//! next span, which is then marked as a continuation.

use crate::ogg::{MAX_SEGMENTS, MAX_SEGMENT_SIZE};

/// One page worth of lacing values and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpan<'a> {
    /// Lacing values, 1 to 255 entries
    pub lacing: Vec<u8>,
    /// Payload pieces in order; their lengths add up to the lacing total
    pub chunks: Vec<&'a [u8]>,
    /// The span starts in the middle of a packet
    pub continued: bool,
    /// Nothing is left to segment after this span
    pub last: bool,
}

impl PageSpan<'_> {
    pub fn payload_len(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }
}

/// Iterator over the page spans for a list of packets.
///
/// An empty list is treated as one empty packet and produces a single span
/// with the lacing table `[0]`.
#[derive(Debug)]
pub struct Segmenter<'a, P> {
    packets: &'a [P],
    // packet currently being laced
    index: usize,
    // bytes of that packet already placed on earlier spans
    offset: usize,
    // packet `index` has had at least one segment emitted
    started: bool,
    done: bool,
}

impl<'a, P: AsRef<[u8]>> Segmenter<'a, P> {
    pub fn new(packets: &'a [P]) -> Self {
        Segmenter {
            packets,
            index: 0,
            offset: 0,
            started: false,
            done: false,
        }
    }

    /// Whether every packet has been fully laced.
    pub fn is_finished(&self) -> bool {
        self.done
    }

    fn next_span(&mut self) -> PageSpan<'a> {
        let continued = self.started;
        let mut lacing = Vec::with_capacity(MAX_SEGMENTS);
        let mut chunks = Vec::new();

        if self.packets.is_empty() {
            lacing.push(0);
            self.done = true;
            return PageSpan {
                lacing,
                chunks,
                continued,
                last: true,
            };
        }

        let packets = self.packets;
        while self.index < packets.len() && lacing.len() < MAX_SEGMENTS {
            let rest = &packets[self.index].as_ref()[self.offset..];
            let full = rest.len() / MAX_SEGMENT_SIZE;
            let space = MAX_SEGMENTS - lacing.len();

            if full >= space {
                // No room for the terminator: fill the table and carry on
                // with this packet on the next page.
                let take = space * MAX_SEGMENT_SIZE;
                lacing.resize(MAX_SEGMENTS, MAX_SEGMENT_SIZE as u8);
                if take > 0 {
                    chunks.push(&rest[..take]);
                }
                self.offset += take;
                self.started = true;
                break;
            }

            lacing.resize(lacing.len() + full, MAX_SEGMENT_SIZE as u8);
            lacing.push((rest.len() % MAX_SEGMENT_SIZE) as u8);
            if !rest.is_empty() {
                chunks.push(rest);
            }
            self.index += 1;
            self.offset = 0;
            self.started = false;
        }

        self.done = self.index >= packets.len();
        PageSpan {
            lacing,
            chunks,
            continued,
            last: self.done,
        }
    }
}

impl<'a, P: AsRef<[u8]>> Iterator for Segmenter<'a, P> {
    type Item = PageSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        Some(self.next_span())
    }
}
