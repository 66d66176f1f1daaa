//! Error type shared by the encoder and decoder.

/// Errors produced while framing or unframing Ogg pages.
#[derive(Debug, thiserror::Error)]
pub enum OggError {
    /// The input ended cleanly between pages.
    #[error("end of stream")]
    EndOfStream,
    /// The input ended inside a page header, segment table or payload.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
    /// A header buffer was too short to hold a page header.
    #[error("invalid page header")]
    BadHeader,
    /// The header declared an empty segment table.
    #[error("invalid segment table size")]
    BadSegmentCount,
    /// The page checksum did not match its contents.
    #[error("invalid crc in packet: computed {computed:#010x}, expected {expected:#010x}")]
    BadChecksum {
        /// Checksum calculated over the received page
        computed: u32,
        /// Checksum stored in the page header
        expected: u32,
    },
    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OggError {
    /// True for the clean end-of-input signal that ends a decode loop.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, OggError::EndOfStream)
    }
}

pub type Result<T> = std::result::Result<T, OggError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_message_carries_both_values() {
        let err = OggError::BadChecksum {
            computed: 0x1e2e_df7e,
            expected: 0,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("invalid crc in packet"));
        assert!(msg.contains("0x1e2edf7e"));
        assert!(msg.contains("0x00000000"));
    }

    #[test]
    fn test_end_of_stream_predicate() {
        assert!(OggError::EndOfStream.is_end_of_stream());
        assert!(!OggError::UnexpectedEndOfStream.is_end_of_stream());
    }
}
