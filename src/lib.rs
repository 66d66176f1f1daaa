//! oggframe - Ogg bitstream framing
//!
//! Packs the packets of a logical stream into Ogg pages and recovers them
//! again from a byte stream, as described in RFC 3533.
//!
//! ```
//! use oggframe::{Decoder, Encoder};
//!
//! let mut encoder = Encoder::new(1, Vec::new());
//! encoder.encode_begin(0, &[b"first packet".as_slice(), b"second"]).unwrap();
//!
//! let bytes = encoder.into_inner();
//! let mut decoder = Decoder::new(bytes.as_slice());
//! let page = decoder.decode().unwrap();
//! assert!(page.is_begin_stream());
//! assert_eq!(page.packets, vec![b"first packet".as_slice(), b"second"]);
//! ```

pub mod error;
pub mod ogg;
pub mod utils;

pub use error::{OggError, Result};
pub use ogg::{
    Decoder, Encoder, OwnedPage, Page, PageFlags, PageHeader, MAX_PAGE_SIZE, MIME_TYPE,
};
