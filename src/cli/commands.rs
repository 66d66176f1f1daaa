// CLI command implementations
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use oggframe::{Decoder, Encoder, OggError, OwnedPage, PageFlags};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{CliError, CliResult, OutputFormatter};

/// Counters reported after a copy
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub pages_read: u64,
    pub pages_written: u64,
    pub packets: u64,
    pub skipped_pages: u64,
}

/// One line of `inspect` output
#[derive(Debug, Serialize)]
struct PageRecord<'a> {
    file: &'a str,
    segments: usize,
    packet_sizes: Vec<usize>,
    #[serde(flatten)]
    page: OwnedPage,
}

/// Result of `info` for one file
#[derive(Debug, Default, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub mime_type: &'static str,
    pub size: u64,
    pub modified: Option<String>,
    pub pages: u64,
    pub streams: BTreeSet<u32>,
    pub packets: u64,
    pub payload_bytes: u64,
    pub bad_pages: u64,
    pub truncated: bool,
}

/// Decode `input` and re-encode its packets to `output`
pub fn command_copy(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    formatter: &OutputFormatter,
) -> CliResult<()> {
    let reader: Box<dyn Read> = match input {
        Some(path) if path != Path::new("-") => Box::new(BufReader::new(open_file(&path)?)),
        _ => Box::new(io::stdin().lock()),
    };

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let stats = copy_stream(reader, writer)?;
    info!(
        pages_read = stats.pages_read,
        pages_written = stats.pages_written,
        packets = stats.packets,
        skipped = stats.skipped_pages,
        "copy finished"
    );
    if let Some(path) = output {
        formatter.print_success(&format!(
            "Wrote {} pages to {}",
            stats.pages_written,
            path.display()
        ));
    }
    Ok(())
}

/// Pass every complete packet of the first logical stream through a fresh encoder.
///
/// Packets split across pages come out of the decoder whole and are split
/// again by the encoder, so page boundaries may differ from the input while
/// the packet sequence stays the same.
pub fn copy_stream<R: Read, W: Write>(reader: R, writer: W) -> CliResult<CopyStats> {
    let mut decoder = Decoder::new(reader);
    let mut writer = Some(writer);
    let mut encoder: Option<Encoder<W>> = None;
    let mut begun = false;
    let mut track: Option<u32> = None;
    let mut stats = CopyStats::default();

    loop {
        // Keep other streams from taking over the split-packet buffer
        if let Some(serial) = track.take() {
            decoder.set_serial_filter(Some(serial));
        }

        let page = match decoder.decode() {
            Ok(page) => page,
            Err(OggError::EndOfStream) => break,
            Err(e) => return Err(e.into()),
        };
        stats.pages_read += 1;

        let encoder = match (&mut encoder, writer.take()) {
            (Some(encoder), _) => encoder,
            (slot, Some(w)) => {
                track = Some(page.serial);
                slot.insert(Encoder::new(page.serial, w))
            }
            (None, None) => return Err(CliError::Other("output already closed".to_string())),
        };

        if page.serial != encoder.serial() {
            warn!(serial = page.serial, "skipping page of another logical stream");
            stats.skipped_pages += 1;
            continue;
        }

        if page.packets.is_empty() {
            // An end page with nothing finished on it only needs writing when
            // there is a stream to close
            if page.is_end_stream() && begun {
                let none: [&[u8]; 0] = [];
                encoder.write_packets(PageFlags::END_STREAM, page.granule_position, &none)?;
                stats.pages_written += 1;
                break;
            }
            // Otherwise the packet comes out whole on a later page
            continue;
        }

        let mut kind = PageFlags::empty();
        if !begun {
            kind |= PageFlags::BEGIN_STREAM;
            begun = true;
        }
        if page.is_end_stream() {
            kind |= PageFlags::END_STREAM;
        }

        let before = encoder.sequence();
        encoder.write_packets(kind, page.granule_position, &page.packets)?;
        stats.pages_written += u64::from(encoder.sequence().wrapping_sub(before));
        stats.packets += page.packets.len() as u64;

        if page.is_end_stream() {
            break;
        }
    }

    match encoder {
        Some(mut encoder) => encoder.get_mut().flush()?,
        None => {
            if let Some(mut w) = writer {
                w.flush()?;
            }
        }
    }
    Ok(stats)
}

/// List the pages of each file
pub fn command_inspect(
    patterns: &[String],
    with_data: bool,
    formatter: &OutputFormatter,
) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in expand_files(patterns)? {
        let file = match open_file(&path) {
            Ok(file) => file,
            Err(e) => {
                formatter.print_error(&e.to_string());
                continue;
            }
        };
        let name = path.display().to_string();
        let mut decoder = Decoder::new(BufReader::new(file));

        loop {
            let page = match decoder.decode() {
                Ok(page) => page,
                Err(OggError::EndOfStream) => break,
                Err(e @ (OggError::BadChecksum { .. } | OggError::BadSegmentCount)) => {
                    formatter.print_error(&format!("{}: {}", name, e));
                    continue;
                }
                Err(e) => {
                    formatter.print_error(&format!("{}: {}", name, e));
                    break;
                }
            };

            let mut owned = page.to_owned_page();
            if !with_data {
                owned.packets.clear();
            }
            let record = PageRecord {
                file: &name,
                segments: page.segment_table.len(),
                packet_sizes: page.packets.iter().map(|p| p.len()).collect(),
                page: owned,
            };
            formatter.output_record(&record, &mut out)?;
        }
    }
    Ok(())
}

/// Summarize each file
pub fn command_info(patterns: &[String], formatter: &OutputFormatter) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in expand_files(patterns)? {
        match summarize_file(&path) {
            Ok(summary) => formatter.output_record(&summary, &mut out)?,
            Err(e) => formatter.print_error(&e.to_string()),
        }
    }
    Ok(())
}

pub fn summarize_file(path: &Path) -> CliResult<FileSummary> {
    let file = open_file(path)?;
    let metadata = file.metadata()?;

    let mut summary = summarize_stream(BufReader::new(file))?;
    summary.file = path.display().to_string();
    summary.size = metadata.len();
    summary.modified = metadata.modified().ok().map(|mtime| {
        let datetime: chrono::DateTime<chrono::Utc> = mtime.into();
        datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    });
    Ok(summary)
}

/// Walk every page, resyncing past damaged ones
pub fn summarize_stream<R: Read>(reader: R) -> CliResult<FileSummary> {
    let mut decoder = Decoder::new(reader);
    let mut summary = FileSummary {
        mime_type: oggframe::MIME_TYPE,
        ..FileSummary::default()
    };

    loop {
        match decoder.decode() {
            Ok(page) => {
                summary.pages += 1;
                summary.streams.insert(page.serial);
                summary.packets += page.packets.len() as u64;
                summary.payload_bytes +=
                    page.segment_table.iter().map(|&v| u64::from(v)).sum::<u64>();
            }
            Err(OggError::EndOfStream) => break,
            Err(OggError::BadChecksum { .. } | OggError::BadSegmentCount) => {
                summary.bad_pages += 1;
            }
            Err(OggError::UnexpectedEndOfStream) => {
                summary.truncated = true;
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(summary)
}

fn open_file(path: &Path) -> CliResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CliError::FileNotFound(path.display().to_string()),
        _ => CliError::IoError(e),
    })
}

/// Expand glob patterns; plain paths are passed through untouched
pub fn expand_files(patterns: &[String]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if !pattern.contains(&['*', '?', '['][..]) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let before = files.len();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("error reading path: {}", e),
            }
        }
        if files.len() == before {
            warn!(pattern = %pattern, "no files match pattern");
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oggframe::MAX_PAGE_SIZE;

    fn sample_stream() -> Vec<u8> {
        let mut encoder = Encoder::new(7, Vec::new());
        encoder.encode_begin(0, &[b"head".as_slice()]).unwrap();
        encoder.encode(10, &[vec![1u8; 70_000]]).unwrap();
        encoder.encode_end(20, &[b"tail".as_slice(), b"end"]).unwrap();
        encoder.into_inner()
    }

    #[test]
    fn test_copy_preserves_packets() {
        let input = sample_stream();
        let mut output = Vec::new();
        let stats = copy_stream(input.as_slice(), &mut output).unwrap();
        assert_eq!(stats.pages_read, 4);
        assert_eq!(stats.packets, 4);
        assert_eq!(stats.skipped_pages, 0);

        // A single logical stream written page-for-page comes back identical
        assert_eq!(output, input);
    }

    #[test]
    fn test_copy_skips_other_streams() {
        let input = sample_stream();
        let mut other = Encoder::new(99, Vec::new());
        other.encode_begin(0, &[b"noise".as_slice()]).unwrap();
        let other = other.into_inner();
        let mut mixed = Vec::new();
        let first_page_len = 27 + 1 + 4;
        mixed.extend_from_slice(&input[..first_page_len]);
        mixed.extend_from_slice(&other);
        mixed.extend_from_slice(&input[first_page_len..]);

        let mut output = Vec::new();
        let stats = copy_stream(mixed.as_slice(), &mut output).unwrap();
        assert_eq!(stats.skipped_pages, 1);
        assert_eq!(output, input);
    }

    #[test]
    fn test_copy_keeps_split_packet_across_other_stream() {
        let mut ours = Encoder::new(7, Vec::new());
        ours.encode_begin(0, &[vec![3u8; 70_000]]).unwrap();
        let ours = ours.into_inner();
        let mut theirs = Encoder::new(99, Vec::new());
        theirs.encode_begin(0, &[b"noise".as_slice()]).unwrap();

        let mut mixed = ours[..MAX_PAGE_SIZE].to_vec();
        mixed.extend_from_slice(theirs.get_ref());
        mixed.extend_from_slice(&ours[MAX_PAGE_SIZE..]);

        let mut output = Vec::new();
        let stats = copy_stream(mixed.as_slice(), &mut output).unwrap();
        assert_eq!(stats.skipped_pages, 1);
        assert_eq!(stats.packets, 1);
        assert_eq!(stats.pages_written, 2);
        assert_eq!(output, ours);
    }

    #[test]
    fn test_copy_of_another_streams_split_packets() {
        let mut ours = Encoder::new(7, Vec::new());
        ours.encode_begin(0, &[vec![3u8; 70_000]]).unwrap();
        let ours = ours.into_inner();
        let mut theirs = Encoder::new(99, Vec::new());
        theirs.encode(0, &[vec![4u8; 70_000]]).unwrap();
        let theirs = theirs.into_inner();

        let mut mixed = ours[..MAX_PAGE_SIZE].to_vec();
        mixed.extend_from_slice(&theirs);
        mixed.extend_from_slice(&ours[MAX_PAGE_SIZE..]);

        let mut output = Vec::new();
        let stats = copy_stream(mixed.as_slice(), &mut output).unwrap();
        assert_eq!(stats.skipped_pages, 2);
        assert_eq!(output, ours);
    }

    // Second page of a packet split with the end flag set: on its own it
    // holds no finished packet
    fn orphan_end_page() -> Vec<u8> {
        let mut encoder = Encoder::new(7, Vec::new());
        encoder.encode_end(5, &[vec![1u8; 70_000]]).unwrap();
        encoder.into_inner()[MAX_PAGE_SIZE..].to_vec()
    }

    #[test]
    fn test_copy_ignores_lone_empty_end_page() {
        let mut output = Vec::new();
        let stats = copy_stream(orphan_end_page().as_slice(), &mut output).unwrap();
        assert_eq!(stats.pages_read, 1);
        assert_eq!(stats.pages_written, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_copy_closes_stream_with_bare_end_page() {
        let mut input = Encoder::new(7, Vec::new());
        input.encode_begin(0, &[b"head".as_slice()]).unwrap();
        let mut input = input.into_inner();
        let head_len = input.len();
        input.extend_from_slice(&orphan_end_page());

        let mut output = Vec::new();
        let stats = copy_stream(input.as_slice(), &mut output).unwrap();
        assert_eq!(stats.pages_written, 2);
        assert_eq!(stats.packets, 1);
        assert_eq!(&output[..head_len], &input[..head_len]);

        let end = oggframe::PageHeader::parse(&output[head_len..]).unwrap();
        assert_eq!(end.flags, PageFlags::END_STREAM);
        assert_eq!(end.granule_position, 5);
        assert_eq!(end.segment_count, 1);
    }

    #[test]
    fn test_summarize_counts_bad_pages() {
        let mut input = sample_stream();
        // corrupt the checksum of the first page
        input[22] ^= 0xff;
        let summary = summarize_stream(input.as_slice()).unwrap();
        assert_eq!(summary.bad_pages, 1);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.streams.into_iter().collect::<Vec<_>>(), vec![7]);
        assert!(!summary.truncated);
    }

    #[test]
    fn test_summarize_truncated() {
        let input = sample_stream();
        let summary = summarize_stream(&input[..input.len() - 1]).unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.mime_type, "application/ogg");
    }

    #[test]
    fn test_expand_plain_paths() {
        let files = expand_files(&["a.ogg".to_string(), "b.ogg".to_string()]).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.ogg"), PathBuf::from("b.ogg")]);
    }

    #[test]
    fn test_expand_rejects_bad_pattern() {
        assert!(matches!(
            expand_files(&["[".to_string()]),
            Err(CliError::InvalidPattern(_))
        ));
    }
}
