//! Streaming record decoder
//!
//! Registry exports are single XML documents holding millions of `<RECORD>`
//! elements under one root, far too large to load as a tree. The decoder pulls
//! events with `quick-xml`, builds a [`RawElement`] only for the record being
//! read, and hands it to the caller by value. Nothing before the current record
//! is retained, so memory stays proportional to the largest record.
//!
//! ```no_run
//! use userou_ingest::registry::decoder::RecordDecoder;
//!
//! let decoder = RecordDecoder::from_path("17.1-EX_XML_EDR_UO.xml", "RECORD")?;
//! for element in decoder {
//!     let element = element?;
//!     println!("{} children", element.children.len());
//! }
//! # Ok::<(), userou_ingest::IngestError>(())
//! ```

use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::debug;

use super::models::RawElement;
use crate::error::{IngestError, Result};

/// Decoder reading from a file on disk, plain or gzip-compressed
pub type FileDecoder = RecordDecoder<BufReader<Box<dyn Read + Send>>>;

/// Read buffer for file sources
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Forward-only sequence of record elements
pub struct RecordDecoder<R: BufRead> {
    reader: Reader<R>,
    /// Scratch space for one event at a time, cleared before every read
    buf: Vec<u8>,
    record_tag: Vec<u8>,
    records: u64,
    finished: bool,
}

impl FileDecoder {
    /// Open an XML document, decompressing `.gz` files on the fly
    pub fn from_path(path: impl AsRef<Path>, record_tag: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;

        let source: Box<dyn Read + Send> =
            if path.extension().and_then(|s| s.to_str()) == Some("gz") {
                debug!(path = %path.display(), "Reading gzip-compressed document");
                Box::new(GzDecoder::new(file))
            } else {
                Box::new(file)
            };

        Ok(Self::new(
            BufReader::with_capacity(READ_BUFFER_SIZE, source),
            record_tag,
        ))
    }
}

impl<R: BufRead> RecordDecoder<R> {
    pub fn new(source: R, record_tag: &str) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = false;
        config.check_end_names = true;

        Self {
            reader,
            buf: Vec::with_capacity(1024),
            record_tag: record_tag.as_bytes().to_vec(),
            records: 0,
            finished: false,
        }
    }

    /// Records yielded so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Capacity of the event scratch buffer
    ///
    /// Bounded by the largest single event, never by the number of records read.
    pub fn scratch_capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Pull the next complete record, or `None` at end of document
    pub fn next_record(&mut self) -> Result<Option<RawElement>> {
        loop {
            self.buf.clear();
            let opened = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(start)) if start.name().as_ref() == self.record_tag.as_slice() => {
                    Some((element_name(&start, self.reader.buffer_position() as u64)?, false))
                },
                Ok(Event::Empty(start)) if start.name().as_ref() == self.record_tag.as_slice() => {
                    Some((element_name(&start, self.reader.buffer_position() as u64)?, true))
                },
                Ok(Event::Eof) => return Ok(None),
                Ok(_) => None,
                Err(err) => {
                    return Err(parse_error(self.reader.buffer_position() as u64, err));
                },
            };

            if let Some((tag, self_closing)) = opened {
                let element = if self_closing {
                    RawElement::new(tag)
                } else {
                    self.read_subtree(RawElement::new(tag))?
                };
                self.records += 1;
                return Ok(Some(element));
            }
        }
    }

    /// Read until the element opened by `root` is closed
    fn read_subtree(&mut self, root: RawElement) -> Result<RawElement> {
        let mut stack = vec![root];

        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;

            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(start)) => {
                    stack.push(RawElement::new(element_name(&start, position)?));
                },
                Ok(Event::Empty(start)) => {
                    let child = RawElement::new(element_name(&start, position)?);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(child);
                    }
                },
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|err| parse_error(position, err))?;
                    append_text(&mut stack, &text);
                },
                Ok(Event::CData(data)) => {
                    let text = std::str::from_utf8(&data).map_err(|err| IngestError::Parse {
                        position,
                        message: format!("CDATA is not valid UTF-8: {}", err),
                    })?;
                    append_text(&mut stack, text);
                },
                Ok(Event::End(_)) => {
                    // check_end_names guarantees the end tag matches the top of the stack
                    let Some(closed) = stack.pop() else {
                        return Err(IngestError::Parse {
                            position,
                            message: "unbalanced end tag".to_string(),
                        });
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(closed),
                        None => return Ok(closed),
                    }
                },
                Ok(Event::Eof) => {
                    let tag = stack.first().map(|e| e.tag.clone()).unwrap_or_default();
                    return Err(IngestError::Parse {
                        position,
                        message: format!("document ended inside <{}>", tag),
                    });
                },
                Ok(_) => {},
                Err(err) => return Err(parse_error(position, err)),
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = Result<RawElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            },
        }
    }
}

impl<R: BufRead> FusedIterator for RecordDecoder<R> {}

/// Text only counts while the element has no children yet
fn append_text(stack: &mut [RawElement], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        if current.children.is_empty() {
            current.text.get_or_insert_with(String::new).push_str(text);
        }
    }
}

fn element_name(start: &BytesStart<'_>, position: u64) -> Result<String> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_owned)
        .map_err(|err| IngestError::Parse {
            position,
            message: format!("element name is not valid UTF-8: {}", err),
        })
}

fn parse_error(position: u64, err: quick_xml::Error) -> IngestError {
    IngestError::Parse {
        position,
        message: err.to_string(),
    }
}
