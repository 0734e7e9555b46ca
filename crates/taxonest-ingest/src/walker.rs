//! Forward-only XML event stream
//!
//! Wraps a `quick-xml` async reader and reduces the document to open/close
//! events for one designated tag. The event buffer is reused between reads,
//! so memory stays bounded by the size of a single tag regardless of how
//! large the document is.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::io::AsyncBufRead;

use crate::config::TreeConfig;
use crate::error::{ImportError, Result};

/// Structural event for an element with the designated tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// Element opened; carries the decoded label attribute if present
    Open { label: Option<String> },
    /// Innermost open designated element closed
    Close,
}

/// Pulls [`TreeEvent`]s out of a markup stream in document order.
pub struct StreamWalker<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    element: Vec<u8>,
    label_attribute: Vec<u8>,
    /// Open elements of any tag, used to detect truncated input
    open_elements: usize,
    /// `<tag/>` yields an open now and a close on the following call
    pending_close: bool,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> StreamWalker<R> {
    pub fn new(input: R, config: &TreeConfig) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(1024),
            element: config.element_name.as_bytes().to_vec(),
            label_attribute: config.label_attribute.as_bytes().to_vec(),
            open_elements: 0,
            pending_close: false,
            finished: false,
        }
    }

    /// Next structural event, or `None` once the document is exhausted.
    ///
    /// Fails with [`ImportError::Parse`] on malformed markup, mismatched end
    /// tags, or input that ends while elements are still open.
    pub async fn next_event(&mut self) -> Result<Option<TreeEvent>> {
        if self.pending_close {
            self.pending_close = false;
            return Ok(Some(TreeEvent::Close));
        }

        if self.finished {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into_async(&mut self.buf).await {
                Ok(event) => event,
                Err(e) => return Err(parse_error(&self.reader, e)),
            };

            // `event` borrows `self.buf`; only disjoint fields are touched below
            match event {
                Event::Start(start) => {
                    self.open_elements += 1;
                    let label = read_label(&self.reader, &self.label_attribute, &start)?;
                    if start.name().as_ref() == self.element.as_slice() {
                        return Ok(Some(TreeEvent::Open { label }));
                    }
                },
                Event::Empty(start) => {
                    let label = read_label(&self.reader, &self.label_attribute, &start)?;
                    if start.name().as_ref() == self.element.as_slice() {
                        self.pending_close = true;
                        return Ok(Some(TreeEvent::Open { label }));
                    }
                },
                Event::Text(text) => {
                    // Only validated; text content is never part of a label
                    text.unescape().map_err(|e| parse_error(&self.reader, e))?;
                },
                Event::End(end) => {
                    let Some(open) = self.open_elements.checked_sub(1) else {
                        return Err(parse_error(
                            &self.reader,
                            "end tag without matching start tag",
                        ));
                    };
                    self.open_elements = open;
                    if end.name().as_ref() == self.element.as_slice() {
                        return Ok(Some(TreeEvent::Close));
                    }
                },
                Event::Eof => {
                    if self.open_elements > 0 {
                        let message = format!(
                            "unexpected end of input with {} unclosed element(s)",
                            self.open_elements
                        );
                        return Err(parse_error(&self.reader, message));
                    }
                    self.finished = true;
                    return Ok(None);
                },
                _ => {},
            }
        }
    }
}

/// Read the label attribute of any start tag.
///
/// Every attribute is visited so that repeated or malformed attributes fail
/// the run even on elements whose label is never used.
fn read_label<R>(
    reader: &Reader<R>,
    label_attribute: &[u8],
    start: &BytesStart<'_>,
) -> Result<Option<String>> {
    let mut label = None;

    for attribute in start.attributes().with_checks(true) {
        let attribute = attribute.map_err(|e| parse_error(reader, e))?;
        if attribute.key.as_ref() != label_attribute {
            continue;
        }

        let value = attribute
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| parse_error(reader, e))?;
        label = Some(value.into_owned());
    }

    Ok(label)
}

fn parse_error<R>(reader: &Reader<R>, message: impl std::fmt::Display) -> ImportError {
    ImportError::Parse {
        position: reader.buffer_position() as u64,
        message: message.to_string(),
    }
}
