use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field is surfaced. Comments, `event`, `id` and `retry`
/// fields are skipped, and events without any data are dropped.
pub struct Sse {
    buf: Vec<u8>,
    // Bytes of `buf` already searched for an event terminator.
    scanned: usize,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            chunks,
            exhausted: false,
        }
    }

    /// Returns the data of the next event, or `None` once the underlying
    /// stream has ended. A trailing event without its terminating blank
    /// line is discarded.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete events from the buffer before reading more,
            // a single chunk may carry several of them.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        // end-of-line   = ( cr lf / lf )
        while let Some((block_end, consumed)) =
            find_event_end(&self.buf, self.scanned)
        {
            let block: Vec<u8> = self.buf.drain(..consumed).collect();
            self.scanned = 0;
            // Decode only whole events, so that multi-byte characters split
            // across chunks are reassembled first.
            let Ok(block) = str::from_utf8(&block[..block_end]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.split('\n') {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                if field != "data" {
                    continue;
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            if data.is_some() {
                return Ok(data);
            }
        }
        self.scanned = self.buf.len();
        Ok(None)
    }
}

/// Finds the first blank line, returning where the event block ends and how
/// many bytes the block plus its terminator occupy.
///
/// The first `scanned` bytes are known to hold no terminator. Only the last
/// two of them are searched again, since a terminator may straddle the old
/// end of the buffer.
fn find_event_end(buf: &[u8], scanned: usize) -> Option<(usize, usize)> {
    let start = scanned.saturating_sub(2).min(buf.len());
    let tail = &buf[start..];
    let lf = find(tail, b"\n\n").map(|idx| (start + idx, start + idx + 2));
    let crlf =
        find(tail, b"\n\r\n").map(|idx| (start + idx, start + idx + 3));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

#[inline]
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
