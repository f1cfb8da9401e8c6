//! A forward-only buffered window over a [`Read`] implementation.
//!
//! Only bytes ahead of the cursor are kept. Lookahead through [`Source::peek_at`]
//! grows the window without consuming anything, which is how the object reader
//! tells `1 0 R` apart from two separate numbers without seeking.

use std::io::{self, ErrorKind, Read};

const CHUNK_SIZE: usize = 8192;

pub(crate) struct Source<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    /// Absolute stream position of `buf[0]`.
    offset: u64,
    eof: bool,
}

impl<R: Read> Source<R> {
    pub(crate) fn new(inner: R) -> Self {
        Source {
            inner,
            buf: Vec::new(),
            pos: 0,
            offset: 0,
            eof: false,
        }
    }

    /// Absolute position of the cursor in the underlying stream.
    pub(crate) fn position(&self) -> u64 {
        self.offset + self.pos as u64
    }

    /// Bytes currently buffered ahead of the cursor.
    pub(crate) fn window(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Reads one more chunk into the window. Returns `false` at end of input.
    pub(crate) fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.offset += self.pos as u64;
            self.pos = 0;
        }
        let len = self.buf.len();
        self.buf.resize(len + CHUNK_SIZE, 0);
        loop {
            match self.inner.read(&mut self.buf[len..]) {
                Ok(0) => {
                    self.buf.truncate(len);
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.truncate(len + n);
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(len);
                    return Err(e);
                }
            }
        }
    }

    /// Makes sure at least `n` bytes are buffered ahead of the cursor.
    /// Returns `false` if the input ends first.
    pub(crate) fn ensure(&mut self, n: usize) -> io::Result<bool> {
        while self.buf.len() - self.pos < n {
            if !self.fill()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn peek(&mut self) -> io::Result<Option<u8>> {
        self.peek_at(0)
    }

    /// The byte `i` positions ahead of the cursor, without consuming it.
    pub(crate) fn peek_at(&mut self, i: usize) -> io::Result<Option<u8>> {
        if self.ensure(i + 1)? {
            Ok(Some(self.buf[self.pos + i]))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let b = self.peek()?;
        if b.is_some() {
            self.pos += 1;
        }
        Ok(b)
    }

    /// Consumes `n` bytes that are already buffered.
    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.buf.len());
        self.pos = (self.pos + n).min(self.buf.len());
    }

    /// Whether the next bytes are exactly `s`.
    pub(crate) fn starts_with(&mut self, s: &[u8]) -> io::Result<bool> {
        Ok(self.ensure(s.len())? && self.window().starts_with(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most three bytes per read, to exercise refills.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.0.len().min(out.len()).min(3);
            out[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn lookahead_survives_refills() {
        let mut source = Source::new(Trickle(b"12 0 R trailing"));
        assert_eq!(source.peek_at(5).unwrap(), Some(b'R'));
        assert_eq!(source.position(), 0);
        assert!(source.ensure(7).unwrap());
        source.advance(7);
        assert_eq!(source.position(), 7);
        assert!(source.starts_with(b"trailing").unwrap());
        assert!(!source.starts_with(b"trailing!").unwrap());
        assert_eq!(source.peek_at(100).unwrap(), None);
    }

    #[test]
    fn next_byte_stops_at_end() {
        let mut source = Source::new(&b"ab"[..]);
        assert_eq!(source.next_byte().unwrap(), Some(b'a'));
        assert_eq!(source.next_byte().unwrap(), Some(b'b'));
        assert_eq!(source.next_byte().unwrap(), None);
        assert_eq!(source.position(), 2);
    }
}
