//! Byte-to-line framing for AT command output.
//!
//! Modems emit `\r\n`-delimited lines, plus a bare prompt character (usually
//! `>`) when they are waiting for payload data after commands such as
//! `AT+CMGS` or `AT+USOWR`. The prompt is never followed by a line ending,
//! so it has to act as a terminator of its own.

use atmodem_core::Line;

/// Default upper bound on a single line, in bytes.
///
/// AT responses are normally well under 1 KiB; hex-encoded socket reads are
/// the longest legitimate lines. 4096 leaves generous headroom.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Result of feeding one byte into the [`LineFramer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameResult {
    /// The byte was buffered (or was a redundant terminator).
    Pending,

    /// A line was completed.
    Line(Line),

    /// The buffer grew past the limit without a terminator and was discarded.
    Overflow {
        /// Number of bytes thrown away, including the byte that overflowed.
        discarded: usize,
    },
}

/// Incremental line framer.
///
/// Fed one byte at a time, in arrival order, from the reader task.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    prompt: Option<u8>,
    max_len: usize,
    overflows: u64,
}

impl LineFramer {
    /// Create a framer. `prompt` enables prompt mode with the given
    /// character; `None` frames on CR/LF only.
    pub fn new(prompt: Option<u8>, max_len: usize) -> Self {
        LineFramer {
            buf: Vec::new(),
            prompt,
            max_len,
            overflows: 0,
        }
    }

    /// Feed one byte.
    ///
    /// - `\r` / `\n`: flush a non-empty buffer as a line; an empty buffer
    ///   produces nothing, so `\r\n` pairs and blank lines are absorbed.
    /// - the prompt character (prompt mode only): append, then flush, unless
    ///   that takes the line past the limit.
    /// - anything else: append.
    pub fn feed(&mut self, byte: u8) -> FrameResult {
        match byte {
            b'\r' | b'\n' => {
                if self.buf.is_empty() {
                    FrameResult::Pending
                } else {
                    FrameResult::Line(self.take_line())
                }
            }
            b if Some(b) == self.prompt => {
                self.buf.push(b);
                if self.buf.len() > self.max_len {
                    self.overflow()
                } else {
                    FrameResult::Line(self.take_line())
                }
            }
            b => {
                self.buf.push(b);
                if self.buf.len() > self.max_len {
                    self.overflow()
                } else {
                    FrameResult::Pending
                }
            }
        }
    }

    /// Feed a slice, collecting every completed line.
    ///
    /// Overflows are counted but otherwise skipped; use [`feed`](Self::feed)
    /// directly to observe them.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Line> {
        bytes
            .iter()
            .filter_map(|&b| match self.feed(b) {
                FrameResult::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Bytes buffered for the line in progress.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Number of overflows since construction.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// The configured prompt character, if prompt mode is enabled.
    pub fn prompt(&self) -> Option<u8> {
        self.prompt
    }

    fn overflow(&mut self) -> FrameResult {
        let discarded = self.buf.len();
        self.buf.clear();
        self.overflows += 1;
        FrameResult::Overflow { discarded }
    }

    fn take_line(&mut self) -> Line {
        let line = Line::from_bytes(&self.buf);
        self.buf.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framer() -> LineFramer {
        LineFramer::new(None, DEFAULT_MAX_LINE_LEN)
    }

    fn prompt_framer() -> LineFramer {
        LineFramer::new(Some(b'>'), DEFAULT_MAX_LINE_LEN)
    }

    // -----------------------------------------------------------------------
    // CR/LF termination
    // -----------------------------------------------------------------------

    #[test]
    fn no_terminator_never_emits() {
        let mut f = framer();
        for &b in b"+CSQ: 20,99 and more text without an end" {
            assert_eq!(f.feed(b), FrameResult::Pending);
        }
        assert_eq!(f.pending(), b"+CSQ: 20,99 and more text without an end");
    }

    #[test]
    fn crlf_emits_exactly_one_line() {
        let mut f = framer();
        let lines = f.feed_all(b"OK\r\n");
        assert_eq!(lines, vec![Line::from("OK")]);
        assert!(f.pending().is_empty());
    }

    #[test]
    fn bare_lf_terminates() {
        let mut f = framer();
        assert_eq!(f.feed_all(b"OK\n"), vec![Line::from("OK")]);
    }

    #[test]
    fn bare_cr_terminates() {
        let mut f = framer();
        assert_eq!(f.feed_all(b"OK\r"), vec![Line::from("OK")]);
    }

    #[test]
    fn blank_lines_are_absorbed() {
        let mut f = framer();
        let lines = f.feed_all(b"\r\n\r\n+CSQ: 20,99\r\n\r\nOK\r\n");
        assert_eq!(lines, vec![Line::from("+CSQ: 20,99"), Line::from("OK")]);
    }

    #[test]
    fn terminator_on_empty_buffer_is_pending() {
        let mut f = framer();
        assert_eq!(f.feed(b'\r'), FrameResult::Pending);
        assert_eq!(f.feed(b'\n'), FrameResult::Pending);
    }

    #[test]
    fn line_split_across_feeds() {
        let mut f = framer();
        assert!(f.feed_all(b"+CS").is_empty());
        assert!(f.feed_all(b"Q: 20").is_empty());
        assert_eq!(f.feed_all(b",99\r\n"), vec![Line::from("+CSQ: 20,99")]);
    }

    // -----------------------------------------------------------------------
    // Prompt mode
    // -----------------------------------------------------------------------

    #[test]
    fn prompt_emits_immediately_and_is_retained() {
        let mut f = prompt_framer();
        assert_eq!(f.feed(b'O'), FrameResult::Pending);
        assert_eq!(f.feed(b'K'), FrameResult::Pending);
        assert_eq!(f.feed(b'>'), FrameResult::Line(Line::from("OK>")));
        assert!(f.pending().is_empty());
    }

    #[test]
    fn bare_prompt_is_a_line() {
        let mut f = prompt_framer();
        let lines = f.feed_all(b"\r\n> ");
        assert_eq!(lines, vec![Line::from(">")]);
        // The trailing space starts a new line in progress.
        assert_eq!(f.pending(), b" ");
    }

    #[test]
    fn prompt_char_is_plain_data_when_disabled() {
        let mut f = framer();
        assert!(f.feed_all(b"a>b").is_empty());
        assert_eq!(f.feed_all(b"\r\n"), vec![Line::from("a>b")]);
    }

    #[test]
    fn prompt_and_crlf_are_independent() {
        let mut f = prompt_framer();
        let lines = f.feed_all(b"AT+CMGS=\"123\"\r\n> ");
        assert_eq!(
            lines,
            vec![Line::from("AT+CMGS=\"123\""), Line::from(">")]
        );
    }

    // -----------------------------------------------------------------------
    // Overflow
    // -----------------------------------------------------------------------

    #[test]
    fn overflow_discards_and_resumes() {
        let mut f = LineFramer::new(None, 4);
        assert!(f.feed_all(b"ABCD").is_empty());
        assert_eq!(f.feed(b'E'), FrameResult::Overflow { discarded: 5 });
        assert!(f.pending().is_empty());
        assert_eq!(f.overflows(), 1);

        // Framing resumes cleanly on the next line.
        assert_eq!(f.feed_all(b"OK\r\n"), vec![Line::from("OK")]);
    }

    #[test]
    fn line_at_exact_limit_is_accepted() {
        let mut f = LineFramer::new(None, 4);
        assert_eq!(f.feed_all(b"ABCD\r\n"), vec![Line::from("ABCD")]);
        assert_eq!(f.overflows(), 0);
    }

    #[test]
    fn prompt_line_respects_limit() {
        let mut f = LineFramer::new(Some(b'>'), 4);
        assert_eq!(f.feed_all(b"ABC>"), vec![Line::from("ABC>")]);

        assert!(f.feed_all(b"ABCD").is_empty());
        assert_eq!(f.feed(b'>'), FrameResult::Overflow { discarded: 5 });
        assert!(f.pending().is_empty());
        assert_eq!(f.overflows(), 1);
        assert_eq!(f.feed_all(b">"), vec![Line::from(">")]);
    }

    #[test]
    fn prompt_accessor() {
        assert_eq!(prompt_framer().prompt(), Some(b'>'));
        assert_eq!(framer().prompt(), None);
    }
}
