use core::mem;
use std::borrow::Cow;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::split::{Fragment, SplitError};

/// The separator used when none is configured.
pub const DEFAULT_SEPARATOR: char = '§';

/// Which half of the stream the splitter is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitMode {
    /// Buffering text while looking for the separator.
    ScanningTitle,
    /// The separator has been seen; text is forwarded as it arrives.
    EmittingAnswer,
}

/// Incrementally partitions a chunked text stream into a title and an answer.
///
/// The upstream model is prompted to write a short title, then a reserved
/// separator character, then the answer. Chunk boundaries are arbitrary and
/// may fall anywhere, including right before or after the separator. The
/// splitter buffers only the title; once the separator has been seen every
/// chunk is forwarded as an [`Fragment::Answer`] immediately.
///
/// Only the first separator is structural. Later occurrences are part of the
/// answer.
///
/// # Example
///
/// ```
/// use chatflake::{Fragment, StreamSplitter};
///
/// let mut splitter = StreamSplitter::new('§');
/// assert!(splitter.feed("Gree").unwrap().is_empty());
/// assert_eq!(
///     splitter.feed("tings§Hel").unwrap(),
///     vec![Fragment::Title("Greetings".into()), Fragment::Answer("Hel".into())]
/// );
/// assert_eq!(splitter.feed("lo").unwrap(), vec![Fragment::Answer("lo".into())]);
/// splitter.finish().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct StreamSplitter {
    separator: char,
    max_title_len: Option<usize>,
    mode: SplitMode,
    pending: String,
    // Bytes of `pending` already searched without finding the separator.
    scanned: usize,
    // Incomplete trailing UTF-8 sequence from `feed_bytes`.
    partial: Vec<u8>,
    bytes_seen: u64,
}

impl Default for StreamSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl StreamSplitter {
    /// Creates a splitter looking for `separator`, with an unbounded title.
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            max_title_len: None,
            mode: SplitMode::ScanningTitle,
            pending: String::new(),
            scanned: 0,
            partial: Vec::new(),
            bytes_seen: 0,
        }
    }

    /// Caps the buffered title at `limit` bytes.
    ///
    /// Once more than `limit` bytes arrive without a separator, [`feed`]
    /// fails with [`SplitError::TitleTooLong`] instead of buffering a
    /// response that never names its title.
    ///
    /// [`feed`]: Self::feed
    #[must_use]
    pub fn with_max_title_len(mut self, limit: usize) -> Self {
        self.max_title_len = Some(limit);
        self
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    /// Feeds one chunk and returns the fragments it completes, in order.
    ///
    /// While scanning, the returned list is empty until the separator
    /// arrives; the chunk that carries it yields the whole title and, if
    /// anything follows the separator in that chunk, the first answer
    /// fragment. After that every non-empty chunk yields exactly one answer
    /// fragment with the chunk's text unchanged. Empty chunks are accepted
    /// and produce nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::TitleTooLong`] when a title limit is set and
    /// exceeded.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, chunk), fields(len = chunk.len())))]
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Fragment>, SplitError> {
        match self.mode {
            SplitMode::EmittingAnswer => Ok(answer(chunk.to_owned()).into_iter().collect()),
            SplitMode::ScanningTitle => self.scan(chunk),
        }
    }

    /// Feeds raw bytes, reassembling UTF-8 sequences split across chunks.
    ///
    /// An incomplete sequence at the end of `bytes` is held back and
    /// completed by the next call.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidUtf8`] on malformed input, or anything
    /// [`feed`](Self::feed) returns.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Vec<Fragment>, SplitError> {
        let joined: Cow<'_, [u8]> = if self.partial.is_empty() {
            Cow::Borrowed(bytes)
        } else {
            let mut joined = mem::take(&mut self.partial);
            joined.extend_from_slice(bytes);
            Cow::Owned(joined)
        };
        let start = self.bytes_seen;
        self.bytes_seen += bytes.len() as u64;

        match core::str::from_utf8(&joined) {
            Ok(text) => self.feed(text),
            Err(err) if err.error_len().is_some() => Err(SplitError::InvalidUtf8 {
                offset: start + err.valid_up_to() as u64
                    - (joined.len() - bytes.len()) as u64,
            }),
            Err(err) => {
                let (head, tail) = joined.split_at(err.valid_up_to());
                self.partial = tail.to_vec();
                // SAFETY: `from_utf8` validated every byte before `valid_up_to`.
                let text = unsafe { core::str::from_utf8_unchecked(head) };
                self.feed(text)
            }
        }
    }

    /// Signals the end of the stream.
    ///
    /// # Errors
    ///
    /// - [`SplitError::TruncatedUtf8`] if [`feed_bytes`](Self::feed_bytes)
    ///   was left holding part of a character.
    /// - [`SplitError::MissingSeparator`] if the separator never arrived.
    ///   The buffered title is discarded.
    pub fn finish(self) -> Result<(), SplitError> {
        if !self.partial.is_empty() {
            return Err(SplitError::TruncatedUtf8 {
                pending: self.partial.len(),
            });
        }
        match self.mode {
            SplitMode::EmittingAnswer => Ok(()),
            SplitMode::ScanningTitle => {
                #[cfg(feature = "tracing")]
                tracing::debug!(buffered = self.pending.len(), "stream ended before separator");
                Err(SplitError::MissingSeparator {
                    separator: self.separator,
                    buffered: self.pending.len(),
                })
            }
        }
    }

    fn scan(&mut self, chunk: &str) -> Result<Vec<Fragment>, SplitError> {
        self.pending.push_str(chunk);

        let Some(found) = self.pending[self.scanned..].find(self.separator) else {
            self.scanned = self.pending.len();
            return match self.max_title_len {
                Some(limit) if self.pending.len() > limit => Err(SplitError::TitleTooLong { limit }),
                _ => Ok(Vec::new()),
            };
        };

        let at = self.scanned + found;
        if let Some(limit) = self.max_title_len {
            if at > limit {
                return Err(SplitError::TitleTooLong { limit });
            }
        }

        let rest = self.pending.split_off(at + self.separator.len_utf8());
        self.pending.truncate(at);
        let title = mem::take(&mut self.pending);
        self.scanned = 0;
        self.mode = SplitMode::EmittingAnswer;

        let mut out = Vec::with_capacity(2);
        out.push(Fragment::Title(title));
        out.extend(answer(rest));
        Ok(out)
    }
}

fn answer(text: String) -> Option<Fragment> {
    (!text.is_empty()).then_some(Fragment::Answer(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(splitter: &mut StreamSplitter, chunks: &[&str]) -> Vec<Fragment> {
        chunks
            .iter()
            .flat_map(|chunk| splitter.feed(chunk).unwrap())
            .collect()
    }

    fn title_and_answer(fragments: &[Fragment]) -> (String, String) {
        let mut title = None;
        let mut answer = String::new();
        for fragment in fragments {
            match fragment {
                Fragment::Title(text) => {
                    assert!(title.is_none(), "second title emitted");
                    assert!(answer.is_empty(), "title emitted after answer");
                    title = Some(text.clone());
                }
                Fragment::Answer(text) => {
                    assert!(title.is_some(), "answer emitted before title");
                    assert!(!text.is_empty(), "empty answer fragment");
                    answer.push_str(text);
                }
            }
        }
        (title.expect("no title emitted"), answer)
    }

    #[test]
    fn splits_separator_mid_chunk() {
        let mut splitter = StreamSplitter::new('§');
        let fragments = run(&mut splitter, &["Greet", "ings§Hel", "lo"]);
        assert_eq!(
            fragments,
            vec![
                Fragment::Title("Greetings".into()),
                Fragment::Answer("Hel".into()),
                Fragment::Answer("lo".into()),
            ]
        );
        assert_eq!(splitter.mode(), SplitMode::EmittingAnswer);
        splitter.finish().unwrap();
    }

    #[test]
    fn separator_as_whole_chunk() {
        let mut splitter = StreamSplitter::default();
        assert!(splitter.feed("Title").unwrap().is_empty());
        assert_eq!(splitter.feed("§").unwrap(), vec![Fragment::Title("Title".into())]);
        assert_eq!(splitter.feed("Body").unwrap(), vec![Fragment::Answer("Body".into())]);
        splitter.finish().unwrap();
    }

    #[test]
    fn separator_at_chunk_edges() {
        let mut ends = StreamSplitter::default();
        assert_eq!(ends.feed("T§").unwrap(), vec![Fragment::Title("T".into())]);
        assert_eq!(ends.feed("A").unwrap(), vec![Fragment::Answer("A".into())]);

        let mut starts = StreamSplitter::default();
        assert!(starts.feed("T").unwrap().is_empty());
        assert_eq!(
            starts.feed("§A").unwrap(),
            vec![Fragment::Title("T".into()), Fragment::Answer("A".into())]
        );
    }

    #[test]
    fn empty_and_whitespace_titles_are_kept() {
        let mut empty = StreamSplitter::default();
        assert_eq!(
            empty.feed("§Answer").unwrap(),
            vec![Fragment::Title(String::new()), Fragment::Answer("Answer".into())]
        );

        let mut blank = StreamSplitter::default();
        let (title, answer) = title_and_answer(&run(&mut blank, &["  ", "§", " x"]));
        assert_eq!(title, "  ");
        assert_eq!(answer, " x");
    }

    #[test]
    fn later_separators_belong_to_the_answer() {
        let mut splitter = StreamSplitter::default();
        let fragments = run(&mut splitter, &["A§B§", "C§"]);
        assert_eq!(
            fragments,
            vec![
                Fragment::Title("A".into()),
                Fragment::Answer("B§".into()),
                Fragment::Answer("C§".into()),
            ]
        );
    }

    #[test]
    fn answer_text_is_forwarded_unchanged() {
        let mut splitter = StreamSplitter::default();
        splitter.feed("t§").unwrap();
        for chunk in ["  leading", "\n\n", "trailing  ", "\t"] {
            assert_eq!(splitter.feed(chunk).unwrap(), vec![Fragment::Answer(chunk.into())]);
        }
    }

    #[test]
    fn empty_chunks_emit_nothing() {
        let mut splitter = StreamSplitter::default();
        assert!(splitter.feed("").unwrap().is_empty());
        splitter.feed("a§").unwrap();
        assert!(splitter.feed("").unwrap().is_empty());
        splitter.finish().unwrap();
    }

    #[test]
    fn missing_separator_fails_on_finish() {
        let mut splitter = StreamSplitter::new('|');
        assert!(run(&mut splitter, &["no ", "boundary"]).is_empty());
        assert_eq!(
            splitter.finish(),
            Err(SplitError::MissingSeparator {
                separator: '|',
                buffered: 11,
            })
        );

        assert!(matches!(
            StreamSplitter::default().finish(),
            Err(SplitError::MissingSeparator { buffered: 0, .. })
        ));
    }

    #[test]
    fn title_limit_enforced() {
        let mut splitter = StreamSplitter::default().with_max_title_len(4);
        assert!(splitter.feed("abcd").unwrap().is_empty());
        assert_eq!(splitter.feed("e"), Err(SplitError::TitleTooLong { limit: 4 }));

        let mut found_late = StreamSplitter::default().with_max_title_len(4);
        assert_eq!(found_late.feed("abcde§x"), Err(SplitError::TitleTooLong { limit: 4 }));

        let mut at_limit = StreamSplitter::default().with_max_title_len(4);
        assert_eq!(
            at_limit.feed("abcd§x").unwrap(),
            vec![Fragment::Title("abcd".into()), Fragment::Answer("x".into())]
        );
    }

    #[test]
    fn every_chunking_yields_the_same_split() {
        let text = "Rust ownership § Ownership means each value has one owner §§ done.";
        let expected = (
            "Rust ownership ".to_owned(),
            " Ownership means each value has one owner §§ done.".to_owned(),
        );
        let chars: Vec<char> = text.chars().collect();

        for width in 1..=chars.len() {
            let chunks: Vec<String> = chars.chunks(width).map(|c| c.iter().collect()).collect();
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let mut splitter = StreamSplitter::default();
            let fragments = run(&mut splitter, &refs);
            assert_eq!(title_and_answer(&fragments), expected, "chunk width {width}");
            splitter.finish().unwrap();
        }
    }

    #[test]
    fn feed_bytes_reassembles_split_characters() {
        let text = "Caf\u{e9}§na\u{ef}ve \u{1f980}";
        let bytes = text.as_bytes();

        for width in 1..=bytes.len() {
            let mut splitter = StreamSplitter::default();
            let fragments: Vec<Fragment> = bytes
                .chunks(width)
                .flat_map(|chunk| splitter.feed_bytes(chunk).unwrap())
                .collect();
            let (title, answer) = title_and_answer(&fragments);
            assert_eq!(title, "Caf\u{e9}", "chunk width {width}");
            assert_eq!(answer, "na\u{ef}ve \u{1f980}", "chunk width {width}");
            splitter.finish().unwrap();
        }
    }

    #[test]
    fn feed_bytes_rejects_invalid_utf8() {
        let mut splitter = StreamSplitter::default();
        splitter.feed_bytes(b"ok").unwrap();
        assert_eq!(
            splitter.feed_bytes(&[b'a', 0xff, b'b']),
            Err(SplitError::InvalidUtf8 { offset: 3 })
        );
    }

    #[test]
    fn finish_rejects_truncated_character() {
        let mut splitter = StreamSplitter::default();
        splitter.feed_bytes("t§".as_bytes()).unwrap();
        splitter.feed_bytes(&"\u{1f980}".as_bytes()[..2]).unwrap();
        assert_eq!(splitter.finish(), Err(SplitError::TruncatedUtf8 { pending: 2 }));
    }
}
