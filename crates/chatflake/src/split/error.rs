/// Errors raised by a [`StreamSplitter`].
///
/// All variants are terminal: the splitter that produced one must be dropped,
/// and nothing it emitted so far should be treated as a usable title/answer
/// pair.
///
/// [`StreamSplitter`]: crate::split::StreamSplitter
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SplitError {
    /// The stream completed without ever producing the separator, so there is
    /// no boundary between title and answer.
    #[error("no boundary found: stream ended without separator {separator:?} ({buffered} bytes buffered)")]
    MissingSeparator { separator: char, buffered: usize },

    /// The title grew past the configured limit before the separator arrived.
    #[error("title exceeded {limit} bytes before the separator")]
    TitleTooLong { limit: usize },

    /// Raw byte input was not valid UTF-8.
    #[error("stream is not valid UTF-8 (at byte {offset})")]
    InvalidUtf8 { offset: u64 },

    /// Raw byte input ended in the middle of a UTF-8 sequence.
    #[error("stream ended inside a UTF-8 sequence ({pending} bytes pending)")]
    TruncatedUtf8 { pending: usize },
}
