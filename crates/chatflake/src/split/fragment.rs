/// A typed piece of text emitted by a [`StreamSplitter`].
///
/// A stream yields exactly one [`Fragment::Title`] followed by zero or more
/// [`Fragment::Answer`]s. Concatenating the answers in order reproduces the
/// answer text as the model produced it.
///
/// With the `serde` feature, fragments serialize as
/// `{"kind":"title","text":"..."}`.
///
/// [`StreamSplitter`]: crate::split::StreamSplitter
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "text", rename_all = "snake_case")
)]
pub enum Fragment {
    /// Everything before the separator. May be empty or whitespace.
    Title(String),
    /// A slice of the text after the separator.
    Answer(String),
}
