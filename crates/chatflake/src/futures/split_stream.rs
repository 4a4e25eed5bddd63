use core::{
    pin::Pin,
    task::{Context, Poll},
};
use std::collections::VecDeque;

use ::futures::{Stream, ready};
use pin_project_lite::pin_project;

use crate::split::{Fragment, SplitError, StreamSplitter};

/// Error yielded by a [`SplitStream`].
#[derive(Debug, thiserror::Error)]
pub enum SplitStreamError<E> {
    /// The text itself could not be split.
    #[error(transparent)]
    Split(#[from] SplitError),
    /// The wrapped stream yielded an error.
    #[error("upstream failed: {0}")]
    Upstream(E),
}

pin_project! {
    /// A [`Stream`] of [`Fragment`]s produced by running a [`StreamSplitter`]
    /// over a stream of text chunks.
    ///
    /// Fragments are yielded as soon as the chunk that completes them
    /// arrives. The first error, whether from upstream or from the splitter,
    /// is yielded once and ends the stream; the rest of the upstream is not
    /// polled.
    ///
    /// Created by [`SplitStreamExt::split_title`].
    #[must_use = "streams do nothing unless polled"]
    pub struct SplitStream<S> {
        #[pin]
        inner: S,
        splitter: Option<StreamSplitter>,
        ready: VecDeque<Fragment>,
    }
}

impl<S> SplitStream<S> {
    pub fn new(inner: S, splitter: StreamSplitter) -> Self {
        Self {
            inner,
            splitter: Some(splitter),
            ready: VecDeque::new(),
        }
    }
}

impl<S, C, E> Stream for SplitStream<S>
where
    S: Stream<Item = Result<C, E>>,
    C: AsRef<str>,
{
    type Item = Result<Fragment, SplitStreamError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(fragment) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(fragment)));
            }
            let Some(splitter) = this.splitter.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => match splitter.feed(chunk.as_ref()) {
                    Ok(fragments) => this.ready.extend(fragments),
                    Err(err) => {
                        *this.splitter = None;
                        return Poll::Ready(Some(Err(err.into())));
                    }
                },
                Some(Err(err)) => {
                    *this.splitter = None;
                    return Poll::Ready(Some(Err(SplitStreamError::Upstream(err))));
                }
                None => {
                    let result = this.splitter.take().map(StreamSplitter::finish);
                    return match result {
                        Some(Err(err)) => Poll::Ready(Some(Err(err.into()))),
                        _ => Poll::Ready(None),
                    };
                }
            }
        }
    }
}

/// Adds [`split_title`](Self::split_title) to every fallible text stream.
pub trait SplitStreamExt: Stream + Sized {
    /// Splits this stream into a title and answer fragments.
    ///
    /// # Example
    ///
    /// ```
    /// use chatflake::{Fragment, SplitStreamExt, StreamSplitter};
    /// use futures::{StreamExt, executor::block_on, stream};
    ///
    /// let chunks = stream::iter(["Hi", "§the", "re"].map(Ok::<_, ()>));
    /// let fragments: Vec<_> = block_on(chunks.split_title(StreamSplitter::default()).collect());
    /// assert_eq!(fragments[0].as_ref().unwrap(), &Fragment::Title("Hi".into()));
    /// assert_eq!(fragments.len(), 3);
    /// ```
    fn split_title(self, splitter: StreamSplitter) -> SplitStream<Self> {
        SplitStream::new(self, splitter)
    }
}

impl<S> SplitStreamExt for S where S: Stream {}

#[cfg(test)]
mod tests {
    use super::*;
    use ::futures::{StreamExt, executor::block_on, stream};

    fn collect<E>(chunks: Vec<Result<&'static str, E>>) -> Vec<Result<Fragment, SplitStreamError<E>>> {
        block_on(stream::iter(chunks).split_title(StreamSplitter::default()).collect())
    }

    #[test]
    fn yields_title_then_answers() {
        let out = collect::<()>(vec![Ok("Gree"), Ok("ting§Hel"), Ok(""), Ok("lo")]);
        let fragments: Vec<Fragment> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            fragments,
            vec![
                Fragment::Title("Greeting".into()),
                Fragment::Answer("Hel".into()),
                Fragment::Answer("lo".into()),
            ]
        );
    }

    #[test]
    fn missing_separator_is_the_last_item() {
        let out = collect::<()>(vec![Ok("just"), Ok(" text")]);
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out[0],
            Err(SplitStreamError::Split(SplitError::MissingSeparator { buffered: 9, .. }))
        ));
    }

    #[test]
    fn upstream_error_ends_the_stream() {
        let out = collect(vec![Ok("t§a"), Err("boom"), Ok("never")]);
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Ok(Fragment::Title(_))));
        assert!(matches!(out[1], Ok(Fragment::Answer(_))));
        assert!(matches!(out[2], Err(SplitStreamError::Upstream("boom"))));
    }

    #[test]
    fn title_limit_error_stops_polling() {
        let chunks = stream::iter(vec![Ok::<_, ()>("abcdef"), Ok("§x")]);
        let out: Vec<_> =
            block_on(chunks.split_title(StreamSplitter::default().with_max_title_len(3)).collect());
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out[0],
            Err(SplitStreamError::Split(SplitError::TitleTooLong { limit: 3 }))
        ));
    }
}
