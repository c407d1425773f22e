//! Pagination plumbing shared by the Live Stream API list endpoints.

use serde::Deserialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// Number of resources requested per list page.
pub const PAGE_SIZE: u32 = 100;

/// One page of a list response, reduced to what pagination needs.
#[derive(Debug)]
pub struct Page<T> {
    pub items: VecDeque<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Builds a page, treating an empty continuation token as the last page.
    ///
    /// The API omits `nextPageToken` on the final page, but some proxies echo it back as `""`.
    pub fn new(items: VecDeque<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

type PendingPage<'a, F, T> = Pin<Box<dyn Future<Output = eyre::Result<(F, Page<T>)>> + Send + 'a>>;

enum PageState<'a, F, T> {
    Fetching(PendingPage<'a, F, T>),
    Draining { fetcher: F, next: Option<String> },
    Done,
}

/// A lazily paginated stream over a `pageToken`/`nextPageToken` list endpoint.
///
/// Items are yielded in server order. The next page is requested only once the current one has
/// been drained, and the stream ends after the first page error.
pub struct PagedStream<'a, T, F> {
    buffered: VecDeque<T>,
    state: PageState<'a, F, T>,
}

impl<'a, T, F, Fut> PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
    T: Send + 'a,
{
    pub fn new(fetcher: F) -> Self {
        Self {
            buffered: VecDeque::new(),
            state: PageState::Fetching(Self::fetch(fetcher, None)),
        }
    }

    fn fetch(fetcher: F, page_token: Option<String>) -> PendingPage<'a, F, T> {
        Box::pin(async move {
            let page = fetcher(page_token).await?;
            Ok((fetcher, page))
        })
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T, F, Fut> Stream for PagedStream<'a, T, F>
where
    T: Unpin + Send + 'a,
    F: Fn(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            match std::mem::replace(&mut self.state, PageState::Done) {
                PageState::Done => return Poll::Ready(None),
                PageState::Draining { next: None, .. } => return Poll::Ready(None),
                PageState::Draining {
                    fetcher,
                    next: Some(token),
                } => {
                    self.state = PageState::Fetching(Self::fetch(fetcher, Some(token)));
                }
                PageState::Fetching(mut pending) => match pending.as_mut().poll(cx) {
                    Poll::Pending => {
                        self.state = PageState::Fetching(pending);
                        return Poll::Pending;
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(e))),
                    Poll::Ready(Ok((fetcher, page))) => {
                        self.buffered.extend(page.items);
                        self.state = PageState::Draining {
                            fetcher,
                            next: page.next_page_token,
                        };
                    }
                },
            }
        }
    }
}

/// The error envelope Google APIs wrap non-success responses in.
///
/// See: <https://cloud.google.com/apis/design/errors#http_mapping>
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) code: u16,
    #[serde(default)]
    pub(crate) message: String,
    /// Canonical status name such as `NOT_FOUND`.
    #[serde(default)]
    pub(crate) status: Option<String>,
}
