use bytes::Bytes;

/// Response body: a finite sequence of byte chunks, consumed exactly once.
///
/// `release` is the optional resource-release capability. The handler calls
/// it exactly once when the request closes, whether or not the body was fully
/// consumed. The default implementation does nothing.
pub trait BodyChunks: Send {
    /// Next chunk, or `None` once the body is exhausted.
    fn next_chunk(&mut self) -> Option<Bytes>;

    /// Release any resources backing the body.
    fn release(&mut self) {}
}

/// Body backed by an in-memory list of chunks.
pub struct ChunkedBody {
    chunks: std::vec::IntoIter<Bytes>,
}

impl ChunkedBody {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter(),
        }
    }
}

impl BodyChunks for ChunkedBody {
    fn next_chunk(&mut self) -> Option<Bytes> {
        self.chunks.next()
    }
}

/// The status/headers/body triple an application produces.
///
/// Headers are an ordered sequence and are transmitted in input order; they
/// are not deduplicated.
pub struct AppResponse {
    pub status: Bytes,
    pub headers: Vec<(Bytes, Bytes)>,
    pub body: Box<dyn BodyChunks>,
}

impl AppResponse {
    /// Response with an in-memory chunk list body.
    pub fn new(status: Bytes, headers: Vec<(Bytes, Bytes)>, chunks: Vec<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: Box::new(ChunkedBody::new(chunks)),
        }
    }

    /// Response with a caller-supplied body implementation.
    pub fn with_body(status: Bytes, headers: Vec<(Bytes, Bytes)>, body: Box<dyn BodyChunks>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

/// What one application invocation produces.
pub enum AppResult {
    /// A fully materialized response triple.
    Complete(AppResponse),
    /// A callback-style result for event-loop servers. Exists only to be
    /// rejected by the validator; the environ still advertises
    /// `async_capable = false`.
    Deferred(Box<dyn FnOnce() -> AppResponse + Send>),
}
