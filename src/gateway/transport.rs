use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Byte sink the transmission engine writes into.
///
/// `write` and `flush` are separate primitives so a buffering transport can
/// coalesce writes across several calls and flush only at chunk boundaries.
/// Blocking behavior and timeouts are entirely the transport's business; the
/// engine never retries a failed write.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn write(&mut self, data: &[u8]) -> io::Result<()>;
    async fn flush(&mut self) -> io::Result<()>;
}

impl<W: AsyncWrite + Unpin + Send> Transport for W {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(self).await
    }
}

/// Readable request body handle passed to the application via the environ.
pub type InputStream = Box<dyn AsyncRead + Unpin + Send>;

/// Writable per-request error log passed to the application via the environ.
/// The recovery path also writes its error report here.
pub type ErrorStream = Box<dyn AsyncWrite + Unpin + Send>;
