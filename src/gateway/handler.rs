use std::time::SystemTime;

use anyhow::Context;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use crate::config::HandlerConfig;
use crate::gateway::environ::{BaseEnviron, Environ, RequestMeta};
use crate::gateway::error::GatewayError;
use crate::gateway::response::{AppResponse, AppResult, BodyChunks};
use crate::gateway::transport::{ErrorStream, InputStream, Transport};
use crate::gateway::validator;
use crate::util::CRLF;

/// Lifecycle of one request through the gateway pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    Building,
    Invoking,
    Validating,
    Transmitting,
    Recovering,
    Closed,
}

/// Drives one request through the gateway pipeline: environ construction,
/// application invocation, validation, transmission and error recovery.
///
/// A handler serves exactly one request. The input and error streams are
/// moved into the environ when the request starts and dropped when it closes,
/// so state can never leak between two concurrent requests.
pub struct Handler<T: Transport> {
    transport: T,
    config: HandlerConfig,
    base_env: BaseEnviron,

    state: HandlerState,
    environ: Option<Environ>,
    status: Option<Bytes>,
    headers: Option<Vec<(Bytes, Bytes)>>,
    body: Option<Box<dyn BodyChunks>>,
    headers_sent: bool,
    bytes_sent: u64,

    input: Option<InputStream>,
    errors: Option<ErrorStream>,
}

impl<T: Transport> Handler<T> {
    pub fn new(
        transport: T,
        input: InputStream,
        errors: ErrorStream,
        base_env: BaseEnviron,
        config: HandlerConfig,
    ) -> Self {
        Self {
            transport,
            config,
            base_env,
            state: HandlerState::Idle,
            environ: None,
            status: None,
            headers: None,
            body: None,
            headers_sent: false,
            bytes_sent: 0,
            input: Some(input),
            errors: Some(errors),
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Run one request: build the environ from `meta`, invoke `app`, then
    /// validate and transmit its response. Returns the number of body bytes
    /// sent to the client.
    ///
    /// Any failure is routed through the recovery path: if no headers have
    /// been sent yet the configured fallback response goes out instead and
    /// the error is only logged; otherwise the handler closes and the error
    /// propagates, since partial output cannot be retracted.
    pub async fn run<A>(&mut self, meta: RequestMeta, app: A) -> anyhow::Result<u64>
    where
        A: FnOnce(&mut Environ) -> anyhow::Result<AppResult>,
    {
        if self.state != HandlerState::Idle {
            anyhow::bail!("handler already served a request; create a new one per request");
        }
        match self.drive(meta, app).await {
            Ok(sent) => Ok(sent),
            Err(err) => {
                self.state = HandlerState::Recovering;
                let recovered = self.recover(err).await;
                if recovered.is_err() {
                    // An error while handling an error: give up and let the
                    // surrounding server deal with it
                    self.close();
                }
                recovered
            }
        }
    }

    async fn drive<A>(&mut self, meta: RequestMeta, app: A) -> anyhow::Result<u64>
    where
        A: FnOnce(&mut Environ) -> anyhow::Result<AppResult>,
    {
        self.state = HandlerState::Building;
        let input = self.input.take().context("input stream already consumed")?;
        let errors = self.errors.take().context("error stream already consumed")?;
        let environ = self.environ.insert(Environ::build(
            &self.base_env,
            meta,
            &self.config,
            input,
            errors,
        ));

        self.state = HandlerState::Invoking;
        let result = app(environ).context("application failed")?;

        self.state = HandlerState::Validating;
        self.set_response(validator::validate(result)?);

        self.state = HandlerState::Transmitting;
        self.finish_response().await
    }

    fn set_response(&mut self, response: AppResponse) {
        self.status = Some(response.status);
        self.headers = Some(response.headers);
        self.body = Some(response.body);
    }

    /// Transmit the stored response: headers, then every body chunk, then
    /// close. The sent-byte counter only counts body bytes.
    async fn finish_response(&mut self) -> anyhow::Result<u64> {
        self.send_headers().await?;
        while let Some(chunk) = self.body.as_mut().and_then(|body| body.next_chunk()) {
            self.write(&chunk).await?;
        }
        let sent = self.bytes_sent;
        tracing::debug!(bytes_sent = sent, "response complete");
        self.close();
        Ok(sent)
    }

    /// Transmit the preamble and header lines.
    ///
    /// `headers_sent` flips before the first byte goes out, so a failure
    /// mid-write still reads as "an attempt was made" to the recovery path.
    /// An origin server talking to an HTTP/0.9 client sends neither preamble
    /// nor headers; the client gets body bytes only.
    async fn send_headers(&mut self) -> anyhow::Result<()> {
        self.headers_sent = true;
        if self.config.origin_server && !self.client_is_modern() {
            return Ok(());
        }
        self.send_preamble().await?;
        if let Some(headers) = &self.headers {
            for (name, value) in headers {
                let mut line = Vec::with_capacity(name.len() + value.len() + 4);
                line.extend_from_slice(name);
                line.extend_from_slice(b": ");
                line.extend_from_slice(value);
                line.extend_from_slice(CRLF);
                self.transport.write(&line).await?;
            }
        }
        self.transport.write(CRLF).await?;
        Ok(())
    }

    /// Status line plus default Date and Server headers for origin servers,
    /// or a `Status:` line for CGI-style gateways.
    async fn send_preamble(&mut self) -> anyhow::Result<()> {
        let status = self.status.clone().ok_or(GatewayError::WriteBeforeStatus)?;
        if self.config.origin_server {
            let mut line = Vec::with_capacity(status.len() + 16);
            line.extend_from_slice(b"HTTP/");
            line.extend_from_slice(self.config.http_version.as_bytes());
            line.push(b' ');
            line.extend_from_slice(&status);
            line.extend_from_slice(CRLF);
            self.transport.write(&line).await?;

            if !self.has_header(b"Date") {
                let date = httpdate::fmt_http_date(SystemTime::now());
                self.transport
                    .write(format!("Date: {date}\r\n").as_bytes())
                    .await?;
            }
            if let Some(software) = self.config.server_software.clone() {
                if !self.has_header(b"Server") {
                    self.transport
                        .write(format!("Server: {software}\r\n").as_bytes())
                        .await?;
                }
            }
        } else {
            let mut line = Vec::with_capacity(status.len() + 10);
            line.extend_from_slice(b"Status: ");
            line.extend_from_slice(&status);
            line.extend_from_slice(CRLF);
            self.transport.write(&line).await?;
        }
        Ok(())
    }

    /// Write one body chunk and flush. Defensive: a chunk must never go out
    /// before the status and headers are established.
    async fn write(&mut self, chunk: &[u8]) -> anyhow::Result<()> {
        if self.status.is_none() {
            return Err(GatewayError::WriteBeforeStatus.into());
        }
        if !self.headers_sent {
            return Err(GatewayError::WriteBeforeHeaders.into());
        }
        self.bytes_sent += chunk.len() as u64;
        self.transport.write(chunk).await.context("body write failed")?;
        self.transport.flush().await.context("body flush failed")?;
        Ok(())
    }

    /// Release the body and reset all per-request state.
    pub fn close(&mut self) {
        if let Some(body) = self.body.as_mut() {
            body.release();
        }
        self.body = None;
        self.status = None;
        self.headers = None;
        self.environ = None;
        self.bytes_sent = 0;
        self.headers_sent = false;
        self.state = HandlerState::Closed;
    }

    /// Log the failure, then either substitute the fallback response or, if
    /// headers already went out, close and propagate.
    async fn recover(&mut self, err: anyhow::Error) -> anyhow::Result<u64> {
        self.log_error(&err).await?;
        if self.headers_sent {
            tracing::error!(error = %err, "request failed mid-transmission, dropping connection");
            self.close();
            return Err(err);
        }
        tracing::error!(error = %err, "request failed, sending fallback response");
        let fallback = self.error_output();
        self.set_response(validator::validate(AppResult::Complete(fallback))?);
        self.finish_response().await
    }

    /// Write the error chain to the request error stream and flush it.
    /// Depth is bounded by the configured traceback limit.
    async fn log_error(&mut self, err: &anyhow::Error) -> anyhow::Result<()> {
        let Some(environ) = self.environ.as_mut() else {
            // No environ means no error stream to write to; the tracing
            // event is the only record of the failure
            tracing::error!(error = %err, "request failed before the environ was built");
            return Ok(());
        };
        let limit = self.config.traceback_limit.unwrap_or(usize::MAX);
        let mut report = String::new();
        for (depth, cause) in err.chain().enumerate() {
            if depth >= limit {
                break;
            }
            if depth == 0 {
                report.push_str(&format!("gateway error: {cause}\n"));
            } else {
                report.push_str(&format!("  caused by: {cause}\n"));
            }
        }
        environ
            .errors
            .write_all(report.as_bytes())
            .await
            .context("error log write failed")?;
        AsyncWriteExt::flush(&mut environ.errors)
            .await
            .context("error log flush failed")?;
        Ok(())
    }

    /// Fallback triple built from the configured error status/headers/body.
    fn error_output(&self) -> AppResponse {
        AppResponse::new(
            Bytes::copy_from_slice(self.config.error_status.as_bytes()),
            self.config
                .error_headers
                .iter()
                .map(|(name, value)| {
                    (
                        Bytes::copy_from_slice(name.as_bytes()),
                        Bytes::copy_from_slice(value.as_bytes()),
                    )
                })
                .collect(),
            vec![Bytes::copy_from_slice(self.config.error_body.as_bytes())],
        )
    }

    fn has_header(&self, name: &[u8]) -> bool {
        self.headers
            .iter()
            .flatten()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// HTTP/0.9 clients cannot accept a status line or headers.
    fn client_is_modern(&self) -> bool {
        self.environ
            .as_ref()
            .map(|env| !env.server_protocol.eq_ignore_ascii_case(b"HTTP/0.9"))
            .unwrap_or(true)
    }
}
