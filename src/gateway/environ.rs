use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::HandlerConfig;
use crate::gateway::PROTOCOL_VERSION;
use crate::gateway::transport::{ErrorStream, InputStream};
use crate::util;

/// Process-wide base environment snapshot.
///
/// Captured once, consumed read-only: every request copies these variables
/// into its own environ, so the snapshot is never shared mutably.
#[derive(Debug, Clone, Default)]
pub struct BaseEnviron {
    vars: HashMap<String, Bytes>,
}

impl BaseEnviron {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the OS environment. Variables whose names are not valid
    /// UTF-8 are skipped; values are kept as raw bytes.
    pub fn from_process() -> Self {
        let mut vars = HashMap::new();
        for (key, value) in std::env::vars_os() {
            let Some(key) = key.to_str().map(str::to_owned) else {
                continue;
            };
            vars.insert(key, Bytes::from(value.into_encoded_bytes()));
        }
        Self { vars }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.vars.get(key)
    }
}

/// Transport-supplied fields for one request.
///
/// `headers` is the raw request-header list; the builder normalizes it into
/// `HTTP_*` variables. Content-Type and Content-Length may be supplied either
/// as typed fields or left in the header list.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub request_method: Bytes,
    pub script_name: Bytes,
    pub path_info: Bytes,
    /// Path as received on the wire, before any decoding the transport did.
    pub raw_path_info: Option<Bytes>,
    pub query_string: Bytes,
    pub server_name: Bytes,
    pub server_port: Bytes,
    pub server_protocol: Bytes,
    pub remote_addr: Option<Bytes>,
    pub remote_host: Option<Bytes>,
    pub content_type: Option<Bytes>,
    pub content_length: Option<Bytes>,
    /// Transport TLS flag; `yes`, `on` or `1` means the scheme is https.
    pub https: Option<Bytes>,
    pub headers: Vec<(Bytes, Bytes)>,
}

/// The per-request environment handed to the application.
///
/// Fixed protocol keys are named fields; everything else (the copied base
/// environment and the normalized `HTTP_*` request headers) lives in `vars`.
/// Built fresh for every request and owned by the handler processing it.
pub struct Environ {
    pub request_method: Bytes,
    pub script_name: Bytes,
    pub path_info: Bytes,
    pub raw_path_info: Option<Bytes>,
    pub query_string: Bytes,
    pub server_name: Bytes,
    pub server_port: Bytes,
    pub server_protocol: Bytes,
    pub remote_addr: Option<Bytes>,
    pub remote_host: Option<Bytes>,
    pub content_type: Option<Bytes>,
    pub content_length: Option<Bytes>,
    pub https: Option<Bytes>,

    /// `http` or `https`, guessed from the transport's `https` flag.
    pub url_scheme: Bytes,
    /// Gateway protocol version tuple.
    pub version: (u16, u16),
    pub multithread: bool,
    pub multiprocess: bool,
    pub run_once: bool,
    /// Advisory only; deferred results are rejected by the validator.
    pub async_capable: bool,

    pub input: InputStream,
    pub errors: ErrorStream,

    /// Base environment copy plus normalized request headers.
    pub vars: HashMap<String, Bytes>,
}

impl Environ {
    /// Build the environ for one request.
    ///
    /// Copies the base environment, merges the transport metadata (request
    /// headers become `HTTP_*` variables, repeats comma-joined), injects the
    /// protocol metadata, and defaults SERVER_SOFTWARE from the configured
    /// identity for origin servers without overriding a transport value.
    pub fn build(
        base: &BaseEnviron,
        meta: RequestMeta,
        config: &HandlerConfig,
        input: InputStream,
        errors: ErrorStream,
    ) -> Environ {
        let mut vars = base.vars.clone();

        let mut content_type = meta.content_type;
        let mut content_length = meta.content_length;
        for (name, value) in &meta.headers {
            if name.eq_ignore_ascii_case(b"content-type") {
                if content_type.is_none() {
                    content_type = Some(value.clone());
                }
                continue;
            }
            if name.eq_ignore_ascii_case(b"content-length") {
                if content_length.is_none() {
                    content_length = Some(value.clone());
                }
                continue;
            }
            let key = cgi_key(name);
            match vars.get_mut(&key) {
                Some(existing) => {
                    // Repeated header: comma-join under the same key
                    let mut joined = BytesMut::with_capacity(existing.len() + value.len() + 1);
                    joined.put_slice(existing);
                    joined.put_u8(b',');
                    joined.put_slice(value);
                    *existing = joined.freeze();
                }
                None => {
                    vars.insert(key, value.clone());
                }
            }
        }

        if config.origin_server {
            if let Some(software) = &config.server_software {
                if !vars.contains_key("SERVER_SOFTWARE") {
                    vars.insert(
                        "SERVER_SOFTWARE".to_string(),
                        Bytes::copy_from_slice(software.as_bytes()),
                    );
                }
            }
        }

        let mut environ = Environ {
            request_method: meta.request_method,
            script_name: meta.script_name,
            path_info: meta.path_info,
            raw_path_info: meta.raw_path_info,
            query_string: meta.query_string,
            server_name: meta.server_name,
            server_port: meta.server_port,
            server_protocol: meta.server_protocol,
            remote_addr: meta.remote_addr,
            remote_host: meta.remote_host,
            content_type,
            content_length,
            https: meta.https,
            url_scheme: Bytes::from_static(b"http"),
            version: PROTOCOL_VERSION,
            multithread: config.multithread,
            multiprocess: config.multiprocess,
            run_once: config.run_once,
            async_capable: false,
            input,
            errors,
            vars,
        };
        environ.url_scheme = util::guess_scheme(&environ);
        environ
    }

    /// Environ with trivial defaults and dummy streams, for tests of gateway
    /// applications. Not for real transports: the data is fake.
    pub fn testing_defaults() -> Environ {
        let meta = RequestMeta {
            request_method: Bytes::from_static(b"GET"),
            script_name: Bytes::new(),
            path_info: Bytes::from_static(b"/"),
            server_name: Bytes::from_static(b"127.0.0.1"),
            server_port: Bytes::from_static(b"80"),
            server_protocol: Bytes::from_static(b"HTTP/1.0"),
            headers: vec![(
                Bytes::from_static(b"Host"),
                Bytes::from_static(b"127.0.0.1"),
            )],
            ..RequestMeta::default()
        };
        Environ::build(
            &BaseEnviron::new(),
            meta,
            &HandlerConfig::default(),
            Box::new(tokio::io::empty()),
            Box::new(tokio::io::sink()),
        )
    }

    /// Look up a normalized request header, e.g. `http_header("Host")` reads
    /// the `HTTP_HOST` variable.
    pub fn http_header(&self, name: &str) -> Option<&Bytes> {
        let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
        self.vars.get(&key)
    }

    pub fn var(&self, key: &str) -> Option<&Bytes> {
        self.vars.get(key)
    }

    pub fn insert_var(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.vars.insert(key.into(), value.into());
    }
}

/// `X-Forwarded-For` → `HTTP_X_FORWARDED_FOR`
fn cgi_key(name: &[u8]) -> String {
    let mut key = String::with_capacity(name.len() + 5);
    key.push_str("HTTP_");
    for &b in name {
        key.push(match b {
            b'-' => '_',
            _ => b.to_ascii_uppercase() as char,
        });
    }
    key
}
