use anyhow::Context;
use serde::Deserialize;

/// Per-handler configuration.
///
/// Every handler instance gets its own immutable copy at construction; there
/// are no shared mutable defaults across instances. The `multithread`,
/// `multiprocess` and `run_once` flags are advisory: they describe the calling
/// server's concurrency model to the application and are not enforced here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// True when we terminate the client connection ourselves; false for
    /// CGI-style gateways invoked through an upstream server.
    pub origin_server: bool,

    /// HTTP version written in the response status line.
    pub http_version: String,

    /// Identity string for the Server header and the SERVER_SOFTWARE default.
    pub server_software: Option<String>,

    /// Status of the fallback response sent when the application fails
    /// before any headers have gone out.
    pub error_status: String,
    pub error_headers: Vec<(String, String)>,
    pub error_body: String,

    /// Maximum number of error-chain links written to the request error
    /// stream. `None` logs the entire chain.
    pub traceback_limit: Option<usize>,

    pub multithread: bool,
    pub multiprocess: bool,
    pub run_once: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            origin_server: true,
            http_version: "1.0".to_string(),
            server_software: None,
            error_status: "500 Internal Server Error".to_string(),
            error_headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            error_body: "A server error occurred. Contact the administrator.".to_string(),
            traceback_limit: None,
            multithread: true,
            multiprocess: false,
            run_once: false,
        }
    }
}

impl HandlerConfig {
    /// Configuration for CGI-style invocation: output goes through an
    /// upstream gateway, one request per process.
    pub fn cgi() -> Self {
        Self {
            origin_server: false,
            multithread: false,
            multiprocess: true,
            run_once: true,
            ..Self::default()
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path))
    }
}
