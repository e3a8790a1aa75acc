use std::fmt;

/// Protocol violations and pre-condition failures detected by the gateway
/// core before or during transmission.
#[derive(Debug)]
pub enum GatewayError {
    /// The application returned a deferred, callback-style result. This core
    /// only supports synchronous, fully materialized responses.
    DeferredResponse,
    /// Status shorter than the minimal `NNN ` form.
    StatusTooShort(String),
    /// Status does not begin with a non-zero three-digit code.
    StatusBadCode(String),
    /// Status missing the single space after the code.
    StatusMissingSpace(String),
    /// Header value contains CR or LF.
    InvalidHeaderValue(String),
    /// Header belongs to the hop-by-hop set, which the application must not
    /// set: this core always terminates the transport after one response.
    HopByHopHeader(String),
    /// Body write attempted before a status was established.
    WriteBeforeStatus,
    /// Body write attempted before headers were sent.
    WriteBeforeHeaders,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeferredResponse => {
                write!(f, "asynchronous responses are not supported by this gateway")
            }
            Self::StatusTooShort(s) => write!(f, "status must be at least 4 bytes: '{s}'"),
            Self::StatusBadCode(s) => {
                write!(f, "status must begin with a non-zero 3-digit code: '{s}'")
            }
            Self::StatusMissingSpace(s) => {
                write!(f, "status must have a space after the code: '{s}'")
            }
            Self::InvalidHeaderValue(n) => {
                write!(f, "header '{n}' has a value containing CR or LF")
            }
            Self::HopByHopHeader(n) => write!(f, "hop-by-hop headers not allowed: '{n}'"),
            Self::WriteBeforeStatus => write!(f, "body write attempted before status was set"),
            Self::WriteBeforeHeaders => {
                write!(f, "body write attempted before headers were sent")
            }
        }
    }
}

impl std::error::Error for GatewayError {}
