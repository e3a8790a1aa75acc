//! Gateway protocol pipeline.
//!
//! This module implements the hand-off between a byte-level transport and an
//! application callable. The transport supplies a write/flush sink, a
//! readable input stream, a writable error stream and the per-request
//! metadata; the application receives a fully built [`environ::Environ`] and
//! returns a status/headers/body triple.
//!
//! # Request State Machine
//!
//! Each request moves through an explicit state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │  Building   │ ← Copy base environment, merge request metadata
//!        └──────┬──────┘
//!               │ Environ ready
//!               ▼
//!        ┌─────────────┐
//!        │  Invoking   │ ← Call the application
//!        └──────┬──────┘
//!               │ Result produced
//!               ▼
//!        ┌─────────────┐
//!        │ Validating  │ ← Structural checks, nothing transmitted yet
//!        └──────┬──────┘
//!               │ Triple accepted
//!               ▼
//!        ┌─────────────┐
//!        │Transmitting │ ← Preamble, headers, body chunks
//!        └──────┬──────┘
//!               │ Body exhausted
//!               ▼
//!        ┌─────────────┐
//!        │   Closed    │ ← Body released, per-request state reset
//!        └─────────────┘
//!
//! Any failure jumps to Recovering: the error chain is logged to the request
//! error stream, and if no headers have been sent yet a fallback response is
//! validated and transmitted in place of the original one. Failures after
//! headers have been sent, and failures inside recovery itself, close the
//! handler and propagate to the caller.
//! ```

pub mod environ;
pub mod error;
pub mod handler;
pub mod response;
pub mod transport;
pub mod validator;

/// Version tuple exposed to applications in the environ.
pub const PROTOCOL_VERSION: (u16, u16) = (1, 0);
