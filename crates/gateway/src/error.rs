//! Structured errors of the gateway core.
//!
//! [`StateError`] reports backend and gateway level failures, [`InvokeError`] reports failures
//! raised by filters. Both carry the status code the caller should answer with, an internal error
//! code, a message and an optional cause. A filter chain returns either of them through
//! [`ServeError`], unchanged.

use http::StatusCode;
use micro_value::ResolveError;
use std::borrow::Cow;
use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

pub const ERROR_CODE_GATEWAY_INTERNAL: &str = "GATEWAY:INTERNAL";
pub const ERROR_CODE_REQUEST_INVALID: &str = "GATEWAY:REQUEST:INVALID";
pub const ERROR_CODE_PERMISSION_DENIED: &str = "GATEWAY:PERMISSION:DENIED";

pub const MESSAGE_UNKNOWN_PROTOCOL: &str = "GATEWAY:UNKNOWN_PROTOCOL";
pub const MESSAGE_RESPONSE_DECODER_NOT_FOUND: &str = "BACKEND:RESPONSE_DECODER:NOT_FOUND";
pub const MESSAGE_DECODE_RESPONSE: &str = "BACKEND:DECODE_RESPONSE";
pub const MESSAGE_RESOLVE_ARGUMENT: &str = "GATEWAY:RESOLVE_ARGUMENT";

macro_rules! gateway_error {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Error, Debug)]
        #[error("{message}, status: {status}, code: {error_code}")]
        pub struct $name {
            status: StatusCode,
            error_code: Cow<'static, str>,
            message: Cow<'static, str>,
            #[source]
            cause: Option<BoxError>,
        }

        impl $name {
            pub fn new(
                status: StatusCode,
                error_code: impl Into<Cow<'static, str>>,
                message: impl Into<Cow<'static, str>>,
            ) -> Self {
                Self { status, error_code: error_code.into(), message: message.into(), cause: None }
            }

            pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
                self.cause = Some(cause.into());
                self
            }

            pub fn status(&self) -> StatusCode {
                self.status
            }

            pub fn error_code(&self) -> &str {
                &self.error_code
            }

            pub fn message(&self) -> &str {
                &self.message
            }

            pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
                self.cause.as_deref()
            }
        }
    };
}

gateway_error!(
    /// A failure of the gateway itself or of a backend call.
    StateError
);

gateway_error!(
    /// A failure raised by a filter.
    InvokeError
);

impl StateError {
    pub fn unknown_protocol(protocol: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ERROR_CODE_GATEWAY_INTERNAL, MESSAGE_UNKNOWN_PROTOCOL)
            .with_cause(format!("unknown protocol: {protocol}"))
    }

    pub fn response_decoder_not_found() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ERROR_CODE_GATEWAY_INTERNAL, MESSAGE_RESPONSE_DECODER_NOT_FOUND)
    }

    pub fn decode_response(cause: BoxError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ERROR_CODE_GATEWAY_INTERNAL, MESSAGE_DECODE_RESPONSE)
            .with_cause(cause)
    }

    pub fn resolve_argument(name: &str, cause: ResolveError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ERROR_CODE_REQUEST_INVALID, MESSAGE_RESOLVE_ARGUMENT)
            .with_cause(format!("argument '{name}': {cause}"))
    }
}

/// The error returned by a filter chain.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::State(e) => e.status(),
            ServeError::Invoke(e) => e.status(),
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            ServeError::State(e) => e.error_code(),
            ServeError::Invoke(e) => e.error_code(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServeError::State(e) => e.message(),
            ServeError::Invoke(e) => e.message(),
        }
    }
}
