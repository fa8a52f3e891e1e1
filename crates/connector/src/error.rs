use crate::dispatch::Operation;
use std::borrow::Cow;
use stratum_buffer::BufferError;
use stratum_native::NativeError;

/// Errors surfaced by the connector.
///
/// Native and buffering failures are carried unchanged so callers can match on the
/// collaborator's own error.
#[stratum_derive::stratum_error]
pub enum VolError {
    #[error("Native backend failure{}: {source}", format_context(.context))]
    Native { source: NativeError, context: Option<Cow<'static, str>> },

    #[error("Buffering failure{}: {source}", format_context(.context))]
    Buffer { source: BufferError, context: Option<Cow<'static, str>> },

    #[error("Invalid connector configuration{}: {message}", format_context(.context))]
    Configuration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Operation not supported{}: {operation}", format_context(.context))]
    Unsupported { operation: Operation, context: Option<Cow<'static, str>> },

    #[error("Invalid handle{}: {message}", format_context(.context))]
    InvalidHandle { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid selection{}: {message}", format_context(.context))]
    InvalidSelection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Sync on close failed{}: {message}", format_context(.context))]
    SyncFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Connector terminated{}", format_context(.context))]
    Terminated { context: Option<Cow<'static, str>> },

    #[error("Internal connector error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
