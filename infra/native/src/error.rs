use std::borrow::Cow;

/// Status of a failed native call, passed through the connector unchanged.
#[stratum_derive::stratum_error]
#[derive(Clone, PartialEq, Eq)]
pub enum NativeError {
    #[error("Object not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Object already exists{}: {message}", format_context(.context))]
    AlreadyExists { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid native handle{}: {message}", format_context(.context))]
    InvalidHandle { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Extent exceeds maximum{}: {message}", format_context(.context))]
    ExtentExceeded { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal native error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
