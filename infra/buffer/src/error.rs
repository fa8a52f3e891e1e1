use std::borrow::Cow;

/// A specialized [`BufferError`] enum of this crate.
#[stratum_derive::stratum_error]
#[derive(Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Dataset not staged{}: {message}", format_context(.context))]
    NotInitialized { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Region out of bounds{}: {message}", format_context(.context))]
    OutOfBounds { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Buffer capacity exceeded{}: {message}", format_context(.context))]
    CapacityExceeded { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Element type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid buffering configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal buffering error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
