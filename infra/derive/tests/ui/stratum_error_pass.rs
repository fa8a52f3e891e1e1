use std::borrow::Cow;
use stratum_derive::stratum_error;

#[stratum_error]
pub enum SampleError {
    #[error("Read failed{}: {source}", format_context(.context))]
    Read {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err: SampleError = "boom".into();
    assert!(err.context_message().is_none());
}
