//! Body extractors that run `validator` rules before a handler sees the
//! payload. Failures surface as the standard 400 error body.

mod validated;

pub use validated::{ValidatedForm, ValidatedJson};
