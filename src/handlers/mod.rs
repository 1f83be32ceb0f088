pub mod form;
pub mod submission;

pub use form::{RawForm, UploadedFile};
pub use submission::SubmissionHandler;
