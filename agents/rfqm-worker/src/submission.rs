pub use context::{SubmissionContext, SubmissionContextStatus, SubmitArgs};
pub use group::SubmissionGroup;

mod context;
mod group;
