mod lead_email;
mod lead_payload;
mod submission_input;

pub use lead_email::LeadEmail;
pub use lead_payload::{LeadPayload, RequestContext, LEAD_SUBJECT};
pub use submission_input::{SubmissionInput, ValidSubmission, ValidationError};
