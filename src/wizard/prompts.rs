//! Fixed assistant copy for the registration dialogue.

pub const GREETING: &str =
    "Hello! I'm here to help you with your registration. Let's get started!";

pub const CONFIRM_SUBMIT: &str = "Great! Ready to submit your registration? (yes/no)";

pub const REVIEW_FIRST: &str =
    "No problem! You can review and edit your information before submitting.";

pub const FIELD_REQUIRED: &str = "This field is required.";

pub const UPLOAD_INSTRUCTIONS: &str =
    "Please select the files you'd like to upload.";

pub const UPLOAD_COMPLETE: &str = "Documents uploaded successfully!";

pub const SUBMIT_SUCCESS: &str = "Your registration has been submitted successfully!";

pub const SUBMIT_REJECTED: &str =
    "There was an error submitting your registration. Please try again.";

pub const SUBMIT_TRANSPORT_FAILURE: &str = "An error occurred while submitting. Please try again.";

pub const FALLBACK_NO_ANSWER: &str =
    "I'm not sure how to respond to that. Let's get back to your registration.";

pub const FALLBACK_UNAVAILABLE: &str =
    "I'm having trouble understanding. Let's continue with your registration.";

/// Message after `start over`, leading straight into the first question.
pub fn start_over(first_prompt: &str) -> String {
    format!("Let's start over. {first_prompt}")
}

/// User-side note recorded when files are attached from the dialogue.
pub fn files_uploaded(count: usize) -> String {
    format!("Uploaded {count} file(s)")
}

/// Backend rejection, with its detail when one was given.
pub fn submit_rejected(detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!(
            "There was an error submitting your registration: {}. Please try again.",
            detail.trim_end().trim_end_matches('.')
        ),
        None => SUBMIT_REJECTED.to_string(),
    }
}
