//! Completion phrase shared with the backend interview agent.
//!
//! The backend gives no structured "interview finished" flag; the agent
//! says this phrase instead. Keep every check behind
//! [`is_interview_complete`] so the contract can change in one place.

pub const DIAGNOSIS_SENTINEL: &str = "Please wait while Healio diagnoses your problem";

/// True when an agent reply announces that the interview is over and the
/// diagnosis should start.
pub fn is_interview_complete(reply: &str) -> bool {
    reply.contains(DIAGNOSIS_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_phrase_inside_reply() {
        let reply = "Thank you for the details. Please wait while Healio diagnoses your problem.";
        assert!(is_interview_complete(reply));
    }

    #[test]
    fn ignores_ordinary_replies() {
        assert!(!is_interview_complete("How long have you had the cough?"));
        assert!(!is_interview_complete(""));
    }

    #[test]
    fn match_is_exact_and_case_sensitive() {
        assert!(!is_interview_complete("please wait while healio diagnoses your problem"));
    }
}
