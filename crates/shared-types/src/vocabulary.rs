//! Closed placeholder vocabulary shared by generators and the substitution engine
//!
//! Any change to this list is a breaking change: cached templates must be
//! regenerated, so bump [`VOCABULARY_VERSION`] alongside it.

pub const VOCABULARY_VERSION: u32 = 1;

/// Placeholder names usable inside narrative templates
pub const PLACEHOLDER_VOCABULARY: &[&str] = &[
    // Applicant
    "applicantName",
    "applicantDOB",
    "applicantAddress",
    "applicantPhone",
    "applicantEmail",
    // Respondent
    "otherParentName",
    "otherParentAddress",
    "otherParentPhone",
    "otherParentEmail",
    // Children
    "childCount",
    "childOrChildren",
    "childrenList",
    "childrenDetails",
    // Current situation
    "currentLivingArrangementText",
    "currentArrangementDetails",
    "socialCareStatement",
    // Proposed arrangements
    "proposedLivingArrangementText",
    "proposedArrangementDetails",
    "proposedContactSchedule",
    "proposedHolidayArrangements",
    // Safety
    "safetyConcernsStatement",
];

pub fn is_known_placeholder(name: &str) -> bool {
    PLACEHOLDER_VOCABULARY.contains(&name)
}
