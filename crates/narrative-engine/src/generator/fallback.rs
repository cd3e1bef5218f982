//! Fixed prose skeleton used whenever the AI strategy is unavailable
//!
//! Free-text answers sit in their own paragraphs so that a missing answer
//! only removes its own paragraph during sentence pruning.

use shared_types::{SectionName, SectionTemplates};

const APPLICANT: &str = "I, {{applicantName}}, am the applicant in this matter. \
My date of birth is {{applicantDOB}}. I reside at {{applicantAddress}}. \
I can be contacted by telephone at {{applicantPhone}} or by email at {{applicantEmail}}.";

const RESPONDENT: &str = "The respondent in this matter is {{otherParentName}}, \
who resides at {{otherParentAddress}}. The respondent can be contacted by telephone at \
{{otherParentPhone}} or by email at {{otherParentEmail}}.";

const CHILDREN: &str = "This application concerns {{childCount}} {{childOrChildren}}: \
{{childrenList}}.\n\n{{childrenDetails}}";

const CURRENT_SITUATION: &str = "The {{childOrChildren}} currently \
{{currentLivingArrangementText}}.\n\n{{currentArrangementDetails}}\n\n{{socialCareStatement}}";

const PROPOSED: &str = "I propose that the {{childOrChildren}} should \
{{proposedLivingArrangementText}}.\n\n{{proposedArrangementDetails}}\n\n\
Regarding contact with the other parent: {{proposedContactSchedule}}\n\n\
For holidays and special occasions: {{proposedHolidayArrangements}}";

const SAFETY: &str = "{{safetyConcernsStatement}}";

pub fn template_for(section: SectionName) -> &'static str {
    match section {
        SectionName::Applicant => APPLICANT,
        SectionName::Respondent => RESPONDENT,
        SectionName::Children => CHILDREN,
        SectionName::CurrentSituation => CURRENT_SITUATION,
        SectionName::Proposed => PROPOSED,
        SectionName::Safety => SAFETY,
    }
}

/// The complete fallback template set
pub fn fallback_sections() -> SectionTemplates {
    SectionName::ALL
        .into_iter()
        .map(|section| (section, template_for(section).to_string()))
        .collect()
}
