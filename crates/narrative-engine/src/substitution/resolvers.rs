//! Resolver registry: one entry per vocabulary placeholder
//!
//! Most placeholders read an answer of the same name. The derived ones build
//! a phrase from several answers, such as the list of children with their
//! ages, or the safety statement with its conditional clauses.

use std::collections::HashMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use shared_types::AnswerSet;

use super::format::{age_on, display_value, lowercase_first, parse_date};

/// Answer key of the repeating group holding one row per child
pub const CHILDREN_GROUP: &str = "children";

/// Inputs available to a resolver
pub struct ResolveContext<'a> {
    pub answers: &'a AnswerSet,
    pub today: NaiveDate,
}

impl ResolveContext<'_> {
    fn children(&self) -> Vec<AnswerSet> {
        self.answers.rows(CHILDREN_GROUP)
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.answers
            .get(name)
            .and_then(|value| display_value(name, value))
    }
}

/// Whether a resolved value counts as user data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// Carries answers; a section with none of these is "not provided"
    Data,
    /// Grammatical helper that always resolves, never counts as data
    Grammar,
}

#[derive(Clone, Copy)]
enum Source {
    /// Answer stored under the placeholder's own name
    Field,
    Derived(fn(&ResolveContext<'_>) -> Option<String>),
}

#[derive(Clone, Copy)]
pub struct Resolver {
    pub kind: ResolverKind,
    source: Source,
}

impl Resolver {
    const fn field() -> Self {
        Self {
            kind: ResolverKind::Data,
            source: Source::Field,
        }
    }

    const fn derived(func: fn(&ResolveContext<'_>) -> Option<String>) -> Self {
        Self {
            kind: ResolverKind::Data,
            source: Source::Derived(func),
        }
    }

    const fn grammar(func: fn(&ResolveContext<'_>) -> Option<String>) -> Self {
        Self {
            kind: ResolverKind::Grammar,
            source: Source::Derived(func),
        }
    }

    pub fn resolve(&self, name: &str, ctx: &ResolveContext<'_>) -> Option<String> {
        match self.source {
            Source::Field => ctx.lookup(name),
            Source::Derived(func) => func(ctx),
        }
    }
}

lazy_static! {
    static ref RESOLVERS: HashMap<&'static str, Resolver> = {
        let mut m = HashMap::new();
        for name in [
            "applicantName",
            "applicantDOB",
            "applicantAddress",
            "applicantPhone",
            "applicantEmail",
            "otherParentName",
            "otherParentAddress",
            "otherParentPhone",
            "otherParentEmail",
            "currentArrangementDetails",
            "proposedArrangementDetails",
            "proposedContactSchedule",
            "proposedHolidayArrangements",
        ] {
            m.insert(name, Resolver::field());
        }
        m.insert("childCount", Resolver::derived(child_count));
        m.insert("childOrChildren", Resolver::grammar(child_or_children));
        m.insert("childrenList", Resolver::derived(children_list));
        m.insert("childrenDetails", Resolver::derived(children_details));
        m.insert(
            "currentLivingArrangementText",
            Resolver::derived(current_living_arrangement),
        );
        m.insert(
            "proposedLivingArrangementText",
            Resolver::derived(proposed_living_arrangement),
        );
        m.insert("socialCareStatement", Resolver::derived(social_care_statement));
        m.insert(
            "safetyConcernsStatement",
            Resolver::derived(safety_concerns_statement),
        );
        m
    };
}

/// Registered resolver for a vocabulary name
pub fn lookup(name: &str) -> Option<&'static Resolver> {
    RESOLVERS.get(name)
}

/// Names with a registered resolver
pub fn registered_names() -> impl Iterator<Item = &'static str> {
    RESOLVERS.keys().copied()
}

/// Resolve any placeholder name: registry first, then a direct answer lookup
pub fn resolve(name: &str, ctx: &ResolveContext<'_>) -> Option<(String, ResolverKind)> {
    match lookup(name) {
        Some(resolver) => resolver
            .resolve(name, ctx)
            .map(|value| (value, resolver.kind)),
        None => ctx.lookup(name).map(|value| (value, ResolverKind::Data)),
    }
}

fn child_count(ctx: &ResolveContext<'_>) -> Option<String> {
    let count = ctx.children().len();
    (count > 0).then(|| count.to_string())
}

fn child_or_children(ctx: &ResolveContext<'_>) -> Option<String> {
    let word = if ctx.children().len() == 1 {
        "child"
    } else {
        "children"
    };
    Some(word.to_string())
}

fn children_list(ctx: &ResolveContext<'_>) -> Option<String> {
    let entries: Vec<String> = ctx
        .children()
        .iter()
        .filter_map(|child| {
            let mut parts = Vec::new();
            if let Some(name) = child.text("childName") {
                parts.push(name);
            }
            if let Some(age) = child
                .text("childDOB")
                .and_then(|dob| parse_date(&dob))
                .and_then(|dob| age_on(dob, ctx.today))
            {
                parts.push(format!("aged {}", age));
            }
            if let Some(gender) = child.text("childGender") {
                parts.push(gender.to_lowercase());
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        })
        .collect();

    (!entries.is_empty()).then(|| entries.join("; "))
}

fn children_details(ctx: &ResolveContext<'_>) -> Option<String> {
    let mut sentences = Vec::new();

    for (index, child) in ctx.children().iter().enumerate() {
        let name = child
            .text("childName")
            .unwrap_or_else(|| format!("Child {}", index + 1));

        if let Some(school) = child.text("childSchool") {
            sentences.push(format!("{} currently attends {}.", name, school));
        }
        if child.flag("childHasSEND") == Some(true) {
            sentences.push(format!(
                "{} has special educational needs or disabilities.",
                name
            ));
            if let Some(details) = child.text("childSENDDetails") {
                sentences.push(details);
            }
        }
        if child.flag("childHealthIssues") == Some(true) {
            sentences.push(format!("{} has health issues.", name));
            if let Some(details) = child.text("childHealthDetails") {
                sentences.push(details);
            }
        }
    }

    (!sentences.is_empty()).then(|| sentences.join(" "))
}

/// Verb phrase for a living arrangement choice
///
/// `finite` conjugates for the number of children ("lives" / "live");
/// otherwise the base form is used, as after "should".
fn living_phrase(choice: &str, other: Option<String>, finite: bool, plural: bool) -> Option<String> {
    let (live, split) = if finite && !plural {
        ("lives", "splits")
    } else {
        ("live", "split")
    };

    let phrase = match choice {
        "With me" => format!("{} with me", live),
        "With the other parent" => format!("{} with the other parent", live),
        "Split between both parents" => format!("{} their time between both parents", split),
        "With other family members" => format!("{} with other family members", live),
        "Other" => format!("{} as follows: {}", live, other?),
        custom => format!("{} {}", live, lowercase_first(custom)),
    };
    Some(phrase)
}

fn current_living_arrangement(ctx: &ResolveContext<'_>) -> Option<String> {
    let choice = ctx.answers.text("currentLivingArrangement")?;
    let plural = ctx.children().len() != 1;
    living_phrase(
        &choice,
        ctx.answers.text("currentLivingOther"),
        true,
        plural,
    )
}

fn proposed_living_arrangement(ctx: &ResolveContext<'_>) -> Option<String> {
    let choice = ctx.answers.text("proposedLivingArrangement")?;
    living_phrase(
        &choice,
        ctx.answers.text("proposedLivingOther"),
        false,
        true,
    )
}

fn social_care_statement(ctx: &ResolveContext<'_>) -> Option<String> {
    let statement = if ctx.answers.flag("socialCareInvolvement")? {
        let mut statement = String::from("Social care has been involved with my family.");
        if let Some(details) = ctx.answers.text("socialCareDetails") {
            statement.push(' ');
            statement.push_str(&details);
        }
        statement
    } else {
        String::from("Social care has not been involved with my family.")
    };
    Some(statement)
}

fn safety_concerns_statement(ctx: &ResolveContext<'_>) -> Option<String> {
    let has_concerns = ctx.answers.flag("hasSafetyConcerns")?;
    let child_word = if ctx.children().len() > 1 {
        "children"
    } else {
        "child"
    };

    if !has_concerns {
        return Some(format!(
            "I do not have any safety concerns regarding the {} spending time with the other parent.",
            child_word
        ));
    }

    let mut statement = format!(
        "I have safety concerns regarding the {} being with the other parent.",
        child_word
    );

    let types = ctx.answers.strings("safetyConcernTypes");
    if !types.is_empty() {
        statement.push_str(&format!(" These concerns relate to: {}.", types.join(", ")));
    }
    if let Some(details) = ctx.answers.text("safetyConcernDetails") {
        statement.push(' ');
        statement.push_str(&details);
    }
    if ctx.answers.flag("policeInvolvement") == Some(true) {
        statement.push_str(" The police have been involved.");
        if let Some(details) = ctx.answers.text("policeInvolvementDetails") {
            statement.push(' ');
            statement.push_str(&details);
        }
    }
    if ctx.answers.flag("courtOrdersExist") == Some(true) {
        statement.push_str(" There are existing court orders in place.");
        if let Some(details) = ctx.answers.text("courtOrdersDetails") {
            statement.push(' ');
            statement.push_str(&details);
        }
    }

    Some(statement)
}
