//! Student↔coach association set.
//!
//! An association is nothing but the `(student_id, coach_id)` pair. Either side
//! can own a batch operation: a student linking several coaches, or a coach
//! linking several students.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use tutorhub_core::{CoachId, StudentId, ValueObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentCoachLink {
    pub student_id: StudentId,
    pub coach_id: CoachId,
}

impl ValueObject for StudentCoachLink {}

/// The side of the association a batch operation is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkOwner {
    Student(StudentId),
    Coach(CoachId),
}

impl LinkOwner {
    /// Entity name of the owner, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            LinkOwner::Student(_) => "student",
            LinkOwner::Coach(_) => "coach",
        }
    }

    /// Entity name of the other side.
    pub fn counterpart_kind(&self) -> &'static str {
        match self {
            LinkOwner::Student(_) => "coach",
            LinkOwner::Coach(_) => "student",
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            LinkOwner::Student(id) => id.get(),
            LinkOwner::Coach(id) => id.get(),
        }
    }

    /// Build the pair joining this owner to `counterpart`.
    pub fn pair_with(&self, counterpart: i64) -> StudentCoachLink {
        match self {
            LinkOwner::Student(student_id) => StudentCoachLink {
                student_id: *student_id,
                coach_id: CoachId::new(counterpart),
            },
            LinkOwner::Coach(coach_id) => StudentCoachLink {
                student_id: StudentId::new(counterpart),
                coach_id: *coach_id,
            },
        }
    }

    /// The id on the other side of `link`.
    pub fn counterpart_of(&self, link: &StudentCoachLink) -> i64 {
        match self {
            LinkOwner::Student(_) => link.coach_id.get(),
            LinkOwner::Coach(_) => link.student_id.get(),
        }
    }
}

/// Outcome of planning a `Link` batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    /// Pairs that must be written.
    pub to_insert: Vec<StudentCoachLink>,
    /// Counterparts already linked (no-ops).
    pub already_linked: Vec<i64>,
    /// Counterparts that do not exist (skipped).
    pub missing: Vec<i64>,
}

/// Decide, pair by pair, what a `Link` batch has to write.
///
/// Each counterpart is judged independently: unknown ids are skipped, linked
/// ids are no-ops, and the rest become inserts. Repeated ids in the request
/// count once, in first-seen order.
pub fn plan_links(
    owner: LinkOwner,
    counterparts: &[i64],
    existing_counterparts: &HashSet<i64>,
    linked_counterparts: &HashSet<i64>,
) -> LinkPlan {
    let mut plan = LinkPlan::default();
    let mut seen = HashSet::new();

    for &counterpart in counterparts {
        if !seen.insert(counterpart) {
            continue;
        }
        if counterpart <= 0 || !existing_counterparts.contains(&counterpart) {
            plan.missing.push(counterpart);
        } else if linked_counterparts.contains(&counterpart) {
            plan.already_linked.push(counterpart);
        } else {
            plan.to_insert.push(owner.pair_with(counterpart));
        }
    }

    plan
}
