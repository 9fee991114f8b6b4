//! Roster domain module (students, coaches and who coaches whom).
//!
//! Pure domain logic: validation of people records and planning of
//! student↔coach association changes. Storage applies the plans.

pub mod association;
pub mod coach;
pub mod student;

pub use association::{plan_links, LinkOwner, LinkPlan, StudentCoachLink};
pub use coach::{Coach, CoachDraft};
pub use student::{Student, StudentDraft};
