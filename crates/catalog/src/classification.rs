//! Two-level classification taxonomy.
//!
//! A classification is either top-level (`level = 0`, no parent) or a child
//! (`level = 1`) of exactly one top-level classification. Names are unique
//! within a [`ClassificationScope`]: among all top-level rows, or among the
//! children of one parent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tutorhub_core::{
    coerce, ClassificationId, DomainError, DomainResult, Entity, ValueObject,
};

use crate::status::RecordStatus;

/// Depth of a classification in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLevel {
    TopLevel,
    Child,
}

impl ClassificationLevel {
    pub fn code(self) -> i16 {
        match self {
            ClassificationLevel::TopLevel => 0,
            ClassificationLevel::Child => 1,
        }
    }

    /// Range check on an already-coerced level.
    pub fn from_code(code: i64) -> DomainResult<Self> {
        match code {
            0 => Ok(ClassificationLevel::TopLevel),
            1 => Ok(ClassificationLevel::Child),
            other => Err(DomainError::validation(format!(
                "level must be 0 (top-level) or 1 (child), got {other}"
            ))),
        }
    }
}

/// The `(level, parent)` pair bounding a name-uniqueness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationScope {
    TopLevel,
    ChildOf(ClassificationId),
}

impl ValueObject for ClassificationScope {}

impl ClassificationScope {
    pub fn level(&self) -> ClassificationLevel {
        match self {
            ClassificationScope::TopLevel => ClassificationLevel::TopLevel,
            ClassificationScope::ChildOf(_) => ClassificationLevel::Child,
        }
    }

    pub fn parent_id(&self) -> Option<ClassificationId> {
        match self {
            ClassificationScope::TopLevel => None,
            ClassificationScope::ChildOf(parent) => Some(*parent),
        }
    }

    /// Rebuild a scope from its stored columns.
    pub fn from_parts(level: ClassificationLevel, parent_id: Option<ClassificationId>) -> DomainResult<Self> {
        match (level, parent_id) {
            (ClassificationLevel::TopLevel, None) => Ok(ClassificationScope::TopLevel),
            (ClassificationLevel::Child, Some(parent)) => Ok(ClassificationScope::ChildOf(parent)),
            (ClassificationLevel::TopLevel, Some(_)) => Err(DomainError::constraint(
                "top-level classification cannot have a parent",
            )),
            (ClassificationLevel::Child, None) => Err(child_requires_parent()),
        }
    }

    /// The duplicate-name failure for this scope.
    ///
    /// Both scopes report a `ConstraintViolation`; the message tells a
    /// top-level collision apart from a collision under one parent.
    pub fn duplicate_name(&self, name: &str) -> DomainError {
        match self {
            ClassificationScope::TopLevel => DomainError::constraint(format!(
                "a top-level classification named '{name}' already exists"
            )),
            ClassificationScope::ChildOf(parent) => DomainError::constraint(format!(
                "a classification named '{name}' already exists under parent {parent}"
            )),
        }
    }
}

/// Stored classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub id: ClassificationId,
    pub name: String,
    pub scope: ClassificationScope,
    pub status: RecordStatus,
}

impl Classification {
    pub fn level(&self) -> ClassificationLevel {
        self.scope.level()
    }

    pub fn parent_id(&self) -> Option<ClassificationId> {
        self.scope.parent_id()
    }

    pub fn is_top_level(&self) -> bool {
        self.scope == ClassificationScope::TopLevel
    }
}

impl Entity for Classification {
    type Id = ClassificationId;
    const KIND: &'static str = "classification";

    fn id(&self) -> ClassificationId {
        self.id
    }
}

/// A validated create/update request: trimmed name + derived scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationDraft {
    name: String,
    scope: ClassificationScope,
}

impl ClassificationDraft {
    /// Validate strictly-typed input.
    ///
    /// Order: name, level range, parent presence. The first violation wins.
    pub fn new(name: &str, level: i64, parent_id: Option<i64>) -> DomainResult<Self> {
        let name = coerce::required_text("name", name)?;
        let level = ClassificationLevel::from_code(level)?;
        Self::scoped(name, level, parent_id)
    }

    /// Validate loosely-typed wire input, coercing `level` and `parent_id`
    /// in the same order the strict path checks them.
    pub fn from_loose(name: &str, level: &Value, parent_id: &Value) -> DomainResult<Self> {
        let name = coerce::required_text("name", name)?;
        let level = ClassificationLevel::from_code(coerce::required_int("level", level)?)?;
        let parent_id = match level {
            // A parent sent along with a top-level entry is discarded.
            ClassificationLevel::TopLevel => None,
            ClassificationLevel::Child => coerce::optional_int("parent_id", parent_id)?,
        };
        Self::scoped(name, level, parent_id)
    }

    fn scoped(name: String, level: ClassificationLevel, parent_id: Option<i64>) -> DomainResult<Self> {
        let scope = match level {
            ClassificationLevel::TopLevel => ClassificationScope::TopLevel,
            ClassificationLevel::Child => parent_id
                .and_then(ClassificationId::positive)
                .map(ClassificationScope::ChildOf)
                .ok_or_else(child_requires_parent)?,
        };
        Ok(Self { name, scope })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> ClassificationScope {
        self.scope
    }

    /// Validate the parent linkage of a child draft against the stored parent.
    ///
    /// `editing` is the id of the row being updated, if any. `parent` is the
    /// stored row referenced by the draft's scope (`None` if it does not exist).
    /// Top-level drafts always pass.
    pub fn check_parent(
        &self,
        editing: Option<ClassificationId>,
        parent: Option<&Classification>,
    ) -> DomainResult<()> {
        let ClassificationScope::ChildOf(parent_id) = self.scope else {
            return Ok(());
        };
        if editing == Some(parent_id) {
            return Err(DomainError::constraint(
                "a classification cannot be its own parent",
            ));
        }
        let parent = parent.ok_or(DomainError::not_found("parent classification"))?;
        if !parent.is_top_level() {
            return Err(DomainError::constraint(format!(
                "parent {} is not a top-level classification",
                parent.id
            )));
        }
        Ok(())
    }

    /// A top-level row that still has children cannot become a child itself,
    /// otherwise its children would hang off a level-1 parent.
    pub fn check_demotion(&self, current: &Classification, child_count: u64) -> DomainResult<()> {
        if current.is_top_level() && self.scope != ClassificationScope::TopLevel && child_count > 0 {
            return Err(DomainError::constraint(format!(
                "classification {} still has {child_count} child classification(s)",
                current.id
            )));
        }
        Ok(())
    }
}

fn child_requires_parent() -> DomainError {
    DomainError::constraint("child classification requires a parent")
}
