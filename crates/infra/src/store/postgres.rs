//! Postgres-backed entity store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Database` |
//! | Database (foreign key violation) | `23503` | `Database` |
//! | Database (check constraint violation) | `23514` | `Database` |
//! | PoolClosed | N/A | `PoolClosed` |
//! | ColumnDecode / row conversion | N/A | `Decode` |
//! | Other | N/A | `Database` |
//!
//! Domain rules are checked by the services before any write reaches this
//! module, so a constraint violation here is an infrastructure failure.
//!
//! ## Atomicity
//!
//! Attribute value replacement and cascade deletes run in one transaction.
//! Link batches are a single `INSERT .. SELECT FROM UNNEST` statement, so a
//! batch is written entirely or not at all.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use tutorhub_catalog::{
    Attribute, AttributeDraft, Brand, Classification, ClassificationLevel, ClassificationScope,
    RecordStatus,
};
use tutorhub_contracts::{Contract, ContractDraft, ContractStatus, ContractType, SignatureForm};
use tutorhub_core::{
    AttributeId, BrandId, ClassificationId, CoachId, ContractId, DomainResult, StudentId, UserId,
};
use tutorhub_roster::{Coach, CoachDraft, LinkOwner, Student, StudentCoachLink, StudentDraft};

use super::{
    AttributeStore, BrandStore, ClassificationFilter, ClassificationStore, ContractStore,
    OrderLedger, RosterStore, StoreError, StoreResult,
};

/// Order status codes that no longer count as active.
const CLOSED_ORDER_STATUSES: [i16; 2] = [98, 99];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(include_str!("schema.sql"))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn existing_ids(
        &self,
        operation: &'static str,
        sql: &'static str,
        ids: &[i64],
    ) -> StoreResult<HashSet<i64>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query(sql)
            .bind(ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn delete_person_cascade(
        &self,
        operation: &'static str,
        links_sql: &'static str,
        row_sql: &'static str,
        id: i64,
    ) -> StoreResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let removed = sqlx::query(links_sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?
            .rows_affected();

        sqlx::query(row_sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(removed)
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string());
            let kind = match code.as_deref() {
                Some("23505") => "unique violation",
                Some("23503") => "foreign key violation",
                Some("23514") => "check violation",
                _ => "database",
            };
            StoreError::database(operation, format!("{kind}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::PoolClosed(operation),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::decode(operation, err.to_string())
        }
        _ => StoreError::database(operation, err.to_string()),
    }
}

/// Read a row struct and convert it into its domain type.
///
/// Stored codes outside their domain range (a status of 7, say) surface as
/// `StoreError::Decode` rather than a domain validation error.
fn decode<R, T>(
    operation: &'static str,
    row: &PgRow,
    convert: impl FnOnce(R) -> DomainResult<T>,
) -> StoreResult<T>
where
    R: for<'r> FromRow<'r, PgRow>,
{
    let raw = R::from_row(row)
        .map_err(|e| StoreError::decode(operation, format!("failed to deserialize row: {e}")))?;
    convert(raw).map_err(|e| StoreError::decode(operation, e.to_string()))
}

fn person<T: From<PersonRow>>(row: PersonRow) -> DomainResult<T> {
    Ok(row.into())
}

// SQLx row types

#[derive(Debug)]
struct ClassificationRow {
    id: i64,
    name: String,
    level: i16,
    parent_id: Option<i64>,
    status: i16,
}

impl<'r> FromRow<'r, PgRow> for ClassificationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ClassificationRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            level: row.try_get("level")?,
            parent_id: row.try_get("parent_id")?,
            status: row.try_get("status")?,
        })
    }
}

impl ClassificationRow {
    fn into_domain(self) -> DomainResult<Classification> {
        let level = ClassificationLevel::from_code(self.level.into())?;
        let scope = ClassificationScope::from_parts(level, self.parent_id.and_then(ClassificationId::positive))?;
        Ok(Classification {
            id: ClassificationId::new(self.id),
            name: self.name,
            scope,
            status: RecordStatus::from_code(self.status.into())?,
        })
    }
}

#[derive(Debug)]
struct NamedRow {
    id: i64,
    name: String,
    status: i16,
}

impl<'r> FromRow<'r, PgRow> for NamedRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(NamedRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            status: row.try_get("status")?,
        })
    }
}

impl NamedRow {
    fn into_brand(self) -> DomainResult<Brand> {
        Ok(Brand {
            id: BrandId::new(self.id),
            name: self.name,
            status: RecordStatus::from_code(self.status.into())?,
        })
    }

    fn into_attribute(self, values: Vec<String>) -> DomainResult<Attribute> {
        Ok(Attribute {
            id: AttributeId::new(self.id),
            name: self.name,
            status: RecordStatus::from_code(self.status.into())?,
            values,
        })
    }
}

#[derive(Debug)]
struct PersonRow {
    id: i64,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PersonRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PersonRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<PersonRow> for Student {
    fn from(row: PersonRow) -> Self {
        Student {
            id: StudentId::new(row.id),
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

impl From<PersonRow> for Coach {
    fn from(row: PersonRow) -> Self {
        Coach {
            id: CoachId::new(row.id),
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct ContractRow {
    id: i64,
    name: String,
    student_id: i64,
    contract_type: i16,
    signature_form: i16,
    amount: i64,
    signatory: Option<String>,
    initiating_party: Option<String>,
    initiator: i64,
    status: i16,
    payment_status: i16,
    termination_agreement: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ContractRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ContractRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            student_id: row.try_get("student_id")?,
            contract_type: row.try_get("contract_type")?,
            signature_form: row.try_get("signature_form")?,
            amount: row.try_get("amount")?,
            signatory: row.try_get("signatory")?,
            initiating_party: row.try_get("initiating_party")?,
            initiator: row.try_get("initiator")?,
            status: row.try_get("status")?,
            payment_status: row.try_get("payment_status")?,
            termination_agreement: row.try_get("termination_agreement")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ContractRow {
    fn into_domain(self) -> DomainResult<Contract> {
        Ok(Contract {
            id: ContractId::new(self.id),
            name: self.name,
            student_id: StudentId::new(self.student_id),
            contract_type: ContractType::from_code(self.contract_type.into())?,
            signature_form: SignatureForm::from_code(self.signature_form.into())?,
            amount: self.amount,
            signatory: self.signatory,
            initiating_party: self.initiating_party,
            initiator: UserId::new(self.initiator),
            status: ContractStatus::from_code(self.status.into())?,
            payment_status: self.payment_status,
            termination_agreement: self.termination_agreement,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const CLASSIFICATION_COLUMNS: &str = "id, name, level, parent_id, status";
const CONTRACT_COLUMNS: &str = "id, name, student_id, contract_type, signature_form, amount, \
     signatory, initiating_party, initiator, status, payment_status, termination_agreement, \
     created_at, updated_at";

/// Top-level rows store a NULL parent.
fn scope_columns(scope: ClassificationScope) -> (i16, Option<i64>) {
    (scope.level().code(), scope.parent_id().map(|p| p.get()))
}

fn link_columns(links: &[StudentCoachLink]) -> (Vec<i64>, Vec<i64>) {
    links
        .iter()
        .map(|l| (l.student_id.get(), l.coach_id.get()))
        .unzip()
}

#[async_trait::async_trait]
impl ClassificationStore for PostgresStore {
    #[instrument(skip(self), fields(scope = ?scope), err)]
    async fn insert_classification(
        &self,
        name: &str,
        scope: ClassificationScope,
        status: RecordStatus,
    ) -> StoreResult<ClassificationId> {
        let (level, parent_id) = scope_columns(scope);
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO classifications (name, level, parent_id, status) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(name)
        .bind(level)
        .bind(parent_id)
        .bind(status.code())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_classification", e))?;
        Ok(ClassificationId::new(id))
    }

    async fn get_classification(&self, id: ClassificationId) -> StoreResult<Option<Classification>> {
        let row = sqlx::query(&format!(
            "SELECT {CLASSIFICATION_COLUMNS} FROM classifications WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_classification", e))?;

        row.map(|r| decode("get_classification", &r, ClassificationRow::into_domain))
            .transpose()
    }

    #[instrument(skip(self), fields(id = %id, scope = ?scope), err)]
    async fn update_classification(
        &self,
        id: ClassificationId,
        name: &str,
        scope: ClassificationScope,
    ) -> StoreResult<bool> {
        let (level, parent_id) = scope_columns(scope);
        let result = sqlx::query(
            "UPDATE classifications SET name = $2, level = $3, parent_id = $4 WHERE id = $1",
        )
        .bind(id.get())
        .bind(name)
        .bind(level)
        .bind(parent_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_classification", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_classification_status(
        &self,
        id: ClassificationId,
        status: RecordStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE classifications SET status = $2 WHERE id = $1")
            .bind(id.get())
            .bind(status.code())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_classification_status", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_named_in_scope(
        &self,
        name: &str,
        scope: ClassificationScope,
        exclude: Option<ClassificationId>,
    ) -> StoreResult<u64> {
        let (level, parent_id) = scope_columns(scope);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM classifications \
             WHERE name = $1 AND level = $2 AND parent_id IS NOT DISTINCT FROM $3 AND id <> $4",
        )
        .bind(name)
        .bind(level)
        .bind(parent_id)
        .bind(exclude.map(|id| id.get()).unwrap_or(0))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_named_in_scope", e))?;
        Ok(count as u64)
    }

    async fn count_children(&self, parent: ClassificationId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM classifications WHERE level = 1 AND parent_id = $1",
        )
        .bind(parent.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_children", e))?;
        Ok(count as u64)
    }

    async fn list_classifications(
        &self,
        filter: ClassificationFilter,
    ) -> StoreResult<Vec<Classification>> {
        let (condition, parent) = match filter {
            ClassificationFilter::All => ("TRUE", None),
            ClassificationFilter::TopLevel => ("level = 0", None),
            ClassificationFilter::Active => ("status = 0", None),
            ClassificationFilter::ChildrenOf(parent) => ("level = 1 AND parent_id = $1", Some(parent.get())),
        };
        let sql = format!("SELECT {CLASSIFICATION_COLUMNS} FROM classifications WHERE {condition} ORDER BY id");

        let mut query = sqlx::query(&sql);
        if let Some(parent) = parent {
            query = query.bind(parent);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_classifications", e))?;

        rows.iter()
            .map(|r| decode("list_classifications", r, ClassificationRow::into_domain))
            .collect()
    }
}

#[async_trait::async_trait]
impl BrandStore for PostgresStore {
    async fn insert_brand(&self, name: &str) -> StoreResult<BrandId> {
        let id: i64 = sqlx::query_scalar("INSERT INTO brands (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_brand", e))?;
        Ok(BrandId::new(id))
    }

    async fn get_brand(&self, id: BrandId) -> StoreResult<Option<Brand>> {
        let row = sqlx::query("SELECT id, name, status FROM brands WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_brand", e))?;
        row.map(|r| decode("get_brand", &r, NamedRow::into_brand))
            .transpose()
    }

    async fn list_brands(&self) -> StoreResult<Vec<Brand>> {
        let rows = sqlx::query("SELECT id, name, status FROM brands ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_brands", e))?;
        rows.iter()
            .map(|r| decode("list_brands", r, NamedRow::into_brand))
            .collect()
    }

    async fn set_brand_status(&self, id: BrandId, status: RecordStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE brands SET status = $2 WHERE id = $1")
            .bind(id.get())
            .bind(status.code())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_brand_status", e))?;
        Ok(result.rows_affected() > 0)
    }
}

const INSERT_VALUES_SQL: &str = "INSERT INTO attribute_values (attribute_id, position, value) \
     SELECT $1, t.ord::INTEGER, t.value FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS t(value, ord)";

#[async_trait::async_trait]
impl AttributeStore for PostgresStore {
    #[instrument(skip(self, draft), fields(value_count = draft.values.len()), err)]
    async fn insert_attribute(&self, draft: &AttributeDraft) -> StoreResult<AttributeId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let id: i64 = sqlx::query_scalar("INSERT INTO attributes (name) VALUES ($1) RETURNING id")
            .bind(&draft.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_attribute", e))?;

        sqlx::query(INSERT_VALUES_SQL)
            .bind(id)
            .bind(&draft.values)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_attribute", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(AttributeId::new(id))
    }

    async fn get_attribute(&self, id: AttributeId) -> StoreResult<Option<Attribute>> {
        let Some(row) = sqlx::query("SELECT id, name, status FROM attributes WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_attribute", e))?
        else {
            return Ok(None);
        };

        let values: Vec<String> = sqlx::query_scalar(
            "SELECT value FROM attribute_values WHERE attribute_id = $1 ORDER BY position",
        )
        .bind(id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_attribute", e))?;

        decode("get_attribute", &row, |r: NamedRow| r.into_attribute(values)).map(Some)
    }

    async fn list_attributes(&self) -> StoreResult<Vec<Attribute>> {
        let rows = sqlx::query("SELECT id, name, status FROM attributes ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_attributes", e))?;

        let value_rows = sqlx::query(
            "SELECT attribute_id, value FROM attribute_values ORDER BY attribute_id, position",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_attributes", e))?;

        let mut values: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for row in value_rows {
            let attribute_id: i64 = row
                .try_get("attribute_id")
                .map_err(|e| map_sqlx_error("list_attributes", e))?;
            let value: String = row
                .try_get("value")
                .map_err(|e| map_sqlx_error("list_attributes", e))?;
            values.entry(attribute_id).or_default().push(value);
        }

        rows.iter()
            .map(|r| {
                decode("list_attributes", r, |named: NamedRow| {
                    let own = values.remove(&named.id).unwrap_or_default();
                    named.into_attribute(own)
                })
            })
            .collect()
    }

    async fn rename_attribute(&self, id: AttributeId, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE attributes SET name = $2 WHERE id = $1")
            .bind(id.get())
            .bind(name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_attribute", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, values), fields(id = %id, value_count = values.len()), err)]
    async fn replace_attribute_values(&self, id: AttributeId, values: &[String]) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM attribute_values WHERE attribute_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_attribute_values", e))?;

        sqlx::query(INSERT_VALUES_SQL)
            .bind(id.get())
            .bind(values)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_attribute_values", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait::async_trait]
impl ContractStore for PostgresStore {
    #[instrument(skip(self, draft), fields(student_id = %draft.student_id), err)]
    async fn insert_contract(
        &self,
        draft: &ContractDraft,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContractId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO contracts (name, student_id, contract_type, signature_form, amount, \
             signatory, initiating_party, initiator, status, payment_status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $10) RETURNING id",
        )
        .bind(&draft.name)
        .bind(draft.student_id.get())
        .bind(draft.contract_type.code())
        .bind(draft.signature_form.code())
        .bind(draft.amount)
        .bind(&draft.signatory)
        .bind(&draft.initiating_party)
        .bind(draft.initiator.get())
        .bind(ContractStatus::PendingReview.code())
        .bind(created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_contract", e))?;
        Ok(ContractId::new(id))
    }

    async fn get_contract(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        let row = sqlx::query(&format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_contract", e))?;
        row.map(|r| decode("get_contract", &r, ContractRow::into_domain))
            .transpose()
    }

    async fn list_contracts(&self, student: Option<StudentId>) -> StoreResult<Vec<Contract>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts \
             WHERE ($1::BIGINT IS NULL OR student_id = $1) ORDER BY id"
        ))
        .bind(student.map(|s| s.get()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_contracts", e))?;
        rows.iter()
            .map(|r| decode("list_contracts", r, ContractRow::into_domain))
            .collect()
    }

    #[instrument(
        skip(self, contract),
        fields(contract_id = %contract.id, expected = ?expected, next = ?contract.status),
        err
    )]
    async fn save_transition(
        &self,
        contract: &Contract,
        expected: ContractStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE contracts SET status = $3, termination_agreement = $4, updated_at = $5 \
             WHERE id = $1 AND status = $2",
        )
        .bind(contract.id.get())
        .bind(expected.code())
        .bind(contract.status.code())
        .bind(&contract.termination_agreement)
        .bind(contract.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_transition", e))?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait::async_trait]
impl RosterStore for PostgresStore {
    async fn insert_student(&self, draft: &StudentDraft, created_at: DateTime<Utc>) -> StoreResult<StudentId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO students (name, phone, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_student", e))?;
        Ok(StudentId::new(id))
    }

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let row = sqlx::query("SELECT id, name, phone, created_at FROM students WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_student", e))?;
        row.map(|r| decode("get_student", &r, person::<Student>))
            .transpose()
    }

    async fn list_students(&self) -> StoreResult<Vec<Student>> {
        let rows = sqlx::query("SELECT id, name, phone, created_at FROM students ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_students", e))?;
        rows.iter()
            .map(|r| decode("list_students", r, person::<Student>))
            .collect()
    }

    async fn update_student(&self, id: StudentId, draft: &StudentDraft) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE students SET name = $2, phone = $3 WHERE id = $1")
            .bind(id.get())
            .bind(&draft.name)
            .bind(&draft.phone)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_student", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_coach(&self, draft: &CoachDraft, created_at: DateTime<Utc>) -> StoreResult<CoachId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO coaches (name, phone, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_coach", e))?;
        Ok(CoachId::new(id))
    }

    async fn get_coach(&self, id: CoachId) -> StoreResult<Option<Coach>> {
        let row = sqlx::query("SELECT id, name, phone, created_at FROM coaches WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_coach", e))?;
        row.map(|r| decode("get_coach", &r, person::<Coach>))
            .transpose()
    }

    async fn list_coaches(&self) -> StoreResult<Vec<Coach>> {
        let rows = sqlx::query("SELECT id, name, phone, created_at FROM coaches ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_coaches", e))?;
        rows.iter()
            .map(|r| decode("list_coaches", r, person::<Coach>))
            .collect()
    }

    async fn update_coach(&self, id: CoachId, draft: &CoachDraft) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE coaches SET name = $2, phone = $3 WHERE id = $1")
            .bind(id.get())
            .bind(&draft.name)
            .bind(&draft.phone)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_coach", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn existing_students(&self, ids: &[i64]) -> StoreResult<HashSet<i64>> {
        self.existing_ids(
            "existing_students",
            "SELECT id FROM students WHERE id = ANY($1)",
            ids,
        )
        .await
    }

    async fn existing_coaches(&self, ids: &[i64]) -> StoreResult<HashSet<i64>> {
        self.existing_ids(
            "existing_coaches",
            "SELECT id FROM coaches WHERE id = ANY($1)",
            ids,
        )
        .await
    }

    async fn links_of(&self, owner: LinkOwner) -> StoreResult<Vec<StudentCoachLink>> {
        let sql = match owner {
            LinkOwner::Student(_) => {
                "SELECT student_id, coach_id FROM student_coaches WHERE student_id = $1 ORDER BY coach_id"
            }
            LinkOwner::Coach(_) => {
                "SELECT student_id, coach_id FROM student_coaches WHERE coach_id = $1 ORDER BY student_id"
            }
        };
        let rows = sqlx::query(sql)
            .bind(owner.raw_id())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("links_of", e))?;

        rows.iter()
            .map(|row| -> Result<StudentCoachLink, sqlx::Error> {
                Ok(StudentCoachLink {
                    student_id: StudentId::new(row.try_get("student_id")?),
                    coach_id: CoachId::new(row.try_get("coach_id")?),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("links_of", e))
    }

    #[instrument(skip(self, links), fields(batch = links.len()), err)]
    async fn insert_links(&self, links: &[StudentCoachLink]) -> StoreResult<u64> {
        if links.is_empty() {
            return Ok(0);
        }
        let (students, coaches) = link_columns(links);
        let result = sqlx::query(
            "INSERT INTO student_coaches (student_id, coach_id) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(&students)
        .bind(&coaches)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_links", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, links), fields(batch = links.len()), err)]
    async fn delete_links(&self, links: &[StudentCoachLink]) -> StoreResult<u64> {
        if links.is_empty() {
            return Ok(0);
        }
        let (students, coaches) = link_columns(links);
        let result = sqlx::query(
            "DELETE FROM student_coaches WHERE (student_id, coach_id) IN \
             (SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[]))",
        )
        .bind(&students)
        .bind(&coaches)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_links", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_all_links(&self, owner: LinkOwner) -> StoreResult<u64> {
        let sql = match owner {
            LinkOwner::Student(_) => "DELETE FROM student_coaches WHERE student_id = $1",
            LinkOwner::Coach(_) => "DELETE FROM student_coaches WHERE coach_id = $1",
        };
        let result = sqlx::query(sql)
            .bind(owner.raw_id())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_all_links", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(student_id = %id), err)]
    async fn delete_student_cascade(&self, id: StudentId) -> StoreResult<u64> {
        self.delete_person_cascade(
            "delete_student_cascade",
            "DELETE FROM student_coaches WHERE student_id = $1",
            "DELETE FROM students WHERE id = $1",
            id.get(),
        )
        .await
    }

    #[instrument(skip(self), fields(coach_id = %id), err)]
    async fn delete_coach_cascade(&self, id: CoachId) -> StoreResult<u64> {
        self.delete_person_cascade(
            "delete_coach_cascade",
            "DELETE FROM student_coaches WHERE coach_id = $1",
            "DELETE FROM coaches WHERE id = $1",
            id.get(),
        )
        .await
    }
}

#[async_trait::async_trait]
impl OrderLedger for PostgresStore {
    async fn has_active_orders(&self, student: StudentId) -> StoreResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE student_id = $1 AND status <> ALL($2))",
        )
        .bind(student.get())
        .bind(&CLOSED_ORDER_STATUSES[..])
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_active_orders", e))
    }
}
