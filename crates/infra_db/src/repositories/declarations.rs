//! Declaration repository implementation
//!
//! Row-level access to `participant_declarations`, `declaration_states`,
//! `statements` and `statement_line_items`. Reads go through the pool;
//! writes take a connection so the adapter can run a whole change set in
//! one transaction.
//!
//! Queries use the runtime-checked `sqlx::query_as` API with `FromRow`
//! rows, so building the crate does not need a live database.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

const DECLARATION_COLUMNS: &str = "id, participant_profile_id, participant_identity_id, provider_id, \
     course_identifier, declaration_type, declaration_date, evidence_held, cohort, state, \
     superseded_by_id, created_at, updated_at";

const STATEMENT_COLUMNS: &str =
    "id, name, provider_id, provider_name, cohort, deadline, output_fee, paid_at, created_at";

const LINE_ITEM_COLUMNS: &str =
    "id, participant_declaration_id, statement_id, intent, active, created_at";

/// Repository for declarations and the statements they are billed on
#[derive(Debug, Clone)]
pub struct DeclarationRepository {
    pool: PgPool,
}

impl DeclarationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts a transaction for a change set
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub async fn get_declaration(&self, id: Uuid) -> Result<Option<DeclarationRow>, DatabaseError> {
        let sql = format!("SELECT {DECLARATION_COLUMNS} FROM participant_declarations WHERE id = $1");
        let row = sqlx::query_as::<_, DeclarationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// The non-voided declaration with this submission tuple
    pub async fn find_submission(
        &self,
        key: &SubmissionKeyParams<'_>,
    ) -> Result<Option<DeclarationRow>, DatabaseError> {
        let sql = format!(
            "SELECT {DECLARATION_COLUMNS} FROM participant_declarations
             WHERE participant_profile_id = $1
               AND provider_id = $2
               AND course_identifier = $3
               AND declaration_type = $4
               AND declaration_date = $5
               AND state <> 'voided'"
        );
        let row = sqlx::query_as::<_, DeclarationRow>(&sql)
            .bind(key.participant_profile_id)
            .bind(key.provider_id)
            .bind(key.course_identifier)
            .bind(key.declaration_type)
            .bind(key.declaration_date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Every declaration for a person, provider, course and type, oldest first
    pub async fn find_in_scope(
        &self,
        participant_identity_id: Uuid,
        provider_id: Uuid,
        course_identifier: &str,
        declaration_type: &str,
    ) -> Result<Vec<DeclarationRow>, DatabaseError> {
        let sql = format!(
            "SELECT {DECLARATION_COLUMNS} FROM participant_declarations
             WHERE participant_identity_id = $1
               AND provider_id = $2
               AND course_identifier = $3
               AND declaration_type = $4
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, DeclarationRow>(&sql)
            .bind(participant_identity_id)
            .bind(provider_id)
            .bind(course_identifier)
            .bind(declaration_type)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// State history for a set of declarations, in the order it was written
    pub async fn states_for(&self, declaration_ids: &[Uuid]) -> Result<Vec<DeclarationStateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DeclarationStateRow>(
            "SELECT id, participant_declaration_id, state, state_reason, created_at
             FROM declaration_states
             WHERE participant_declaration_id = ANY($1)
             ORDER BY created_at, id",
        )
        .bind(declaration_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_declaration(conn: &mut PgConnection, row: &DeclarationRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO participant_declarations (
                id, participant_profile_id, participant_identity_id, provider_id,
                course_identifier, declaration_type, declaration_date, evidence_held, cohort,
                state, superseded_by_id, created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(row.id)
        .bind(row.participant_profile_id)
        .bind(row.participant_identity_id)
        .bind(row.provider_id)
        .bind(&row.course_identifier)
        .bind(&row.declaration_type)
        .bind(row.declaration_date)
        .bind(&row.evidence_held)
        .bind(row.cohort)
        .bind(&row.state)
        .bind(row.superseded_by_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn insert_state(conn: &mut PgConnection, row: &DeclarationStateRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO declaration_states (id, participant_declaration_id, state, state_reason, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.id)
        .bind(row.participant_declaration_id)
        .bind(&row.state)
        .bind(&row.state_reason)
        .bind(row.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Moves a declaration from `from` to `to` only if it is still in `from`
    ///
    /// # Errors
    ///
    /// `NotFound` when the declaration does not exist, `StaleState` when it
    /// has already left `from`.
    pub async fn compare_and_set_state(
        conn: &mut PgConnection,
        id: Uuid,
        from: &str,
        to: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let updated = sqlx::query(
            "UPDATE participant_declarations SET state = $3, updated_at = $4
             WHERE id = $1 AND state = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(at)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(());
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT state FROM participant_declarations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        match current {
            None => Err(DatabaseError::not_found("Declaration", id)),
            Some(state) => Err(DatabaseError::StaleState(format!(
                "declaration {} is {}, expected {}",
                id, state, from
            ))),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub async fn get_statement(&self, id: Uuid) -> Result<Option<StatementRow>, DatabaseError> {
        let sql = format!("SELECT {STATEMENT_COLUMNS} FROM statements WHERE id = $1");
        let row = sqlx::query_as::<_, StatementRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Statements matching every supplied filter, by deadline
    pub async fn find_statements(
        &self,
        provider_id: Option<Uuid>,
        cohort: Option<i32>,
        name: Option<&str>,
    ) -> Result<Vec<StatementRow>, DatabaseError> {
        let sql = format!(
            "SELECT {STATEMENT_COLUMNS} FROM statements
             WHERE ($1::uuid IS NULL OR provider_id = $1)
               AND ($2::integer IS NULL OR cohort = $2)
               AND ($3::text IS NULL OR name = $3)
             ORDER BY deadline, id"
        );
        let rows = sqlx::query_as::<_, StatementRow>(&sql)
            .bind(provider_id)
            .bind(cohort)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn insert_statement(&self, row: &StatementRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO statements (
                id, name, provider_id, provider_name, cohort, deadline, output_fee, paid_at, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(row.provider_id)
        .bind(&row.provider_name)
        .bind(row.cohort)
        .bind(row.deadline)
        .bind(row.output_fee)
        .bind(row.paid_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Locks a statement row for the rest of the transaction and returns its deadline
    pub async fn lock_statement_deadline(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<DateTime<Utc>, DatabaseError> {
        let deadline: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT deadline FROM statements WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        deadline.ok_or_else(|| DatabaseError::not_found("Statement", id))
    }

    /// Applies the supplied fields; `None` leaves a column unchanged
    pub async fn update_statement(
        conn: &mut PgConnection,
        id: Uuid,
        deadline: Option<DateTime<Utc>>,
        output_fee: Option<bool>,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), DatabaseError> {
        let updated = sqlx::query(
            "UPDATE statements SET
                deadline = COALESCE($2, deadline),
                output_fee = COALESCE($3, output_fee),
                paid_at = COALESCE($4, paid_at)
             WHERE id = $1",
        )
        .bind(id)
        .bind(deadline)
        .bind(output_fee)
        .bind(paid_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DatabaseError::not_found("Statement", id));
        }
        Ok(())
    }

    // =========================================================================
    // Line items
    // =========================================================================

    pub async fn line_items_for_statement(&self, statement_id: Uuid) -> Result<Vec<LineItemRow>, DatabaseError> {
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM statement_line_items
             WHERE statement_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&sql)
            .bind(statement_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn line_items_for_declaration(&self, declaration_id: Uuid) -> Result<Vec<LineItemRow>, DatabaseError> {
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM statement_line_items
             WHERE participant_declaration_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&sql)
            .bind(declaration_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn insert_line_item(conn: &mut PgConnection, row: &LineItemRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO statement_line_items (
                id, participant_declaration_id, statement_id, intent, active, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(row.id)
        .bind(row.participant_declaration_id)
        .bind(row.statement_id)
        .bind(&row.intent)
        .bind(row.active)
        .bind(row.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn deactivate_line_item(conn: &mut PgConnection, id: Uuid) -> Result<(), DatabaseError> {
        let updated = sqlx::query("UPDATE statement_line_items SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(DatabaseError::not_found("LineItem", id));
        }
        Ok(())
    }

    /// Re-points line items from one statement to another
    ///
    /// With `declaration_types` set, only items whose declaration has one of
    /// those types move. Returns the number of items moved.
    pub async fn move_line_items(
        conn: &mut PgConnection,
        from: Uuid,
        to: Uuid,
        declaration_types: Option<&[String]>,
    ) -> Result<u64, DatabaseError> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM statements WHERE id = $1")
            .bind(to)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::not_found("Statement", to));
        }

        let moved = sqlx::query(
            "UPDATE statement_line_items AS li SET statement_id = $2
             FROM participant_declarations AS d
             WHERE li.participant_declaration_id = d.id
               AND li.statement_id = $1
               AND ($3::text[] IS NULL OR d.declaration_type = ANY($3))",
        )
        .bind(from)
        .bind(to)
        .bind(declaration_types)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        Ok(moved)
    }
}

/// Columns identifying one submission
#[derive(Debug, Clone, Copy)]
pub struct SubmissionKeyParams<'a> {
    pub participant_profile_id: Uuid,
    pub provider_id: Uuid,
    pub course_identifier: &'a str,
    pub declaration_type: &'a str,
    pub declaration_date: DateTime<Utc>,
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeclarationRow {
    pub id: Uuid,
    pub participant_profile_id: Uuid,
    pub participant_identity_id: Uuid,
    pub provider_id: Uuid,
    pub course_identifier: String,
    pub declaration_type: String,
    pub declaration_date: DateTime<Utc>,
    pub evidence_held: Option<String>,
    pub cohort: i32,
    pub state: String,
    pub superseded_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeclarationStateRow {
    pub id: Uuid,
    pub participant_declaration_id: Uuid,
    pub state: String,
    pub state_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatementRow {
    pub id: Uuid,
    pub name: String,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub cohort: i32,
    pub deadline: DateTime<Utc>,
    pub output_fee: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LineItemRow {
    pub id: Uuid,
    pub participant_declaration_id: Uuid,
    pub statement_id: Uuid,
    pub intent: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
