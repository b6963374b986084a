//! PostgreSQL ticket store.
//!
//! # Atomic check-in
//!
//! The check-in is one statement: a CTE snapshots the prior status and a
//! conditional `UPDATE ... WHERE status = 'issued'` claims the ticket.
//! PostgreSQL row locking serializes concurrent updates of the same row,
//! and a racer whose `WHERE` no longer matches after the winner commits
//! updates nothing. Exactly one statement reports `committed`.
//!
//! # Example
//!
//! ```no_run
//! use gatecheck_scanner::stores::postgres::PostgresTicketStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/gatecheck").await?;
//! let store = PostgresTicketStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StoreError};
use crate::providers::{CommitOutcome, TicketStore};
use crate::ticket::{Ticket, TicketId, TicketStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const FETCH_TICKET: &str = r"
    SELECT id, full_name, dni, status
    FROM tickets
    WHERE id = $1
";

const COMMIT_CHECK_IN: &str = r"
    WITH prior AS (
        SELECT status FROM tickets WHERE id = $1
    ),
    claimed AS (
        UPDATE tickets
        SET status = 'used', used_at = now()
        WHERE id = $1 AND status = 'issued'
        RETURNING id
    )
    SELECT
        EXISTS (SELECT 1 FROM claimed) AS committed,
        (SELECT status FROM prior) AS prior_status
";

const INSERT_TICKET: &str = r"
    INSERT INTO tickets (id, full_name, dni, status, used_at)
    VALUES ($1, $2, $3, $4, CASE WHEN $4 = 'used' THEN now() END)
";

/// PostgreSQL ticket store.
#[derive(Debug, Clone)]
pub struct PostgresTicketStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a new PostgreSQL ticket store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Insert a ticket. Issuance belongs to another system; this exists
    /// for seeding and tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails (including duplicate ids).
    pub async fn insert(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(INSERT_TICKET)
            .bind(ticket.id.as_str())
            .bind(&ticket.full_name)
            .bind(&ticket.dni)
            .bind(ticket.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

impl TicketStore for PostgresTicketStore {
    #[tracing::instrument(skip(self, id), fields(ticket_id = %id))]
    async fn fetch_ticket(&self, id: &TicketId) -> Result<Option<Ticket>> {
        let rows = sqlx::query(FETCH_TICKET)
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => decode_ticket(row).map(Some),
            _ => Err(StoreError::Ambiguous(id.to_string())),
        }
    }

    #[tracing::instrument(skip(self, id), fields(ticket_id = %id))]
    async fn commit_check_in(&self, id: &TicketId) -> Result<CommitOutcome> {
        let row = sqlx::query(COMMIT_CHECK_IN)
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let committed: bool = row.try_get("committed").map_err(map_sqlx_error)?;
        let prior: Option<String> = row.try_get("prior_status").map_err(map_sqlx_error)?;

        let outcome = match (committed, prior) {
            (true, _) => CommitOutcome::Committed,
            (false, None) => CommitOutcome::NotFound,
            (false, Some(_)) => CommitOutcome::AlreadyUsed,
        };
        tracing::debug!(outcome = outcome.as_str(), "Conditional check-in applied");
        Ok(outcome)
    }
}

fn decode_ticket(row: &PgRow) -> Result<Ticket> {
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    let status: TicketStatus = status
        .parse()
        .map_err(|e: crate::ticket::UnknownStatus| StoreError::Malformed(e.to_string()))?;

    Ok(Ticket {
        id: TicketId::new(row.try_get::<String, _>("id").map_err(map_sqlx_error)?),
        full_name: row.try_get("full_name").map_err(map_sqlx_error)?,
        dni: row.try_get("dni").map_err(map_sqlx_error)?,
        status,
    })
}

/// Map a sqlx error onto the store fault taxonomy.
fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Malformed(error.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}
