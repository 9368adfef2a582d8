use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

use crate::models::{
    CreateTicketInput, PriorityCount, StatusCount, Ticket, TicketResponse, TicketStatistics,
    TicketStatus, TicketThread,
};
use crate::{Result, TicketError};

const CREATE_TICKETS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    priority TEXT NOT NULL DEFAULT 'medium',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    assigned_to TEXT,
    email TEXT NOT NULL,
    user_name TEXT
)
"#;

const CREATE_RESPONSES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS ticket_responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL,
    response_text TEXT NOT NULL,
    responded_by TEXT NOT NULL,
    is_internal INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (ticket_id) REFERENCES tickets (id)
)
"#;

pub struct TicketStore {
    pool: SqlitePool,
}

impl TicketStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a store file and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Idempotently create both tables and upgrade stores written before the
    /// `user_name` column existed. Safe to call on every process start; the
    /// column probe runs once here, never on the read paths.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TICKETS_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create tickets table: {}", e);
                TicketError::Database(e)
            })?;
        sqlx::query(CREATE_RESPONSES_SQL).execute(&self.pool).await?;

        let has_user_name: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM pragma_table_info('tickets') WHERE name = 'user_name'")
                .fetch_optional(&self.pool)
                .await?;
        if has_user_name.is_none() {
            tracing::info!("Upgrading legacy tickets table: adding user_name column");
            sqlx::query("ALTER TABLE tickets ADD COLUMN user_name TEXT")
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Create a new ticket. Status starts as `open`; `created_at` and
    /// `updated_at` are set to the same instant.
    pub async fn create_ticket(&self, input: &CreateTicketInput) -> Result<Ticket> {
        if input.title.trim().is_empty() {
            return Err(TicketError::InvalidInput("title must not be empty".into()));
        }
        if input.description.trim().is_empty() {
            return Err(TicketError::InvalidInput(
                "description must not be empty".into(),
            ));
        }

        let now = Utc::now();
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                title, description, status, priority, created_at, updated_at, email, user_name
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(TicketStatus::Open)
        .bind(input.priority)
        .bind(now)
        .bind(now)
        .bind(&input.email)
        .bind(&input.user_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create ticket: {}", e);
            TicketError::Database(e)
        })?;

        Ok(ticket)
    }

    /// Get ticket by ID; `None` when no such row exists.
    pub async fn get_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Get a ticket with its responses, oldest first. Internal responses are
    /// excluded unless `include_internal` is set.
    pub async fn fetch_thread(
        &self,
        ticket_id: i64,
        include_internal: bool,
    ) -> Result<Option<TicketThread>> {
        let Some(ticket) = self.get_ticket(ticket_id).await? else {
            return Ok(None);
        };
        let responses = self.responses_for(ticket_id, include_internal).await?;

        Ok(Some(TicketThread { ticket, responses }))
    }

    /// Responses for a ticket ordered by creation time ascending.
    pub async fn responses_for(
        &self,
        ticket_id: i64,
        include_internal: bool,
    ) -> Result<Vec<TicketResponse>> {
        let sql = if include_internal {
            "SELECT * FROM ticket_responses WHERE ticket_id = ? \
             ORDER BY created_at ASC, id ASC"
        } else {
            "SELECT * FROM ticket_responses WHERE ticket_id = ? AND is_internal = 0 \
             ORDER BY created_at ASC, id ASC"
        };

        let responses = sqlx::query_as::<_, TicketResponse>(sql)
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(responses)
    }

    /// List tickets, newest first, optionally filtered by status.
    pub async fn list_tickets(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>> {
        let tickets = match status {
            Some(status) => {
                sqlx::query_as::<_, Ticket>(
                    "SELECT * FROM tickets WHERE status = ? ORDER BY created_at DESC, id DESC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Ticket>(
                    "SELECT * FROM tickets ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(tickets)
    }

    /// Tickets submitted under exactly this email, newest first. No
    /// case-folding or normalization is applied.
    pub async fn list_tickets_for_email(&self, email: &str) -> Result<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE email = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Set a ticket's status and optionally its handler, refreshing
    /// `updated_at`. A `None` handler keeps the existing assignment.
    pub async fn update_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
        assigned_to: Option<&str>,
    ) -> Result<Ticket> {
        let now = Utc::now();
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets SET
                status = ?,
                assigned_to = COALESCE(?, assigned_to),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(assigned_to)
        .bind(now)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TicketError::TicketNotFound(ticket_id))?;

        Ok(ticket)
    }

    /// Append a response to a ticket and refresh the parent's `updated_at`.
    /// Both statements run in one transaction. Fails with `TicketNotFound`
    /// when the ticket does not exist.
    pub async fn add_response(
        &self,
        ticket_id: i64,
        response_text: &str,
        responded_by: &str,
        is_internal: bool,
    ) -> Result<TicketResponse> {
        if response_text.trim().is_empty() {
            return Err(TicketError::InvalidInput(
                "response text must not be empty".into(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(TicketError::TicketNotFound(ticket_id));
        }

        let response = sqlx::query_as::<_, TicketResponse>(
            r#"
            INSERT INTO ticket_responses (ticket_id, response_text, responded_by, is_internal, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(response_text)
        .bind(responded_by)
        .bind(is_internal)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE tickets SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(response)
    }

    /// Substring search over title, description and email, newest first.
    /// SQLite's default LIKE is case-insensitive for ASCII.
    pub async fn search(&self, query: &str) -> Result<Vec<Ticket>> {
        let pattern = format!("%{query}%");
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets
            WHERE title LIKE ?1 OR description LIKE ?1 OR email LIKE ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Aggregate counts by status and priority, plus today's and total
    /// ticket counts. `total_count` is the sum of the status counts.
    pub async fn statistics(&self) -> Result<TicketStatistics> {
        let by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM tickets
            GROUP BY status
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let by_priority = sqlx::query_as::<_, PriorityCount>(
            r#"
            SELECT priority, COUNT(*) AS count
            FROM tickets
            GROUP BY priority
            ORDER BY
                CASE priority
                    WHEN 'high' THEN 1
                    WHEN 'medium' THEN 2
                    WHEN 'low' THEN 3
                END
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let (today_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE date(created_at) = date('now')")
                .fetch_one(&self.pool)
                .await?;

        let total_count = by_status.iter().map(|c| c.count).sum();

        Ok(TicketStatistics {
            by_status,
            by_priority,
            today_count,
            total_count,
        })
    }
}
