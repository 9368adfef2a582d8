//! Access portals over the ticket store.
//!
//! Two call surfaces share one `TicketStore`: `UserPortal` scopes every
//! operation by the caller's email and never surfaces internal responses;
//! `AdminPortal` is unrestricted and adds status/assignment mutation,
//! internal commentary, search and statistics.
//!
//! Presentation shells (menus, prompts, formatting) sit on top of these
//! portals and never touch the store directly.

use std::sync::Arc;

use crate::models::{
    CreateTicketInput, Ticket, TicketPriority, TicketResponse, TicketStatistics, TicketStatus,
    TicketThread,
};
use crate::store::TicketStore;
use crate::Result;

/// `responded_by` marker for comments submitted through the user portal.
pub const USER_RESPONDER: &str = "user";

/// Shown in place of `user_name` on tickets from stores that predate the
/// column.
pub const MISSING_USER_NAME: &str = "(not provided)";

/// Email-scoped view for submitters.
///
/// Every read and write takes the caller's email; a ticket that does not
/// exist and a ticket owned by someone else are indistinguishable from the
/// outside (both come back as `None`/`false`).
pub struct UserPortal {
    store: Arc<TicketStore>,
}

impl UserPortal {
    pub fn new(store: Arc<TicketStore>) -> Self {
        Self { store }
    }

    /// Submit a new ticket. Status starts as `open`.
    pub async fn create_ticket(
        &self,
        title: &str,
        description: &str,
        email: &str,
        user_name: &str,
        priority: TicketPriority,
    ) -> Result<Ticket> {
        let input = CreateTicketInput {
            title: title.to_owned(),
            description: description.to_owned(),
            email: email.to_owned(),
            user_name: Some(user_name.to_owned()),
            priority,
        };
        self.store.create_ticket(&input).await
    }

    /// Fetch one of the caller's tickets with its public responses.
    ///
    /// Internal responses are stripped here; the portal owns that guarantee
    /// rather than relying on the store's query shape.
    pub async fn get_ticket(&self, ticket_id: i64, email: &str) -> Result<Option<TicketThread>> {
        let Some(mut thread) = self.store.fetch_thread(ticket_id, false).await? else {
            return Ok(None);
        };
        if thread.ticket.email != email {
            return Ok(None);
        }
        thread.responses.retain(|r| !r.is_internal);

        Ok(Some(thread))
    }

    /// All tickets submitted under this exact email, newest first.
    pub async fn my_tickets(&self, email: &str) -> Result<Vec<Ticket>> {
        self.store.list_tickets_for_email(email).await
    }

    /// Add a public comment to one of the caller's tickets.
    ///
    /// Returns `false` without inserting anything when the ticket is absent
    /// or owned by a different email.
    pub async fn add_comment(&self, ticket_id: i64, email: &str, text: &str) -> Result<bool> {
        let Some(ticket) = self.store.get_ticket(ticket_id).await? else {
            return Ok(false);
        };
        if ticket.email != email {
            return Ok(false);
        }

        self.store
            .add_response(ticket_id, text, USER_RESPONDER, false)
            .await?;

        Ok(true)
    }
}

/// Unrestricted view for staff.
pub struct AdminPortal {
    store: Arc<TicketStore>,
}

impl AdminPortal {
    pub fn new(store: Arc<TicketStore>) -> Self {
        Self { store }
    }

    /// Fetch any ticket with its full thread, internal responses included.
    pub async fn get_ticket(&self, ticket_id: i64) -> Result<Option<TicketThread>> {
        self.store.fetch_thread(ticket_id, true).await
    }

    /// List tickets, newest first, optionally filtered by status.
    pub async fn list_tickets(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>> {
        self.store.list_tickets(status).await
    }

    /// Transition a ticket's status and optionally assign a handler.
    pub async fn update_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
        assigned_to: Option<&str>,
    ) -> Result<Ticket> {
        self.store.update_status(ticket_id, status, assigned_to).await
    }

    /// Add a staff response; internal responses stay invisible to the
    /// submitter.
    pub async fn add_response(
        &self,
        ticket_id: i64,
        text: &str,
        responded_by: &str,
        is_internal: bool,
    ) -> Result<TicketResponse> {
        self.store
            .add_response(ticket_id, text, responded_by, is_internal)
            .await
    }

    /// Substring search over title, description and email.
    pub async fn search(&self, query: &str) -> Result<Vec<Ticket>> {
        self.store.search(query).await
    }

    /// Aggregate counts for the statistics view.
    pub async fn statistics(&self) -> Result<TicketStatistics> {
        self.store.statistics().await
    }

    /// Submitter name for display, with a placeholder for legacy tickets
    /// that never recorded one.
    pub fn display_name(ticket: &Ticket) -> &str {
        ticket.user_name.as_deref().unwrap_or(MISSING_USER_NAME)
    }
}
