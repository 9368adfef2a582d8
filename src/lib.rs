//! # ticket-desk
//!
//! Persistence and query layer for a support-ticket tracker.
//!
//! ## Features
//!
//! - **Tickets** - creation, retrieval, filtered listing, status and
//!   assignment transitions
//! - **Threaded responses** - public replies and internal staff notes
//! - **Two portals** - an email-scoped user view and an unrestricted admin
//!   view over one shared store
//! - **Search & statistics** - substring search and aggregate counts
//! - **SQLite store** - single-file relational store with schema-evolution
//!   tolerance for legacy databases
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ticket_desk::{AdminPortal, TicketPriority, TicketStore, UserPortal};
//!
//! # async fn example() -> ticket_desk::Result<()> {
//! let store = Arc::new(TicketStore::open("support_system.db").await?);
//! let user = UserPortal::new(store.clone());
//! let admin = AdminPortal::new(store);
//!
//! let ticket = user
//!     .create_ticket(
//!         "Login fails",
//!         "Cannot log in to account",
//!         "u@x.com",
//!         "Uli",
//!         TicketPriority::High,
//!     )
//!     .await?;
//!
//! admin
//!     .add_response(ticket.id, "Please reset your password", "agent1", false)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Authorization is ownership by exact email match, nothing more: the user
//! portal answers "not found" both for tickets that do not exist and for
//! tickets owned by another email.

pub mod models;
pub mod portal;
pub mod store;

// Re-export commonly used types
pub use models::*;
pub use portal::{AdminPortal, UserPortal, MISSING_USER_NAME, USER_RESPONDER};
pub use store::TicketStore;

use thiserror::Error;

/// Ticket system errors
#[derive(Error, Debug)]
pub enum TicketError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ticket not found: {0}")]
    TicketNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, TicketError>;
