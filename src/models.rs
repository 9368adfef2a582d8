use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::TicketError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_to: Option<String>,
    pub email: String,
    /// `None` on rows written before the column existed.
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in-progress" => Ok(TicketStatus::InProgress),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(TicketError::InvalidInput(format!(
                "unknown status '{other}' (expected open/in-progress/closed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            other => Err(TicketError::InvalidInput(format!(
                "unknown priority '{other}' (expected low/medium/high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketResponse {
    pub id: i64,
    pub ticket_id: i64,
    pub response_text: String,
    /// Staff name, or the user-role marker for submitter comments.
    pub responded_by: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// A ticket together with its responses, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketThread {
    pub ticket: Ticket,
    pub responses: Vec<TicketResponse>,
}

// Input types
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicketInput {
    pub title: String,
    pub description: String,
    pub email: String,
    pub user_name: Option<String>,
    pub priority: TicketPriority,
}

// Statistics structures
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriorityCount {
    pub priority: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketStatistics {
    pub by_status: Vec<StatusCount>,
    pub by_priority: Vec<PriorityCount>,
    /// Tickets created on the current UTC date.
    pub today_count: i64,
    /// Always the sum of `by_status` counts.
    pub total_count: i64,
}
