//! Portal-level integration tests: email scoping, internal-response
//! visibility and the admin call surface, all against in-memory SQLite.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use ticket_desk::{
    AdminPortal, CreateTicketInput, TicketPriority, TicketStatus, TicketStore, UserPortal,
    MISSING_USER_NAME, USER_RESPONDER,
};

async fn portals() -> (UserPortal, AdminPortal, Arc<TicketStore>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    let store = TicketStore::new(pool);
    store.ensure_schema().await.expect("ensure schema");
    let store = Arc::new(store);
    (
        UserPortal::new(store.clone()),
        AdminPortal::new(store.clone()),
        store,
    )
}

#[tokio::test]
async fn login_ticket_scenario_hides_internal_note_from_user() -> anyhow::Result<()> {
    let (user, admin, _store) = portals().await;

    let ticket = user
        .create_ticket(
            "Login fails",
            "Cannot log in",
            "u@x.com",
            "Uli",
            TicketPriority::High,
        )
        .await?;
    assert_eq!(ticket.id, 1);
    assert_eq!(ticket.status, TicketStatus::Open);

    admin
        .add_response(ticket.id, "Please reset password", "agent1", false)
        .await?;
    let thread = user.get_ticket(ticket.id, "u@x.com").await?.expect("own ticket");
    assert_eq!(thread.responses.len(), 1);

    admin
        .add_response(ticket.id, "internal note", "agent1", true)
        .await?;

    // The internal note never reaches the submitter, even with the right email.
    let thread = user.get_ticket(ticket.id, "u@x.com").await?.expect("own ticket");
    assert_eq!(thread.responses.len(), 1);
    assert!(thread.responses.iter().all(|r| !r.is_internal));

    let full = admin.get_ticket(ticket.id).await?.expect("admin sees all");
    assert_eq!(full.responses.len(), 2);
    assert_eq!(full.responses[0].response_text, "Please reset password");
    assert_eq!(full.responses[1].response_text, "internal note");
    assert!(full.responses[1].is_internal);

    Ok(())
}

#[tokio::test]
async fn close_and_assign_scenario() -> anyhow::Result<()> {
    let (user, admin, _store) = portals().await;

    let ticket = user
        .create_ticket(
            "Login fails",
            "Cannot log in",
            "u@x.com",
            "Uli",
            TicketPriority::High,
        )
        .await?;

    admin
        .update_status(ticket.id, TicketStatus::Closed, Some("agent1"))
        .await?;

    let closed = admin.get_ticket(ticket.id).await?.expect("ticket").ticket;
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.assigned_to.as_deref(), Some("agent1"));
    assert!(closed.updated_at >= closed.created_at);

    Ok(())
}

#[tokio::test]
async fn user_cannot_see_or_touch_foreign_tickets() -> anyhow::Result<()> {
    let (user, admin, _store) = portals().await;

    let ticket = user
        .create_ticket("Mine", "my problem", "a@x.com", "A", TicketPriority::Medium)
        .await?;

    // Wrong email and missing id are indistinguishable: both "not found".
    assert!(user.get_ticket(ticket.id, "b@x.com").await?.is_none());
    assert!(user.get_ticket(ticket.id, "A@x.com").await?.is_none());
    assert!(user.get_ticket(999, "a@x.com").await?.is_none());

    assert!(!user.add_comment(ticket.id, "b@x.com", "sneaky").await?);
    assert!(!user.add_comment(999, "a@x.com", "void").await?);

    let full = admin.get_ticket(ticket.id).await?.expect("ticket");
    assert!(full.responses.is_empty(), "rejected comments insert nothing");

    Ok(())
}

#[tokio::test]
async fn user_comment_uses_role_marker_and_bumps_ticket() -> anyhow::Result<()> {
    let (user, admin, store) = portals().await;

    let ticket = user
        .create_ticket("Mine", "my problem", "a@x.com", "A", TicketPriority::Medium)
        .await?;

    assert!(user.add_comment(ticket.id, "a@x.com", "any update?").await?);

    let full = admin.get_ticket(ticket.id).await?.expect("ticket");
    assert_eq!(full.responses.len(), 1);
    let comment = &full.responses[0];
    assert_eq!(comment.responded_by, USER_RESPONDER);
    assert!(!comment.is_internal);
    assert!(full.ticket.updated_at >= comment.created_at);

    // The store-level view agrees with the portal's.
    assert_eq!(store.responses_for(ticket.id, true).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn my_tickets_is_scoped_and_newest_first() -> anyhow::Result<()> {
    let (user, _admin, _store) = portals().await;

    user.create_ticket("one", "first problem", "a@x.com", "A", TicketPriority::Low)
        .await?;
    user.create_ticket("two", "second problem", "a@x.com", "A", TicketPriority::Low)
        .await?;
    user.create_ticket("other", "someone else", "b@x.com", "B", TicketPriority::Low)
        .await?;

    let mine = user.my_tickets("a@x.com").await?;
    assert_eq!(
        mine.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
        vec!["two", "one"]
    );
    assert!(user.my_tickets("A@x.com").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn admin_list_search_and_statistics() -> anyhow::Result<()> {
    let (user, admin, _store) = portals().await;

    user.create_ticket(
        "Login fails",
        "Cannot log in",
        "u@x.com",
        "Uli",
        TicketPriority::High,
    )
    .await?;
    user.create_ticket("Slow VPN", "very slow", "v@x.com", "Vic", TicketPriority::Medium)
        .await?;
    admin
        .update_status(2, TicketStatus::InProgress, Some("agent2"))
        .await?;

    let all = admin.list_tickets(None).await?;
    assert_eq!(all.len(), 2);
    let in_progress = admin.list_tickets(Some(TicketStatus::InProgress)).await?;
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].title, "Slow VPN");

    let found = admin.search("LOGIN").await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Login fails");

    let stats = admin.statistics().await?;
    assert_eq!(stats.total_count, 2);
    let sum: i64 = stats.by_status.iter().map(|c| c.count).sum();
    assert_eq!(stats.total_count, sum);

    Ok(())
}

#[tokio::test]
async fn display_name_falls_back_for_legacy_tickets() -> anyhow::Result<()> {
    let (_user, _admin, store) = portals().await;

    // Stores upgraded from the pre-user_name schema yield rows without one.
    let anonymous = store
        .create_ticket(&CreateTicketInput {
            title: "No name".to_owned(),
            description: "legacy-shaped row".to_owned(),
            email: "x@x.com".to_owned(),
            user_name: None,
            priority: TicketPriority::Medium,
        })
        .await?;
    assert_eq!(AdminPortal::display_name(&anonymous), MISSING_USER_NAME);

    let named = store
        .create_ticket(&CreateTicketInput {
            title: "Named".to_owned(),
            description: "has a submitter name".to_owned(),
            email: "y@x.com".to_owned(),
            user_name: Some("Yana".to_owned()),
            priority: TicketPriority::Medium,
        })
        .await?;
    assert_eq!(AdminPortal::display_name(&named), "Yana");

    Ok(())
}
