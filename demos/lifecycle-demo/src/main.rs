//! Staffdesk Lifecycle Walkthrough
//!
//! Runs an expense reimbursement and a support ticket through their
//! full lifecycles against in-memory backends, then prints the audit
//! trail and the notifications each role received.

use async_trait::async_trait;
use staffdesk_engine::TransitionIntent;
use staffdesk_notify::InMemoryRoleDirectory;
use staffdesk_service::StaffdeskService;
use staffdesk_storage::{BlobSigner, StorageError};
use staffdesk_types::{Actor, CommunityId, NewRequest, RequestState, Role, UserId};
use std::sync::Arc;
use std::time::Duration;

struct DemoSigner;

#[async_trait]
impl BlobSigner for DemoSigner {
    async fn sign(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        Ok(format!("https://blobs.example/{path}?ttl={}", ttl.as_secs()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("=== Staffdesk request lifecycle walkthrough ===\n");

    let directory = InMemoryRoleDirectory::new();
    directory.add_user(UserId::new("mario"), Role::Collaborator, Some("mario@example.org"));
    directory.add_user(UserId::new("rita"), Role::Reviewer, Some("rita@example.org"));
    directory.add_user(UserId::new("anna"), Role::Admin, Some("anna@example.org"));
    directory.assign_reviewer(UserId::new("rita"), CommunityId::new("field-ops"));

    let service = StaffdeskService::new(Arc::new(directory), Arc::new(DemoSigner));

    let mario = Actor::collaborator(UserId::new("mario"));
    let rita = Actor::reviewer(UserId::new("rita"), [CommunityId::new("field-ops")]);
    let anna = Actor::admin(UserId::new("anna"));

    // ── Expense: filed, reviewed, approved, paid ─────────────────────

    println!("-- Expense reimbursement --");
    let expense = service
        .create_request(
            &mario,
            NewRequest::expense("Taxi to client site", 4500)
                .with_community(CommunityId::new("field-ops")),
        )
        .await?;
    println!("mario files an expense of 45.00 -> {}", expense.state);

    let attachment = service
        .add_attachment(&mario, &expense.id, "receipt.pdf")
        .await?;
    println!("mario attaches {} -> {}", attachment.filename, attachment.storage_path);

    for (actor, name, target) in [
        (&rita, "rita", RequestState::PreApprovedByReviewer),
        (&anna, "anna", RequestState::ApprovedByAdmin),
        (&anna, "anna", RequestState::Paid),
    ] {
        let outcome = service
            .apply_transition(
                actor,
                TransitionIntent::new(expense.id.clone(), target).with_note("ok"),
            )
            .await?;
        println!("{name} moves the expense -> {}", outcome.request.state);
    }

    let urls = service
        .attachment_urls(&mario, &expense.id, &attachment.id)
        .await?;
    println!(
        "signed retrieval link: {}",
        urls.original_url.as_deref().unwrap_or("<unavailable>")
    );

    // ── Ticket: opened, worked, closed, reopened ─────────────────────

    println!("\n-- Support ticket --");
    let ticket = service
        .create_request(&mario, NewRequest::ticket("VPN down", "cannot connect since 9:00"))
        .await?;
    println!("mario opens a ticket -> {}", ticket.state);

    for target in [RequestState::InProgress, RequestState::Closed, RequestState::Open] {
        let outcome = service
            .apply_transition(&rita, TransitionIntent::new(ticket.id.clone(), target))
            .await?;
        println!("rita moves the ticket -> {}", outcome.request.state);
    }

    // Detached notification deliveries settle quickly.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // ── Audit trail and notifications ────────────────────────────────

    println!("\n-- Audit trail (expense) --");
    let detail = service.request_detail(&anna, &expense.id).await?;
    for entry in &detail.history {
        println!(
            "{} {} -> {} by {}{}",
            entry.created_at.format("%H:%M:%S"),
            entry
                .previous_state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(created)".to_string()),
            entry.new_state,
            entry.role,
            entry
                .note
                .as_deref()
                .map(|n| format!(" (\"{n}\")"))
                .unwrap_or_default(),
        );
    }

    println!("\n-- Inboxes --");
    for actor in [&mario, &rita, &anna] {
        let inbox = service.notifications(actor).await?;
        println!("{} has {} notification(s):", actor.user_id, inbox.len());
        for n in inbox {
            println!("  [{}] {}", n.event_key, n.message);
        }
    }

    println!("\nDemo complete!");
    Ok(())
}
