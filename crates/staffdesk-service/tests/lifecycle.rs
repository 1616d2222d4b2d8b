//! End-to-end lifecycle tests against the unified service.

use async_trait::async_trait;
use staffdesk_engine::TransitionIntent;
use staffdesk_notify::InMemoryRoleDirectory;
use staffdesk_service::{ServiceError, StaffdeskService};
use staffdesk_storage::{BlobSigner, StorageError};
use staffdesk_types::{
    Actor, CommunityId, EngineError, EventKey, NewRequest, RequestState, Role, UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

struct StaticSigner;

#[async_trait]
impl BlobSigner for StaticSigner {
    async fn sign(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        Ok(format!("https://blobs.example/{}?ttl={}", path, ttl.as_secs()))
    }
}

fn make_directory() -> Arc<InMemoryRoleDirectory> {
    let dir = InMemoryRoleDirectory::new();
    dir.add_user(UserId::new("mario"), Role::Collaborator, Some("mario@example.org"));
    dir.add_user(UserId::new("piero"), Role::Collaborator, None);
    dir.add_user(UserId::new("rita"), Role::Reviewer, Some("rita@example.org"));
    dir.add_user(UserId::new("ugo"), Role::Reviewer, None);
    dir.add_user(UserId::new("anna"), Role::Admin, Some("anna@example.org"));
    dir.add_user(UserId::new("aldo"), Role::Admin, None);
    dir.assign_reviewer(UserId::new("rita"), CommunityId::new("dev"));
    dir.assign_reviewer(UserId::new("ugo"), CommunityId::new("ops"));
    Arc::new(dir)
}

fn make_service() -> StaffdeskService {
    StaffdeskService::new(make_directory(), Arc::new(StaticSigner))
}

fn mario() -> Actor {
    Actor::collaborator(UserId::new("mario"))
}

fn piero() -> Actor {
    Actor::collaborator(UserId::new("piero"))
}

fn rita() -> Actor {
    Actor::reviewer(UserId::new("rita"), [CommunityId::new("dev")])
}

fn ugo() -> Actor {
    Actor::reviewer(UserId::new("ugo"), [CommunityId::new("ops")])
}

fn anna() -> Actor {
    Actor::admin(UserId::new("anna"))
}

/// Dispatch is fire-and-forget; poll until the observed side effect
/// lands or the deadline passes.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected condition never became true");
}

#[tokio::test]
async fn pre_approval_appends_history_and_notifies_admins() {
    let service = make_service();

    let request = service
        .create_request(
            &mario(),
            NewRequest::expense("Taxi to client site", 4500)
                .with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    assert_eq!(request.state, RequestState::Pending);

    let outcome = service
        .apply_transition(
            &rita(),
            TransitionIntent::new(request.id.clone(), RequestState::PreApprovedByReviewer)
                .with_note("ok"),
        )
        .await
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.entry.previous_state, Some(RequestState::Pending));
    assert_eq!(outcome.entry.new_state, RequestState::PreApprovedByReviewer);
    assert_eq!(outcome.entry.note.as_deref(), Some("ok"));

    // The admin role as a whole hears about the pre-approval, with no
    // settings row configured (fail-open default).
    for admin in ["anna", "aldo"] {
        let actor = Actor::admin(UserId::new(admin));
        eventually(|| async {
            service
                .notifications(&actor)
                .await
                .unwrap()
                .iter()
                .any(|n| n.event_key == EventKey::RequestPreApproved && n.request_id == request.id)
        })
        .await;
    }
}

#[tokio::test]
async fn rejection_notifies_owner_and_is_final() {
    let service = make_service();

    let request = service
        .create_request(
            &mario(),
            NewRequest::expense("Hotel", 12_000).with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();

    for (actor, target) in [
        (rita(), RequestState::PreApprovedByReviewer),
        (anna(), RequestState::ApprovedByAdmin),
        (anna(), RequestState::Rejected),
    ] {
        service
            .apply_transition(&actor, TransitionIntent::new(request.id.clone(), target))
            .await
            .unwrap();
    }

    eventually(|| async {
        service
            .notifications(&mario())
            .await
            .unwrap()
            .iter()
            .any(|n| n.event_key == EventKey::RequestRejected)
    })
    .await;

    // No way out of Rejected, for anybody.
    for target in [
        RequestState::Pending,
        RequestState::PreApprovedByReviewer,
        RequestState::ApprovedByAdmin,
        RequestState::Paid,
    ] {
        let err = service
            .apply_transition(&anna(), TransitionIntent::new(request.id.clone(), target))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Engine(EngineError::InvalidTransition { .. })
        ));
    }

    let detail = service.request_detail(&mario(), &request.id).await.unwrap();
    let walk: Vec<RequestState> = detail.history.iter().map(|e| e.new_state).collect();
    assert_eq!(
        walk,
        vec![
            RequestState::Pending,
            RequestState::PreApprovedByReviewer,
            RequestState::ApprovedByAdmin,
            RequestState::Rejected,
        ]
    );
}

#[tokio::test]
async fn disabled_settings_suppress_delivery() {
    let service = make_service();

    service
        .set_notification_setting(&anna(), EventKey::RequestRejected, Role::Collaborator, false, false)
        .unwrap();

    let request = service
        .create_request(
            &mario(),
            NewRequest::expense("Parking", 900).with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    service
        .apply_transition(
            &rita(),
            TransitionIntent::new(request.id.clone(), RequestState::Rejected),
        )
        .await
        .unwrap();

    // Give the detached dispatch a moment; nothing should arrive.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(service
        .notifications(&mario())
        .await
        .unwrap()
        .iter()
        .all(|n| n.event_key != EventKey::RequestRejected));

    // Toggling back on restores the fail-open behaviour for the next event.
    service
        .set_notification_setting(&anna(), EventKey::RequestRejected, Role::Collaborator, true, true)
        .unwrap();
    let rows = service.list_notification_settings(&anna()).unwrap();
    assert!(rows
        .iter()
        .any(|row| row.event_key == EventKey::RequestRejected && row.inapp_enabled));
}

#[tokio::test]
async fn settings_surface_is_admin_only() {
    let service = make_service();

    let err = service.list_notification_settings(&rita()).unwrap_err();
    assert!(matches!(err, ServiceError::Engine(EngineError::Forbidden(_))));

    let err = service
        .set_notification_setting(&mario(), EventKey::RequestPaid, Role::Collaborator, true, false)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Engine(EngineError::Forbidden(_))));
}

#[tokio::test]
async fn detail_is_visible_to_owner_scoped_reviewer_and_admin() {
    let service = make_service();

    let request = service
        .create_request(
            &mario(),
            NewRequest::expense("Train", 3200).with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    service
        .add_attachment(&mario(), &request.id, "ticket.pdf")
        .await
        .unwrap();
    service
        .add_attachment(&mario(), &request.id, "invoice.pdf")
        .await
        .unwrap();

    // Owner, scoped reviewer and admin all see it.
    for actor in [mario(), rita(), anna()] {
        let detail = service.request_detail(&actor, &request.id).await.unwrap();
        assert_eq!(detail.attachments.len(), 2);
        assert!(!detail.history.is_empty());
        for pair in detail.attachments.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
        for pair in detail.history.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    // Another collaborator and an out-of-scope reviewer do not.
    for actor in [piero(), ugo()] {
        let err = service.request_detail(&actor, &request.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Engine(EngineError::Forbidden(_))));
    }
}

#[tokio::test]
async fn list_requests_respects_visibility() {
    let service = make_service();

    service
        .create_request(
            &mario(),
            NewRequest::expense("Dev expense", 1000).with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    service
        .create_request(
            &piero(),
            NewRequest::expense("Ops expense", 2000).with_community(CommunityId::new("ops")),
        )
        .await
        .unwrap();

    assert_eq!(service.list_requests(&mario()).await.unwrap().len(), 1);
    assert_eq!(service.list_requests(&rita()).await.unwrap().len(), 1);
    assert_eq!(service.list_requests(&ugo()).await.unwrap().len(), 1);
    assert_eq!(service.list_requests(&anna()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn attachment_urls_are_signed_for_an_hour() {
    let service = make_service();

    let request = service
        .create_request(
            &mario(),
            NewRequest::expense("Train", 3200).with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    let attachment = service
        .add_attachment(&mario(), &request.id, "ticket.pdf")
        .await
        .unwrap();

    let urls = service
        .attachment_urls(&mario(), &request.id, &attachment.id)
        .await
        .unwrap();
    let original = urls.original_url.expect("signed url");
    assert!(original.contains("attachments/mario/"));
    assert!(original.ends_with("ttl=3600"));
    assert!(urls.signed_url.is_none());
}

#[tokio::test]
async fn notifications_are_owner_mutable_only() {
    let service = make_service();

    let request = service
        .create_request(
            &mario(),
            NewRequest::expense("Taxi", 4500).with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    service
        .apply_transition(
            &rita(),
            TransitionIntent::new(request.id.clone(), RequestState::Rejected),
        )
        .await
        .unwrap();

    eventually(|| async { !service.notifications(&mario()).await.unwrap().is_empty() }).await;
    let notification = service.notifications(&mario()).await.unwrap().remove(0);
    assert!(!notification.read);

    // Somebody else cannot touch it.
    let err = service
        .mark_notification_read(&anna(), &notification.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Notify(_)));

    // The owner can read and dismiss.
    let updated = service
        .mark_notification_read(&mario(), &notification.id)
        .await
        .unwrap();
    assert!(updated.read);
    service
        .dismiss_notification(&mario(), &notification.id)
        .await
        .unwrap();
    assert!(service.notifications(&mario()).await.unwrap().is_empty());
}

#[tokio::test]
async fn compensation_full_walk_to_payment() {
    let service = make_service();

    let request = service
        .create_request(
            &mario(),
            NewRequest::compensation("March tutoring hours")
                .with_amount_cents(120_00)
                .with_community(CommunityId::new("dev")),
        )
        .await
        .unwrap();
    assert_eq!(request.state, RequestState::Draft);

    for (actor, target) in [
        (mario(), RequestState::Submitted),
        (rita(), RequestState::PreApprovedByReviewer),
        (anna(), RequestState::ApprovedByAdmin),
        (anna(), RequestState::Paid),
    ] {
        service
            .apply_transition(&actor, TransitionIntent::new(request.id.clone(), target))
            .await
            .unwrap();
    }

    let history = service.history(&mario(), &request.id).await.unwrap();
    let walk: Vec<RequestState> = history.iter().map(|e| e.new_state).collect();
    assert_eq!(
        walk,
        vec![
            RequestState::Draft,
            RequestState::Submitted,
            RequestState::PreApprovedByReviewer,
            RequestState::ApprovedByAdmin,
            RequestState::Paid,
        ]
    );

    // Payment reaches the owner.
    eventually(|| async {
        service
            .notifications(&mario())
            .await
            .unwrap()
            .iter()
            .any(|n| n.event_key == EventKey::RequestPaid)
    })
    .await;

    let stats = service.statistics(&anna()).await.unwrap();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.by_state.get("PAID"), Some(&1));
    assert_eq!(stats.by_kind.get("COMPENSATION"), Some(&1));
}

#[tokio::test]
async fn statistics_are_admin_only() {
    let service = make_service();
    let err = service.statistics(&rita()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Engine(EngineError::Forbidden(_))));
}
