use road_watch::{
    AppError, InMemoryRepository,
    auth::AuthUser,
    geo::haversine_km,
    models::{Category, CreateMarkerRequest, Marker},
    repository::Repository,
    service::MarkerService,
};
use std::sync::Arc;

struct World {
    repo: Arc<InMemoryRepository>,
    owner: AuthUser,
    admin: AuthUser,
    other: AuthUser,
}

// Users 1 (reporter), 2 (admin) and 3 (bystander), in that order.
async fn world() -> World {
    let repo = Arc::new(InMemoryRepository::new());
    let owner = repo.create_user("user-one", "hash", false).await.unwrap();
    let admin = repo.create_user("user-two", "hash", true).await.unwrap();
    let other = repo.create_user("user-three", "hash", false).await.unwrap();
    assert_eq!((owner.id, admin.id, other.id), (1, 2, 3));

    World {
        repo,
        owner: AuthUser::from(&owner),
        admin: AuthUser::from(&admin),
        other: AuthUser::from(&other),
    }
}

fn report(lat: f64, lng: f64, category: &str) -> CreateMarkerRequest {
    CreateMarkerRequest {
        lat,
        lng,
        category: category.to_string(),
        description: None,
    }
}

impl World {
    fn service(&self) -> MarkerService<'_> {
        MarkerService::new(self.repo.as_ref())
    }

    async fn approved_at(&self, lat: f64, lng: f64) -> Marker {
        let marker = self
            .service()
            .create_marker(Some(&self.owner), report(lat, lng, "snow"))
            .await
            .unwrap();
        self.service()
            .approve_marker(Some(&self.admin), marker.id)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_full_moderation_scenario() {
    let w = world().await;
    let service = w.service();

    let marker = service
        .create_marker(Some(&w.owner), report(50.0, 14.0, "ice"))
        .await
        .unwrap();
    assert_eq!(marker.category, Category::Ice);
    assert!(!marker.approved);
    assert!(service.list_public_markers().await.unwrap().is_empty());

    let pending = service.list_pending_markers(Some(&w.admin)).await.unwrap();
    assert_eq!(pending, vec![marker.clone()]);

    let approved = service.approve_marker(Some(&w.admin), marker.id).await.unwrap();
    assert!(approved.approved);
    assert_eq!(service.list_public_markers().await.unwrap().len(), 1);

    let denied = service.delete_marker(Some(&w.other), marker.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    assert_eq!(service.list_public_markers().await.unwrap().len(), 1);

    service.delete_marker(Some(&w.owner), marker.id).await.unwrap();
    assert!(service.list_public_markers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_anonymous_caller_is_unauthorized_not_forbidden() {
    let w = world().await;
    let service = w.service();
    let marker = service
        .create_marker(Some(&w.owner), report(50.0, 14.0, "bad"))
        .await
        .unwrap();

    assert!(matches!(
        service.create_marker(None, report(50.0, 14.0, "bad")).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        service.list_pending_markers(None).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        service.approve_marker(None, marker.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        service.reject_marker(None, marker.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        service.delete_marker(None, marker.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        service.list_markers_by_owner(None, w.owner.id).await,
        Err(AppError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_non_admin_cannot_moderate() {
    let w = world().await;
    let service = w.service();
    let marker = service
        .create_marker(Some(&w.owner), report(50.0, 14.0, "bad"))
        .await
        .unwrap();

    // Owning the marker does not help.
    assert!(matches!(
        service.approve_marker(Some(&w.owner), marker.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        service.reject_marker(Some(&w.owner), marker.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(!w.repo.get_marker(marker.id).await.unwrap().approved);
}

#[tokio::test]
async fn test_approve_is_idempotent() {
    let w = world().await;
    let first = w.approved_at(50.0, 14.0).await;

    let second = w
        .service()
        .approve_marker(Some(&w.admin), first.id)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_marker_is_not_found() {
    let w = world().await;
    let service = w.service();

    assert!(matches!(
        service.approve_marker(Some(&w.admin), 404).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.reject_marker(Some(&w.admin), 404).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.delete_marker(Some(&w.owner), 404).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_reject_removes_pending_and_conflicts_on_approved() {
    let w = world().await;
    let service = w.service();

    let pending = service
        .create_marker(Some(&w.owner), report(50.0, 14.0, "medium"))
        .await
        .unwrap();
    service.reject_marker(Some(&w.admin), pending.id).await.unwrap();
    assert!(service.list_pending_markers(Some(&w.admin)).await.unwrap().is_empty());

    let approved = w.approved_at(50.0, 14.0).await;
    assert!(matches!(
        service.reject_marker(Some(&w.admin), approved.id).await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(service.list_public_markers().await.unwrap(), vec![approved]);
}

#[tokio::test]
async fn test_admin_may_delete_any_marker() {
    let w = world().await;
    let approved = w.approved_at(50.0, 14.0).await;

    w.service()
        .delete_marker(Some(&w.admin), approved.id)
        .await
        .unwrap();

    assert!(w.service().list_public_markers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owner_listing_is_newest_first_and_private() {
    let w = world().await;
    let service = w.service();

    let first = service
        .create_marker(Some(&w.owner), report(50.0, 14.0, "good"))
        .await
        .unwrap();
    let second = service
        .create_marker(Some(&w.owner), report(50.0, 14.0, "closed"))
        .await
        .unwrap();
    service
        .create_marker(Some(&w.other), report(50.0, 14.0, "ice"))
        .await
        .unwrap();

    let mine = service
        .list_markers_by_owner(Some(&w.owner), w.owner.id)
        .await
        .unwrap();
    let ids: Vec<_> = mine.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    assert!(matches!(
        service.list_markers_by_owner(Some(&w.other), w.owner.id).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_invalid_reports_are_validation_errors() {
    let w = world().await;
    let service = w.service();

    for bad in [
        report(50.0, 14.0, "flood"),
        report(91.0, 14.0, "ice"),
        report(50.0, 181.0, "ice"),
    ] {
        assert!(matches!(
            service.create_marker(Some(&w.owner), bad).await,
            Err(AppError::Validation(_))
        ));
    }
    assert!(service.list_pending_markers(Some(&w.admin)).await.unwrap().is_empty());
}

// --- Nearby ---

#[tokio::test]
async fn test_query_near_keeps_only_markers_inside_radius() {
    let w = world().await;
    let near = w.approved_at(50.085, 14.0).await;
    w.approved_at(50.2, 14.0).await;

    let found = w.service().query_near(50.0, 14.0, 10.0).await.unwrap();

    assert_eq!(found, vec![near]);
}

#[tokio::test]
async fn test_query_near_ignores_pending_markers() {
    let w = world().await;
    w.service()
        .create_marker(Some(&w.owner), report(50.0, 14.0, "ice"))
        .await
        .unwrap();

    let found = w.service().query_near(50.0, 14.0, 10.0).await.unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_query_near_high_latitude_east_west() {
    let w = world().await;
    // ~9.3 km due east of the center at 60°N: 0.168° of longitude, outside a
    // naive radius/111 box but well inside the radius.
    let east = w.approved_at(60.0, 25.168).await;

    let found = w.service().query_near(60.0, 25.0, 10.0).await.unwrap();

    assert_eq!(found, vec![east]);
}

#[tokio::test]
async fn test_query_near_across_antimeridian() {
    let w = world().await;
    let west = w.approved_at(-16.5, -179.95).await;
    w.approved_at(-16.5, 170.0).await;

    let found = w.service().query_near(-16.5, 179.95, 20.0).await.unwrap();

    assert_eq!(found, vec![west]);
}

#[tokio::test]
async fn test_query_near_includes_marker_exactly_on_the_radius() {
    let w = world().await;

    for (center, position) in [
        ((50.0, 14.0), (50.09, 14.0)),
        ((50.0, 14.0), (50.1, 14.2)),
        ((-16.5, 179.99), (-16.5, -179.95)),
    ] {
        let marker = w.approved_at(position.0, position.1).await;
        let radius = haversine_km(center.0, center.1, marker.lat, marker.lng);

        let found = w.service().query_near(center.0, center.1, radius).await.unwrap();

        assert!(
            found.iter().any(|m| m.id == marker.id),
            "marker at {position:?} should be found at radius {radius}"
        );
    }
}

#[tokio::test]
async fn test_query_near_excludes_marker_just_past_10_km() {
    let w = world().await;
    // 0.09° of latitude is 10.0075 km at R = 6371 km: just outside a 10 km search.
    w.approved_at(50.09, 14.0).await;

    let found = w.service().query_near(50.0, 14.0, 10.0).await.unwrap();

    assert!(found.is_empty());
    assert!(haversine_km(50.0, 14.0, 50.09, 14.0) > 10.0);
}

#[tokio::test]
async fn test_query_near_validation() {
    let w = world().await;
    let service = w.service();

    for (lat, lng, radius) in [
        (91.0, 0.0, 10.0),
        (0.0, -181.0, 10.0),
        (0.0, 0.0, 0.0),
        (0.0, 0.0, -1.0),
    ] {
        assert!(matches!(
            service.query_near(lat, lng, radius).await,
            Err(AppError::Validation(_))
        ));
    }
}

// --- Concurrency ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approve_and_delete_settle_consistently() {
    let w = world().await;
    let marker = w
        .service()
        .create_marker(Some(&w.owner), report(50.0, 14.0, "ice"))
        .await
        .unwrap();

    let approve = {
        let repo = w.repo.clone();
        let admin = w.admin;
        tokio::spawn(async move {
            MarkerService::new(repo.as_ref())
                .approve_marker(Some(&admin), marker.id)
                .await
        })
    };
    let delete = {
        let repo = w.repo.clone();
        let owner = w.owner;
        tokio::spawn(async move {
            MarkerService::new(repo.as_ref())
                .delete_marker(Some(&owner), marker.id)
                .await
        })
    };

    let approve = approve.await.unwrap();
    let delete = delete.await.unwrap();

    // The delete always wins eventually: it is valid from both states.
    assert!(delete.is_ok());
    assert!(matches!(approve, Ok(_) | Err(AppError::NotFound(_))));
    assert!(w.repo.list_approved().await.unwrap().is_empty());
    assert!(w.repo.list_pending().await.unwrap().is_empty());
}
