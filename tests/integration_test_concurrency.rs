mod common;

use common::{category_params, in_person_event, memory_service, purchase_params, seed_event_with_category, TestApp};
use eventpro_backend::{
    domain::models::event::EventPatch,
    domain::models::purchase::PaymentStatus,
    domain::models::ticket_category::{TicketCategoryPatch, TicketType},
    domain::ports::TicketCategoryRepository,
    domain::services::dashboard::DashboardService,
    infra::repositories::sqlite_ticket_category_repo::SqliteTicketCategoryRepo,
    domain::services::query::BuyerFilter,
    error::AppError,
};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Fires `buyers` concurrent single-ticket purchases and returns (successes, capacity rejections).
async fn rush(service: Arc<DashboardService>, event_id: &str, category_id: &str, buyers: usize) -> (usize, usize) {
    let mut set = JoinSet::new();
    for i in 0..buyers {
        let service = service.clone();
        let event_id = event_id.to_string();
        let params = purchase_params(category_id, &format!("Buyer {}", i), 1, Some(PaymentStatus::Paid));
        set.spawn(async move { service.record_purchase(&event_id, params).await });
    }

    let mut sold = 0;
    let mut rejected = 0;
    while let Some(res) = set.join_next().await {
        match res.expect("task panicked") {
            Ok(_) => sold += 1,
            Err(AppError::CapacityExceeded { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    (sold, rejected)
}

async fn last_seat_race(service: Arc<DashboardService>) {
    let (event, category) = seed_event_with_category(&service, 10, 99).await;
    service
        .record_purchase(&event.id, purchase_params(&category.id, "Early Crowd", 9, Some(PaymentStatus::Paid)))
        .await
        .unwrap();

    let (sold, rejected) = rush(service.clone(), &event.id, &category.id, 2).await;
    assert_eq!(sold, 1);
    assert_eq!(rejected, 1);

    let categories = service.list_categories(&event.id).await.unwrap();
    assert_eq!(categories[0].sold_quantity, 10);
}

async fn crowd_never_oversells(service: Arc<DashboardService>) {
    let (event, category) = seed_event_with_category(&service, 20, 49).await;

    let (sold, rejected) = rush(service.clone(), &event.id, &category.id, 50).await;
    assert_eq!(sold, 20);
    assert_eq!(rejected, 30);

    let categories = service.list_categories(&event.id).await.unwrap();
    assert_eq!(categories[0].sold_quantity, 20);

    let buyers = service.list_purchases(&event.id, &BuyerFilter::default()).await.unwrap();
    let tickets: u32 = buyers.iter().map(|b| b.purchase.quantity).sum();
    assert_eq!(tickets, categories[0].sold_quantity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_race_in_memory() {
    let (service, _clock) = memory_service();
    last_seat_race(Arc::new(service)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crowd_never_oversells_in_memory() {
    let (service, _clock) = memory_service();
    crowd_never_oversells(Arc::new(service)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_race_sqlite() {
    let app = TestApp::new().await;
    last_seat_race(app.state.dashboard.clone()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crowd_never_oversells_sqlite() {
    let app = TestApp::new().await;
    crowd_never_oversells(app.state.dashboard.clone()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_record_sale_is_conditional() {
    let app = TestApp::new().await;
    let (_, category) = seed_event_with_category(&app.state.dashboard, 10, 99).await;
    let repo = Arc::new(SqliteTicketCategoryRepo::new(app.pool.clone()));

    let after = repo.record_sale(&category.id, 9).await.unwrap();
    assert_eq!(after.sold_quantity, 9);

    let mut set = JoinSet::new();
    for _ in 0..2 {
        let repo = repo.clone();
        let id = category.id.clone();
        set.spawn(async move { repo.record_sale(&id, 1).await });
    }
    let mut outcomes = Vec::new();
    while let Some(res) = set.join_next().await {
        outcomes.push(res.expect("task panicked"));
    }
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(r, Err(AppError::CapacityExceeded { available: 0, .. }))));

    let err = repo.record_sale(&category.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "quantity", .. }));

    let err = repo.record_sale("missing", 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// Four organizers each try to add a 60-seat category to a 100-seat event at once.
async fn concurrent_allocation_stays_within_ceiling(service: Arc<DashboardService>) {
    for round in 0..5 {
        let event = service
            .create_event(in_person_event(&format!("Allocation Race {}", round), Some(100)))
            .await
            .unwrap();

        let mut set = JoinSet::new();
        for i in 0..4 {
            let service = service.clone();
            let event_id = event.id.clone();
            set.spawn(async move {
                service
                    .create_ticket_category(&event_id, category_params(&format!("Block {}", i), TicketType::Normal, 50, 60))
                    .await
            });
        }

        let mut created = 0;
        while let Some(res) = set.join_next().await {
            match res.expect("task panicked") {
                Ok(_) => created += 1,
                Err(AppError::Validation { field: "quantity", .. }) => {}
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(created, 1);

        let allocated: u32 = service.list_categories(&event.id).await.unwrap().iter().map(|c| c.quantity).sum();
        assert_eq!(allocated, 60);
    }
}

/// Growing one category while the ceiling is lowered can never leave the event over-allocated.
async fn resize_and_ceiling_race(service: Arc<DashboardService>) {
    for round in 0..5 {
        let event = service
            .create_event(in_person_event(&format!("Resize Race {}", round), Some(100)))
            .await
            .unwrap();
        let category = service
            .create_ticket_category(&event.id, category_params("General", TicketType::Normal, 50, 40))
            .await
            .unwrap();

        let mut set = JoinSet::new();
        {
            let service = service.clone();
            let id = category.id.clone();
            set.spawn(async move {
                service
                    .update_ticket_category(&id, TicketCategoryPatch { quantity: Some(90), ..Default::default() })
                    .await
                    .map(|_| ())
            });
        }
        {
            let service = service.clone();
            let id = event.id.clone();
            set.spawn(async move {
                service
                    .update_event(&id, EventPatch { max_attendees: Some(Some(50)), ..Default::default() })
                    .await
                    .map(|_| ())
            });
        }
        let mut succeeded = 0;
        while let Some(res) = set.join_next().await {
            match res.expect("task panicked") {
                Ok(()) => succeeded += 1,
                Err(AppError::Validation { .. }) => {}
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(succeeded, 1);

        let summary = service.get_event(&event.id).await.unwrap();
        let ceiling = u64::from(summary.event.max_attendees.unwrap());
        assert!(summary.total_tickets <= ceiling, "{} allocated against {}", summary.total_tickets, ceiling);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_category_creation_in_memory() {
    let (service, _clock) = memory_service();
    concurrent_allocation_stays_within_ceiling(Arc::new(service)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_category_creation_sqlite() {
    let app = TestApp::new().await;
    concurrent_allocation_stays_within_ceiling(app.state.dashboard.clone()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resize_against_lowered_ceiling_in_memory() {
    let (service, _clock) = memory_service();
    resize_and_ceiling_race(Arc::new(service)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resize_against_lowered_ceiling_sqlite() {
    let app = TestApp::new().await;
    resize_and_ceiling_race(app.state.dashboard.clone()).await;
}
