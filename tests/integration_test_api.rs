mod common;

use axum::http::{header, StatusCode};
use chrono::Duration;
use common::{parse_body, test_now, TestApp};
use serde_json::{json, Value};

async fn create_event(app: &TestApp, title: &str, max_attendees: u32) -> String {
    let (status, body) = app
        .json(
            "POST",
            "/api/v1/events",
            Some(json!({
                "title": title,
                "description": "Annual technology conference",
                "category": "Technology",
                "start_time": (test_now() + Duration::days(24)).to_rfc3339(),
                "end_time": (test_now() + Duration::days(24) + Duration::hours(8)).to_rfc3339(),
                "location": "San Francisco Convention Center",
                "max_attendees": max_attendees
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create event failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn create_category(app: &TestApp, event_id: &str, name: &str, ticket_type: &str, price: i64, quantity: u32) -> String {
    let (status, body) = app
        .json(
            "POST",
            &format!("/api/v1/events/{}/categories", event_id),
            Some(json!({ "name": name, "ticket_type": ticket_type, "price": price, "quantity": quantity })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create category failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn buy(app: &TestApp, event_id: &str, payload: Value) -> (StatusCode, Value) {
    app.json("POST", &format!("/api/v1/events/{}/purchases", event_id), Some(payload)).await
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.json("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_event_lifecycle_over_http() {
    let app = TestApp::new().await;
    let event_id = create_event(&app, "Tech Conference 2024", 500).await;

    let (status, body) = app.json("GET", &format!("/api/v1/events/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UPCOMING");
    assert_eq!(body["virtual_mode"], "NONE");
    assert_eq!(body["tickets_sold"], 0);

    let (status, body) = app
        .json("PUT", &format!("/api/v1/events/{}", event_id), Some(json!({ "title": "Tech Conference 2025" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Tech Conference 2025");
    assert_eq!(body["max_attendees"], 500);

    let (status, body) = app
        .json("PUT", &format!("/api/v1/events/{}", event_id), Some(json!({ "max_attendees": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["max_attendees"].is_null());

    let (status, body) = app.json("GET", "/api/v1/events?search=conference&status=upcoming", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app.json("GET", "/api/v1/events?status=live", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app.json("GET", "/api/v1/events/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_validation_errors() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/v1/events",
            Some(json!({
                "title": "Virtual Marketing Summit",
                "category": "Marketing",
                "start_time": test_now().to_rfc3339(),
                "end_time": (test_now() + Duration::hours(6)).to_rfc3339(),
                "virtual_mode": "live",
                "virtual_url": "ftp://example.com"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "virtual_url");

    let (status, _) = app.json("GET", "/api/v1/events?status=cancelled", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_purchase_flow_and_errors() {
    let app = TestApp::new().await;
    let event_id = create_event(&app, "Tech Conference 2024", 500).await;
    let category_id = create_category(&app, &event_id, "Early Bird", "NORMAL", 99, 2).await;

    let (status, body) = buy(&app, &event_id, json!({
        "ticket_category_id": category_id,
        "buyer_name": "John Doe",
        "buyer_email": "john@example.com",
        "quantity": 1,
        "payment_status": "PAID",
        "seat_numbers": ["A-12"]
    })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["purchase"]["total_amount"], 99);
    assert_eq!(body["purchase"]["payment_status"], "PAID");
    assert_eq!(body["ticket_category"]["sold_quantity"], 1);
    assert_eq!(body["ticket_category"]["available"], 1);

    let (status, body) = buy(&app, &event_id, json!({
        "ticket_category_id": category_id,
        "buyer_name": "Jane Smith",
        "buyer_email": "jane@example.com",
        "quantity": 2
    })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["requested"], 2);
    assert_eq!(body["available"], 1);

    let (status, body) = buy(&app, &event_id, json!({
        "ticket_category_id": category_id,
        "buyer_name": "",
        "buyer_email": "jane@example.com",
        "quantity": 1
    })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "buyer_name");

    let (status, _) = buy(&app, &event_id, json!({
        "ticket_category_id": "missing",
        "buyer_name": "Jane Smith",
        "buyer_email": "jane@example.com",
        "quantity": 1
    })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refund_and_status_endpoints() {
    let app = TestApp::new().await;
    let event_id = create_event(&app, "Tech Conference 2024", 500).await;
    let category_id = create_category(&app, &event_id, "Early Bird", "NORMAL", 99, 10).await;

    let (_, body) = buy(&app, &event_id, json!({
        "ticket_category_id": category_id,
        "buyer_name": "Bob Johnson",
        "buyer_email": "bob@example.com",
        "quantity": 1
    })).await;
    let purchase_id = body["purchase"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["purchase"]["payment_status"], "PENDING");

    let (status, _) = app.json("POST", &format!("/api/v1/purchases/{}/refund", purchase_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .json("PUT", &format!("/api/v1/purchases/{}/status", purchase_id), Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "PAID");

    let (status, body) = app.json("POST", &format!("/api/v1/purchases/{}/refund", purchase_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "REFUNDED");

    let (status, body) = app.json("GET", &format!("/api/v1/events/{}/categories", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["sold_quantity"], 1);

    let (status, _) = app.json("POST", "/api/v1/purchases/unknown/refund", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_buyer_filters_and_recent() {
    let app = TestApp::new().await;
    let event_id = create_event(&app, "Tech Conference 2024", 500).await;
    let normal = create_category(&app, &event_id, "Early Bird", "NORMAL", 99, 100).await;
    let vip = create_category(&app, &event_id, "VIP Pass", "VIP", 299, 50).await;

    for (i, (name, category, status)) in [
        ("John Doe", &normal, "PAID"),
        ("Jane Smith", &vip, "PAID"),
        ("Bob Johnson", &normal, "PENDING"),
    ].into_iter().enumerate() {
        app.clock.set(test_now() + Duration::minutes(i as i64));
        let email = format!("{}@example.com", name.split(' ').next().unwrap().to_lowercase());
        let (status_code, _) = buy(&app, &event_id, json!({
            "ticket_category_id": category,
            "buyer_name": name,
            "buyer_email": email,
            "quantity": 1,
            "payment_status": status
        })).await;
        assert_eq!(status_code, StatusCode::CREATED);
    }

    let uri = format!("/api/v1/events/{}/purchases?search=JOHN&ticket_type=all&payment_status=all", event_id);
    let (_, body) = app.json("GET", &uri, None).await;
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|b| b["buyer_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["John Doe", "Bob Johnson"]);

    let uri = format!("/api/v1/events/{}/purchases?ticket_type=vip", event_id);
    let (_, body) = app.json("GET", &uri, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["ticket_category"], "VIP Pass");
    assert_eq!(body[0]["ticket_type"], "VIP");

    let uri = format!("/api/v1/events/{}/purchases?payment_status=bogus", event_id);
    let (status, _) = app.json("GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/events/{}/attendees/recent?limit=2", event_id);
    let (_, body) = app.json("GET", &uri, None).await;
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|b| b["buyer_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Bob Johnson", "Jane Smith"]);
}

#[tokio::test]
async fn test_csv_export() {
    let app = TestApp::new().await;
    let event_id = create_event(&app, "Tech Conference 2024", 500).await;
    let category_id = create_category(&app, &event_id, "Early Bird", "NORMAL", 99, 100).await;

    buy(&app, &event_id, json!({
        "ticket_category_id": category_id,
        "buyer_name": "John Doe",
        "buyer_email": "john@example.com",
        "quantity": 1,
        "payment_status": "PAID"
    })).await;

    let response = app.send("GET", &format!("/api/v1/events/{}/purchases/export", event_id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap(),
        "attachment; filename=\"Tech_Conference_2024_buyers.csv\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(
        csv,
        "Name,Email,Phone,Ticket Type,Category,Quantity,Amount,Purchase Date,Status\n\
         John Doe,john@example.com,,NORMAL,Early Bird,1,99,2024-02-20,paid"
    );
}

#[tokio::test]
async fn test_metrics_and_analytics_endpoints() {
    let app = TestApp::new().await;
    let event_id = create_event(&app, "Tech Conference 2024", 500).await;
    let category_id = create_category(&app, &event_id, "Early Bird", "NORMAL", 99, 100).await;

    buy(&app, &event_id, json!({
        "ticket_category_id": category_id,
        "buyer_name": "John Doe",
        "buyer_email": "john@example.com",
        "quantity": 4,
        "payment_status": "PAID"
    })).await;

    let (status, body) = app.json("GET", &format!("/api/v1/events/{}/metrics", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory"]["total_sold"], 4);
    assert_eq!(body["inventory"]["total_revenue"], 396);
    assert_eq!(body["capacity_remaining"], 496);
    assert_eq!(body["revenue_by_type"]["NORMAL"]["count"], 4);
    assert_eq!(body["event"]["status"], "UPCOMING");

    let (status, body) = app.json("GET", "/api/v1/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_events"], 1);
    assert_eq!(body["stats"]["total_attendees"], 4);
    assert!(body.get("event").is_none());

    let (status, body) = app.json("GET", "/api/v1/analytics?range=7d", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "7d");
    assert_eq!(body["comparison"]["revenue"], 396);
    assert_eq!(body["time_series"][0]["period"], "2024-02-20");

    let (status, _) = app.json("GET", "/api/v1/analytics?range=1y", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_streaming_endpoint() {
    let app = TestApp::new().await;
    let in_person = create_event(&app, "Tech Conference 2024", 500).await;

    let (status, body) = app.json("GET", &format!("/api/v1/events/{}/streaming", in_person), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "virtual_mode");

    let (status, body) = app
        .json(
            "POST",
            "/api/v1/events",
            Some(json!({
                "title": "Virtual Marketing Summit",
                "category": "Marketing",
                "start_time": test_now().to_rfc3339(),
                "end_time": (test_now() + Duration::hours(6)).to_rfc3339(),
                "virtual_mode": "LIVE",
                "virtual_url": "TBD"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "LIVE");
    let virtual_id = body["id"].as_str().unwrap().to_string();

    let response = app.send("GET", &format!("/api/v1/events/{}/streaming", virtual_id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["stream_url"], format!("https://stream.eventpro.com/watch/{}", virtual_id));
    assert_eq!(body["vr_enabled"], false);
    let key = body["stream_key"].as_str().unwrap().to_string();
    assert!(key.starts_with(&format!("sk_{}_", virtual_id)));

    // Reloading the settings page shows the key the organizer already copied.
    let (_, again) = app.json("GET", &format!("/api/v1/events/{}/streaming", virtual_id), None).await;
    assert_eq!(again["stream_key"], key.as_str());

    let (_, event) = app.json("GET", &format!("/api/v1/events/{}", virtual_id), None).await;
    assert!(event.get("stream_key").is_none());
}
