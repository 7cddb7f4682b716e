use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use ridehail::api::rest::router;
use ridehail::config::Config;
use ridehail::geo::GeoPoint;
use ridehail::models::customer::Customer;
use ridehail::models::driver::{Driver, DriverStatus};
use ridehail::models::fees::{CommissionRateType, FeeConfig};
use ridehail::presence::LocationUpdate;
use ridehail::realtime::Event;
use ridehail::state::AppState;
use ridehail::store::memory::MemoryStore;
use ridehail::store::Store;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const ORIGIN_LAT: f64 = 16.80;
const ORIGIN_LNG: f64 = 96.15;

fn customer_id() -> Uuid {
    Uuid::from_u128(0xC1)
}

fn driver_id() -> Uuid {
    Uuid::from_u128(0xD1)
}

fn second_driver_id() -> Uuid {
    Uuid::from_u128(0xD2)
}

fn admin_id() -> Uuid {
    Uuid::from_u128(0xA1)
}

fn setup() -> (axum::Router, Arc<AppState>) {
    let auth_tokens = format!(
        "cust-token:customer:{},drv-token:driver:{},drv2-token:driver:{},admin-token:admin:{}:super",
        customer_id(),
        driver_id(),
        second_driver_id(),
        admin_id()
    );
    let config = Config {
        http_port: 0,
        log_level: "info".to_string(),
        event_buffer_size: 1024,
        dispatch_radius_km: 3.0,
        allowed_origins: "*".to_string(),
        auth_tokens,
    };

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store).unwrap());
    (router(state.clone()), state)
}

async fn seed_customer(state: &Arc<AppState>) {
    state
        .store
        .create_customer(Customer {
            id: customer_id(),
            name: "Thiri".to_string(),
            phone: "95900000000".to_string(),
            fcm_token: None,
            disabled: false,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

async fn seed_driver(state: &Arc<AppState>, id: Uuid, code: &str, phone: &str) {
    state
        .store
        .create_driver(Driver {
            id,
            code: code.to_string(),
            name: "Aung".to_string(),
            phone: phone.to_string(),
            vehicle_number: "9K-1234".to_string(),
            vehicle_model: None,
            driving_license_number: None,
            address: None,
            status: DriverStatus::Active,
            is_online: true,
            disabled: false,
            verified: false,
            balance: 50_000,
            fcm_token: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

async fn seed_fee_config(state: &Arc<AppState>) {
    state
        .store
        .upsert_fee_config(
            FeeConfig {
                id: Uuid::new_v4(),
                initial_fee: 3_000,
                distance_fee_per_km: 1_000,
                waiting_fee_per_minute: 200,
                free_waiting_minute: 10,
                commission_rate: 100.0,
                commission_rate_type: CommissionRateType::Fixed,
                platform_fee: 0,
                insurance_fee: 0,
            },
            vec![],
        )
        .await
        .unwrap();
}

fn report_location(state: &Arc<AppState>, id: Uuid, km_north: f64) {
    state
        .presence
        .report(
            LocationUpdate {
                driver_id: id,
                location: GeoPoint {
                    lat: ORIGIN_LAT + km_north / 111.32,
                    lng: ORIGIN_LNG,
                },
                status: DriverStatus::Active,
                is_online: true,
            },
            Uuid::new_v4(),
        )
        .unwrap();
}

fn auth_json(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn auth_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn booking_body() -> Value {
    json!({
        "start": { "lat": ORIGIN_LAT, "lng": ORIGIN_LNG },
        "end": { "lat": ORIGIN_LAT + 0.05, "lng": ORIGIN_LNG + 0.03 }
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["drivers_online"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("drivers_online"));
    assert!(body.contains("ws_connections"));
}

#[tokio::test]
async fn create_booking_returns_pending() {
    let (app, state) = setup();
    seed_customer(&state).await;

    let response = app
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    assert!(body["driver_id"].is_null());
    assert_eq!(body["code"].as_str().unwrap().len(), 10);
}

#[tokio::test]
async fn create_booking_requires_customer_token() {
    let (app, state) = setup();
    seed_customer(&state).await;

    let missing = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("content-type", "application/json")
        .body(Body::from(booking_body().to_string()))
        .unwrap();
    let response = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong_role = app
        .clone()
        .oneshot(auth_json("POST", "/bookings", "drv-token", booking_body()))
        .await
        .unwrap();
    assert_eq!(wrong_role.status(), StatusCode::FORBIDDEN);

    let bad_token = app
        .oneshot(auth_json("POST", "/bookings", "nonsense", booking_body()))
        .await
        .unwrap();
    assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_booking_rejects_bad_coordinates() {
    let (app, state) = setup();
    seed_customer(&state).await;

    let response = app
        .oneshot(auth_json(
            "POST",
            "/bookings",
            "cust-token",
            json!({
                "start": { "lat": 95.0, "lng": 96.15 },
                "end": { "lat": 16.85, "lng": 96.18 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn second_active_booking_conflicts() {
    let (app, state) = setup();
    seed_customer(&state).await;

    let first = app
        .clone()
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn search_driver_connects_the_nearest() {
    let (app, state) = setup();
    seed_customer(&state).await;
    seed_driver(&state, driver_id(), "7B001", "959111111").await;
    seed_driver(&state, second_driver_id(), "7B002", "959222222").await;
    report_location(&state, driver_id(), 2.5);
    report_location(&state, second_driver_id(), 1.0);

    let res = app
        .clone()
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();
    let booking = body_json(res).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/search-driver",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["driver_id"], second_driver_id().to_string());
    assert!(body["distance_km"].as_f64().unwrap() < 1.1);

    let winner = state
        .store
        .get_driver(second_driver_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(winner.status, DriverStatus::Busy);

    let stored = state
        .store
        .get_booking(booking_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.driver_id, Some(second_driver_id()));
}

#[tokio::test]
async fn search_driver_with_nobody_around_reports_no_match() {
    let (app, state) = setup();
    seed_customer(&state).await;
    seed_driver(&state, driver_id(), "7B001", "959111111").await;
    report_location(&state, driver_id(), 5.0);

    app.clone()
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();

    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/search-driver",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["success"], false);
    assert!(body.get("driver_id").is_none());
}

#[tokio::test]
async fn search_driver_rechecks_the_durable_row() {
    let (app, state) = setup();
    seed_customer(&state).await;
    seed_driver(&state, driver_id(), "7B001", "959111111").await;
    report_location(&state, driver_id(), 1.0);

    // presence says online, the stored row says otherwise
    let res = app
        .clone()
        .oneshot(auth_json(
            "PUT",
            "/drivers/me/online",
            "drv-token",
            json!({ "is_online": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    app.clone()
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();

    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/search-driver",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["success"], false);

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.status, DriverStatus::Active);
}

#[tokio::test]
async fn search_driver_without_pending_booking_is_404() {
    let (app, state) = setup();
    seed_customer(&state).await;

    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/search-driver",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

async fn connect_booking(app: &axum::Router, state: &Arc<AppState>) -> String {
    seed_customer(state).await;
    seed_driver(state, driver_id(), "7B001", "959111111").await;
    report_location(state, driver_id(), 1.0);

    let res = app
        .clone()
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();
    let booking = body_json(res).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/bookings/search-driver",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["success"], true);

    booking_id
}

#[tokio::test]
async fn accept_then_pickup_moves_the_booking_forward() {
    let (app, state) = setup();
    let _booking_id = connect_booking(&app, &state).await;

    let res = app
        .clone()
        .oneshot(auth_json("POST", "/bookings/accept", "drv-token", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "accepted");

    let res = app
        .oneshot(auth_json("POST", "/bookings/pickup", "drv-token", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "on_trip");
}

#[tokio::test]
async fn accept_without_connected_booking_is_404() {
    let (app, state) = setup();
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .oneshot(auth_json("POST", "/bookings/accept", "drv-token", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn another_driver_cannot_touch_the_booking() {
    let (app, state) = setup();
    let _booking_id = connect_booking(&app, &state).await;
    seed_driver(&state, second_driver_id(), "7B002", "959222222").await;

    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/accept",
            "drv2-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reject_returns_the_booking_to_the_pool() {
    let (app, state) = setup();
    let booking_id = connect_booking(&app, &state).await;

    let res = app
        .clone()
        .oneshot(auth_json("POST", "/bookings/reject", "drv-token", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "pending");
    assert!(body["driver_id"].is_null());

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.status, DriverStatus::Active);

    // the booking is searchable again
    report_location(&state, driver_id(), 1.0);
    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/search-driver",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["success"], true);

    let stored = state
        .store
        .get_booking(booking_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.driver_id, Some(driver_id()));
}

#[tokio::test]
async fn cancel_frees_the_connected_driver() {
    let (app, state) = setup();
    let _booking_id = connect_booking(&app, &state).await;

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/bookings/cancel",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "canceled");

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.status, DriverStatus::Active);

    // terminal booking frees the customer for a new one
    let res = app
        .oneshot(auth_json("POST", "/bookings", "cust-token", booking_body()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn cancel_without_active_booking_is_404() {
    let (app, state) = setup();
    seed_customer(&state).await;

    let res = app
        .oneshot(auth_json(
            "POST",
            "/bookings/cancel",
            "cust-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_reads_are_owner_scoped() {
    let (app, state) = setup();
    let booking_id = connect_booking(&app, &state).await;
    seed_driver(&state, second_driver_id(), "7B002", "959222222").await;

    let owner = app
        .clone()
        .oneshot(auth_get(&format!("/bookings/{booking_id}"), "cust-token"))
        .await
        .unwrap();
    assert_eq!(owner.status(), StatusCode::OK);

    let assigned_driver = app
        .clone()
        .oneshot(auth_get(&format!("/bookings/{booking_id}"), "drv-token"))
        .await
        .unwrap();
    assert_eq!(assigned_driver.status(), StatusCode::OK);

    let stranger = app
        .clone()
        .oneshot(auth_get(&format!("/bookings/{booking_id}"), "drv2-token"))
        .await
        .unwrap();
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

    let admin = app
        .oneshot(auth_get(&format!("/bookings/{booking_id}"), "admin-token"))
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_booked_trip_settles_with_exact_fares() {
    let (app, state) = setup();
    seed_fee_config(&state).await;

    let mut events = state.hub.subscribe();
    let booking_id = connect_booking(&app, &state).await;

    let res = app
        .clone()
        .oneshot(auth_json("POST", "/bookings/accept", "drv-token", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(auth_json("POST", "/bookings/pickup", "drv-token", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/trips/start-booked",
            "drv-token",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let trip = body_json(res).await;
    let started_at = trip["started_at"].as_str().unwrap().to_string();

    let stored = state
        .store
        .get_booking(booking_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.trip_id.unwrap().to_string(),
        trip["id"].as_str().unwrap()
    );

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.status, DriverStatus::OnTrip);

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/trips/end-booked",
            "drv-token",
            json!({
                "end": { "lat": ORIGIN_LAT + 0.05, "lng": ORIGIN_LNG + 0.03 },
                "distance_km": 10.0,
                "duration_secs": 1200
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let receipt = body_json(res).await;
    assert_eq!(receipt["status"], "finished");
    assert_eq!(receipt["fare"]["initial_fee"], 3_000);
    assert_eq!(receipt["fare"]["distance_fee"], 10_000);
    assert_eq!(receipt["fare"]["waiting_fee"], 0);
    assert_eq!(receipt["fare"]["customer_total"], 13_000);
    assert_eq!(receipt["fare"]["driver_total"], 13_000);
    assert_eq!(receipt["fare"]["commission_fee"], 100);
    assert_eq!(receipt["fare"]["driver_received"], 12_900);
    assert_eq!(receipt["started_at"].as_str().unwrap(), started_at);

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.balance, 49_900);
    assert_eq!(driver.status, DriverStatus::Active);

    let stored = state
        .store
        .get_booking(booking_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.status,
        ridehail::models::booking::BookingStatus::Completed
    );

    // exactly one status event per transition, in order
    let mut statuses = vec![];
    while let Ok(envelope) = events.try_recv() {
        if let Event::BookingStatus { status, .. } = envelope.event {
            statuses.push(status);
        }
    }
    use ridehail::models::booking::BookingStatus as B;
    assert_eq!(
        statuses,
        vec![B::Connected, B::Accepted, B::OnTrip, B::Completed]
    );

    // settlement is final: the booking no longer has an active trip
    let res = app
        .oneshot(auth_json(
            "POST",
            "/trips/end-booked",
            "drv-token",
            json!({
                "end": { "lat": ORIGIN_LAT, "lng": ORIGIN_LNG },
                "distance_km": 1.0,
                "duration_secs": 60
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adhoc_trip_start_and_settle() {
    let (app, state) = setup();
    seed_fee_config(&state).await;
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/trips/start",
            "drv-token",
            json!({ "start": { "lat": ORIGIN_LAT, "lng": ORIGIN_LNG } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let trip = body_json(res).await;
    assert_eq!(trip["status"], "driving");

    // one active trip per driver
    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/trips/start",
            "drv-token",
            json!({ "start": { "lat": ORIGIN_LAT, "lng": ORIGIN_LNG } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/trips/end",
            "drv-token",
            json!({
                "end": null,
                "distance_km": 30.0,
                "duration_secs": 3600,
                "waiting_secs": 900
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let receipt = body_json(res).await;
    // 25 km at 1000 plus 5 km at 1100, waiting 15 min with 10 free
    assert_eq!(receipt["fare"]["distance_fee"], 30_500);
    assert_eq!(receipt["fare"]["waiting_fee"], 1_000);
    assert_eq!(receipt["fare"]["customer_total"], 34_500);
    assert_eq!(receipt["fare"]["driver_received"], 34_400);

    let res = app
        .oneshot(auth_json(
            "POST",
            "/trips/end",
            "drv-token",
            json!({ "end": null, "distance_km": 1.0, "duration_secs": 60 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trip_start_without_fee_config_is_a_server_error() {
    let (app, state) = setup();
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .oneshot(auth_json(
            "POST",
            "/trips/start",
            "drv-token",
            json!({ "start": { "lat": ORIGIN_LAT, "lng": ORIGIN_LNG } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(res).await;
    assert_eq!(body["code"], "CONFIG_MISSING");
}

#[tokio::test]
async fn trip_end_rejects_out_of_range_readings() {
    let (app, state) = setup();
    seed_fee_config(&state).await;
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    app.clone()
        .oneshot(auth_json(
            "POST",
            "/trips/start",
            "drv-token",
            json!({ "start": { "lat": ORIGIN_LAT, "lng": ORIGIN_LNG } }),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/trips/end",
            "drv-token",
            json!({ "end": null, "distance_km": 2000.0, "duration_secs": 600 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // rejected settlement leaves the trip active and the balance whole
    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.balance, 50_000);

    let res = app
        .oneshot(auth_json(
            "POST",
            "/trips/end",
            "drv-token",
            json!({ "end": null, "distance_km": 5.0, "duration_secs": 600 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn cash_in_approval_credits_once() {
    let (app, state) = setup();
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/transactions/cash-in",
            "drv-token",
            json!({ "payment_method": "kpay" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let transaction = body_json(res).await;
    assert_eq!(transaction["status"], "pending");
    assert!(transaction["amount"].is_null());
    assert_eq!(transaction["number"].as_str().unwrap().len(), 20);
    let id = transaction["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/transactions/cash-in/resolve",
            "admin-token",
            json!({ "driver_transaction_id": id, "amount": 10_000, "accepted": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let resolved = body_json(res).await;
    assert_eq!(resolved["status"], "completed");
    assert_eq!(resolved["amount"], 10_000);

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.balance, 60_000);

    let res = app
        .oneshot(auth_json(
            "POST",
            "/transactions/cash-in/resolve",
            "admin-token",
            json!({ "driver_transaction_id": id, "amount": 10_000, "accepted": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.balance, 60_000);
}

#[tokio::test]
async fn denied_cash_in_never_credits() {
    let (app, state) = setup();
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/transactions/cash-in",
            "drv-token",
            json!({ "payment_method": "wave" }),
        ))
        .await
        .unwrap();
    let transaction = body_json(res).await;
    let id = transaction["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(auth_json(
            "POST",
            "/transactions/cash-in/resolve",
            "admin-token",
            json!({ "driver_transaction_id": id, "amount": 10_000, "accepted": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let resolved = body_json(res).await;
    assert_eq!(resolved["status"], "failed");

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.balance, 50_000);
}

#[tokio::test]
async fn cash_in_resolution_is_admin_only() {
    let (app, state) = setup();
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .oneshot(auth_json(
            "POST",
            "/transactions/cash-in/resolve",
            "drv-token",
            json!({
                "driver_transaction_id": Uuid::new_v4().to_string(),
                "amount": 1_000,
                "accepted": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_provisions_drivers_with_code_rules() {
    let (app, _state) = setup();

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/admin/drivers",
            "admin-token",
            json!({
                "code": "7B010",
                "name": "Kyaw",
                "phone": "959333333",
                "vehicle_number": "9K-5555"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let driver = body_json(res).await;
    assert_eq!(driver["status"], "active");
    assert_eq!(driver["verified"], false);
    assert_eq!(driver["balance"], 50_000);
    assert_eq!(driver["is_online"], false);

    // all four profile fields present makes the account verified
    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/admin/drivers",
            "admin-token",
            json!({
                "code": "7B011",
                "name": "Moe",
                "phone": "959444444",
                "vehicle_number": "9K-6666",
                "driving_license_number": "DL-1234",
                "vehicle_model": "Probox",
                "address_street": "12 Inya Road",
                "address_city": "Yangon"
            }),
        ))
        .await
        .unwrap();
    let verified = body_json(res).await;
    assert_eq!(verified["verified"], true);
    assert_eq!(verified["address"], "12 Inya Road, Yangon");

    let dup = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/admin/drivers",
            "admin-token",
            json!({
                "code": "7B010",
                "name": "Dup",
                "phone": "959555555",
                "vehicle_number": "9K-7777"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    for bad_code in ["7B000", "7C123", "7B12", "7B1234", "ab123"] {
        let res = app
            .clone()
            .oneshot(auth_json(
                "POST",
                "/admin/drivers",
                "admin-token",
                json!({
                    "code": bad_code,
                    "name": "Bad",
                    "phone": "959666666",
                    "vehicle_number": "9K-8888"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "code {bad_code}");
    }

    let bad_phone = app
        .oneshot(auth_json(
            "POST",
            "/admin/drivers",
            "admin-token",
            json!({
                "code": "7B012",
                "name": "Short",
                "phone": "12345678",
                "vehicle_number": "9K-9999"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(bad_phone.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_provisions_customers_with_unique_phones() {
    let (app, _state) = setup();

    let res = app
        .clone()
        .oneshot(auth_json(
            "POST",
            "/admin/customers",
            "admin-token",
            json!({ "name": "Su", "phone": "959777777" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let dup = app
        .oneshot(auth_json(
            "POST",
            "/admin/customers",
            "admin-token",
            json!({ "name": "Other Su", "phone": "959777777" }),
        ))
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn fee_config_upsert_validates_and_echoes() {
    let (app, _state) = setup();

    let res = app
        .clone()
        .oneshot(auth_json(
            "PUT",
            "/admin/fee-config",
            "admin-token",
            json!({
                "initial_fee": 3000,
                "distance_fee_per_km": 1000,
                "waiting_fee_per_minute": 200,
                "free_waiting_minute": 10,
                "commission_rate": 10.0,
                "commission_rate_type": "percentage",
                "time_windows": [
                    { "start_time": "22:00:00", "end_time": "05:00:00", "fee_delta": 500 }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["config"]["initial_fee"], 3000);
    assert_eq!(body["time_windows"][0]["fee_delta"], 500);

    let negative = app
        .clone()
        .oneshot(auth_json(
            "PUT",
            "/admin/fee-config",
            "admin-token",
            json!({
                "initial_fee": -1,
                "distance_fee_per_km": 1000,
                "waiting_fee_per_minute": 200,
                "free_waiting_minute": 10,
                "commission_rate": 10.0,
                "commission_rate_type": "percentage"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let over_percent = app
        .oneshot(auth_json(
            "PUT",
            "/admin/fee-config",
            "admin-token",
            json!({
                "initial_fee": 3000,
                "distance_fee_per_km": 1000,
                "waiting_fee_per_minute": 200,
                "free_waiting_minute": 10,
                "commission_rate": 150.0,
                "commission_rate_type": "percentage"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(over_percent.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fcm_token_routes_update_the_row() {
    let (app, state) = setup();
    seed_customer(&state).await;
    seed_driver(&state, driver_id(), "7B001", "959111111").await;

    let res = app
        .clone()
        .oneshot(auth_json(
            "PUT",
            "/drivers/me/fcm-token",
            "drv-token",
            json!({ "fcm_token": "token-driver" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let driver = state.store.get_driver(driver_id()).await.unwrap().unwrap();
    assert_eq!(driver.fcm_token.as_deref(), Some("token-driver"));

    let res = app
        .clone()
        .oneshot(auth_json(
            "PUT",
            "/customers/me/fcm-token",
            "cust-token",
            json!({ "fcm_token": "token-customer" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let empty = app
        .oneshot(auth_json(
            "PUT",
            "/drivers/me/fcm-token",
            "drv-token",
            json!({ "fcm_token": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}
