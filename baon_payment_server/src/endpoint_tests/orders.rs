use actix_web::{http::StatusCode, test, App};
use baon_payment_engine::db_types::{Centavos, MealPeriod, PaymentMethod};
use serde_json::{json, Value};
use uuid::Uuid;

use super::helpers::{bearer, configure, issuer, seed_catalog, test_db, token_for, OTHER_PARENT, PARENT, STAFF};
use crate::auth::Role;

fn order_body(student_id: i64, product_id: i64, key: &str, method: PaymentMethod) -> Value {
    json!({
        "student_id": student_id,
        "client_order_id": key,
        "scheduled_for": "2024-06-03",
        "items": [{ "product_id": product_id, "quantity": 1, "price_at_order": Centavos::from_pesos(65), "meal_period": MealPeriod::Lunch }],
        "payment_method": method,
    })
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let (_dir, db) = test_db().await;
    let app = test::init_service(App::new().configure(configure(db, issuer()))).await;
    let req = test::TestRequest::get().uri("/orders").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn submit_order_and_replay_returns_conflict_with_original() {
    let (_dir, db) = test_db().await;
    let issuer = issuer();
    let token = token_for(&issuer, PARENT, Role::Parent);
    let (student_id, product_id) = seed_catalog(&db, "Adobo", 65, 10).await;
    let app = test::init_service(App::new().configure(configure(db, issuer))).await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&token))
        .set_json(order_body(student_id, product_id, "ep-dup", PaymentMethod::Cash))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "awaiting_payment");
    assert_eq!(body["payment_status"], "awaiting_payment");
    assert_eq!(body["total_amount"], json!(6500));
    assert!(body["payment_due_at"].is_string());
    let order_id = body["order_id"].as_i64().unwrap();

    // Same idempotency key → 409 carrying the original order.
    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&token))
        .set_json(order_body(student_id, product_id, "ep-dup", PaymentMethod::Cash))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "DUPLICATE_ORDER");
    assert_eq!(body["existing_order_id"].as_i64().unwrap(), order_id);
}

#[actix_web::test]
async fn insufficient_stock_reports_the_shortfall() {
    let (_dir, db) = test_db().await;
    let issuer = issuer();
    let token = token_for(&issuer, PARENT, Role::Parent);
    let (student_id, product_id) = seed_catalog(&db, "Turon", 15, 1).await;
    let app = test::init_service(App::new().configure(configure(db, issuer))).await;

    let mut body = order_body(student_id, product_id, "ep-stock", PaymentMethod::Cash);
    body["items"][0]["quantity"] = json!(3);
    let req = test::TestRequest::post().uri("/orders").insert_header(bearer(&token)).set_json(body).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "INSUFFICIENT_STOCK");
    assert_eq!(body["requested"], json!(3));
    assert_eq!(body["available"], json!(1));
}

#[actix_web::test]
async fn checkout_reports_partition_outcomes() {
    let (_dir, db) = test_db().await;
    let issuer = issuer();
    let token = token_for(&issuer, PARENT, Role::Parent);
    let (student_id, product_id) = seed_catalog(&db, "Adobo", 65, 10).await;
    let ben = db.insert_student("Ben Santos").await.unwrap();
    db.link_student(PARENT, ben.id).await.unwrap();
    let sold_out = db.insert_product("Spaghetti", Centavos::from_pesos(55), 0, true).await.unwrap();
    let app = test::init_service(App::new().configure(configure(db, issuer))).await;

    let payload = json!({
        "checkout_id": Uuid::new_v4(),
        "payment_method": "cash",
        "lines": [
            { "product_id": product_id, "student_id": student_id, "scheduled_for": "2024-06-03",
              "meal_period": "lunch", "quantity": 1, "unit_price": Centavos::from_pesos(65) },
            { "product_id": sold_out.id, "student_id": ben.id, "scheduled_for": "2024-06-04",
              "meal_period": "lunch", "quantity": 1, "unit_price": Centavos::from_pesos(55) },
        ],
    });
    let req = test::TestRequest::post().uri("/checkout").insert_header(bearer(&token)).set_json(payload).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["failures"].as_array().unwrap().len(), 1);
    assert_eq!(body["orders"][0]["student_id"].as_i64().unwrap(), student_id);
    assert_eq!(body["failures"][0]["error"], "INSUFFICIENT_STOCK");
}

#[actix_web::test]
async fn cash_confirmation_is_staff_only() {
    let (_dir, db) = test_db().await;
    let issuer = issuer();
    let parent_token = token_for(&issuer, PARENT, Role::Parent);
    let staff_token = token_for(&issuer, STAFF, Role::Staff);
    let (student_id, product_id) = seed_catalog(&db, "Adobo", 65, 10).await;
    let app = test::init_service(App::new().configure(configure(db, issuer))).await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&parent_token))
        .set_json(order_body(student_id, product_id, "ep-cash", PaymentMethod::Cash))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order_id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{order_id}/confirm-cash-payment"))
        .insert_header(bearer(&parent_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{order_id}/confirm-cash-payment"))
        .insert_header(bearer(&staff_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_status"], "paid");

    // Confirming twice is a state-machine error.
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{order_id}/confirm-cash-payment"))
        .insert_header(bearer(&staff_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "ALREADY_PAID");
}

#[actix_web::test]
async fn cancellation_respects_ownership() {
    let (_dir, db) = test_db().await;
    let issuer = issuer();
    let owner_token = token_for(&issuer, PARENT, Role::Parent);
    let other_token = token_for(&issuer, OTHER_PARENT, Role::Parent);
    let (student_id, product_id) = seed_catalog(&db, "Adobo", 65, 10).await;
    let app = test::init_service(App::new().configure(configure(db, issuer))).await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&owner_token))
        .set_json(order_body(student_id, product_id, "ep-cancel", PaymentMethod::Cash))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order_id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{order_id}/cancel"))
        .insert_header(bearer(&other_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{order_id}/cancel"))
        .insert_header(bearer(&owner_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "cancelled");
}

#[actix_web::test]
async fn wallet_and_order_views() {
    let (_dir, db) = test_db().await;
    let issuer = issuer();
    let token = token_for(&issuer, PARENT, Role::Parent);
    let (student_id, product_id) = seed_catalog(&db, "Adobo", 65, 10).await;
    db.upsert_wallet(PARENT, Centavos::from_pesos(200)).await.unwrap();
    let app = test::init_service(App::new().configure(configure(db, issuer))).await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&token))
        .set_json(order_body(student_id, product_id, "ep-views", PaymentMethod::Balance))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/orders").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/wallet").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["balance"], json!(13_500));
}
