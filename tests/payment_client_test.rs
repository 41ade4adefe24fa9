//! Payment gateway client against a mock gateway.

#![allow(clippy::expect_used)]

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use movie_booking::config::{CircuitBreakerConfig, PaymentConfig};
use movie_booking::models::{Booking, BookingStatus};
use movie_booking::services::payment::{CircuitState, PaymentError, PaymentGatewayClient};

const INIT_PATH: &str = "/api/v1/PaymentInit/init";

fn client(gateway_url: &str, failure_threshold: u32) -> PaymentGatewayClient {
    let payment = PaymentConfig {
        merchant_id: "cinema-merchant".to_string(),
        merchant_password: "secret".to_string(),
        gateway_url: gateway_url.to_string(),
        success_url: "https://cinema.test/ok".to_string(),
        fail_url: "https://cinema.test/fail".to_string(),
        webhook_url: "https://cinema.test/api/payments/webhook".to_string(),
        currency: "INR".to_string(),
    };
    let breaker = CircuitBreakerConfig {
        failure_threshold,
        timeout_seconds: 3600,
    };
    PaymentGatewayClient::from_config(&payment, &breaker).expect("client")
}

fn booking(booking_id: i64, total_amount: f64) -> Booking {
    Booking {
        booking_id,
        user_id: 7,
        showtime_id: 42,
        screen_id: 3,
        booking_date: Utc::now(),
        total_amount,
        payment_status: BookingStatus::Pending,
    }
}

#[tokio::test]
async fn init_sends_booking_as_order_in_minor_units() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INIT_PATH))
        .and(body_partial_json(json!({
            "teamSlug": "cinema-merchant",
            "orderId": "981",
            "amount": 3550,
            "currency": "INR",
            "notificationURL": "https://cinema.test/api/payments/webhook"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "paymentId": "pay-981",
            "paymentURL": "https://gateway.test/pay/pay-981"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server.uri(), 3)
        .init_payment(&booking(981, 35.5))
        .await
        .expect("init");

    assert!(response.success);
    assert_eq!(response.payment_id.as_deref(), Some("pay-981"));
    assert_eq!(response.payment_url.as_deref(), Some("https://gateway.test/pay/pay-981"));
}

#[tokio::test]
async fn declined_init_is_reported_as_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "merchant disabled"
        })))
        .mount(&server)
        .await;

    let gateway = client(&server.uri(), 3);
    match gateway.init_payment(&booking(5, 10.0)).await {
        Err(PaymentError::Rejected(message)) => assert_eq!(message, "merchant disabled"),
        other => panic!("expected Rejected, got {:?}", other),
    }
    // A well-formed refusal is not a gateway fault
    assert_eq!(gateway.circuit_breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn failing_gateway_opens_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INIT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let gateway = client(&server.uri(), 2);

    for _ in 0..2 {
        let result = gateway.init_payment(&booking(5, 10.0)).await;
        assert!(matches!(result, Err(PaymentError::Gateway(_))), "got {:?}", result);
    }
    assert_eq!(gateway.circuit_breaker().state(), CircuitState::Open);

    // Refused locally; the mock's expect(2) verifies nothing more reached it
    let refused = gateway.init_payment(&booking(5, 10.0)).await;
    assert!(matches!(refused, Err(PaymentError::CircuitOpen)));
}

#[tokio::test]
async fn status_check_returns_gateway_view() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/PaymentCheck/check"))
        .and(body_partial_json(json!({ "paymentId": "pay-7" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "CONFIRMED",
            "paymentId": "pay-7",
            "orderId": "7"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client(&server.uri(), 3)
        .check_payment_status("pay-7")
        .await
        .expect("check");

    assert_eq!(status.status.as_deref(), Some("CONFIRMED"));
    assert_eq!(status.order_id.as_deref(), Some("7"));
}
