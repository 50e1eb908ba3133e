use std::time::Duration;

use lead_relay::configuration::DeliveryMode;
use lead_relay::routes::MALFORMED_FORM_MESSAGE;
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockBuilder, ResponseTemplate};

use crate::helpers::{spawn_app, spawn_app_with, LANDING_PAGE_URL, REFERER, USER_AGENT};

const VALID_FORM: &str =
    "nombre=Ana&email=ana%40x.com&telefono=123&mensaje=hola&privacy=on&website=";

fn when_delivering_a_lead() -> MockBuilder {
    Mock::given(path("/api/lead")).and(method("POST"))
}

#[tokio::test]
async fn a_valid_form_is_delivered_and_answered_with_200() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app.post_contact(VALID_FORM).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["reset"], true);
}

#[tokio::test]
async fn the_delivered_payload_carries_the_form_and_request_metadata() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.lead_server)
        .await;

    // act
    app.post_contact("nombre=%20Ana%20&email=ana%40x.com&telefono=123&mensaje=hola&privacy=on")
        .await;

    // assert
    let lead_request = &app.lead_server.received_requests().await.unwrap()[0];
    let lead: serde_json::Value = serde_json::from_slice(&lead_request.body).unwrap();
    assert_eq!(lead["name"], "Ana");
    assert_eq!(lead["email"], "ana@x.com");
    assert_eq!(lead["phone"], "123");
    assert_eq!(lead["message"], "hola");
    assert_eq!(lead["subject"], "Solicitud de diagnóstico");
    assert_eq!(lead["source_url"], REFERER);
    assert_eq!(lead["user_agent"], USER_AGENT);
    let timestamp = lead["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn the_landing_page_url_is_used_when_there_is_no_referer() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.lead_server)
        .await;

    // act
    app.api_client
        .post(&format!("{}/contact", &app.address))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(VALID_FORM)
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    let lead_request = &app.lead_server.received_requests().await.unwrap()[0];
    let lead: serde_json::Value = serde_json::from_slice(&lead_request.body).unwrap();
    assert_eq!(lead["source_url"], LANDING_PAGE_URL);
}

#[tokio::test]
async fn invalid_forms_are_rejected_with_400_and_never_delivered() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.lead_server)
        .await;
    let test_cases = vec![
        (
            "email=ana%40x.com&telefono=123&mensaje=hola&privacy=on",
            "Por favor completá todos los campos obligatorios.",
            "missing name",
        ),
        (
            "nombre=Ana&email=ana%40x.com&telefono=123&mensaje=%20%20&privacy=on",
            "Por favor completá todos los campos obligatorios.",
            "blank message",
        ),
        (
            "nombre=Ana&email=ana.x.com&telefono=123&mensaje=hola&privacy=on",
            "Por favor ingresá un email válido.",
            "email without @",
        ),
        (
            "nombre=Ana&email=ana%40x&telefono=123&mensaje=hola&privacy=on",
            "Por favor ingresá un email válido.",
            "email without a dot after @",
        ),
        (
            "nombre=Ana&email=ana%40x.com&telefono=123&mensaje=hola",
            "Debes aceptar la Política de Privacidad y los Términos de Uso.",
            "privacy not accepted",
        ),
    ];

    for (body, message, description) in test_cases {
        // act
        let response = app.post_contact(body).await;

        // assert
        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], message, "Wrong message for {}.", description);
    }
}

#[tokio::test]
async fn a_filled_honeypot_gets_a_200_but_nothing_is_delivered() {
    // arrange
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app
        .post_contact("nombre=Ana&email=ana%40x.com&telefono=123&mensaje=hola&privacy=on&website=spam")
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn a_slow_backend_is_retried_once_then_reported_as_503() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(2)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app.post_contact(VALID_FORM).await;

    // assert
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Hubo un error al enviar tu solicitud. Por favor intentá de nuevo en unos minutos."
    );
}

#[tokio::test]
async fn a_timeout_followed_by_success_is_a_success() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&app.lead_server)
        .await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app.post_contact(VALID_FORM).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn a_backend_rejection_is_not_retried() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app.post_contact(VALID_FORM).await;

    // assert
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(!body["message"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn local_mode_appends_leads_to_the_log_instead_of_calling_the_backend() {
    // arrange
    let app = spawn_app_with(DeliveryMode::Local).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.lead_server)
        .await;

    // act
    let first = app.post_contact(VALID_FORM).await;
    let second = app
        .post_contact("nombre=Luis&email=luis%40y.org&telefono=456&mensaje=chau&privacy=on")
        .await;

    // assert
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 200);
    let raw = std::fs::read(app.log_path()).expect("The local log was not written");
    let log: Vec<serde_json::Value> = serde_json::from_slice(&raw).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["name"], "Ana");
    assert_eq!(log[1]["name"], "Luis");
    assert_eq!(log[1]["subject"], "Solicitud de diagnóstico");
}

#[tokio::test]
async fn local_mode_ignores_honeypot_submissions() {
    // arrange
    let app = spawn_app_with(DeliveryMode::Local).await;

    // act
    let response = app
        .post_contact("nombre=Ana&email=ana%40x.com&telefono=123&mensaje=hola&privacy=on&website=x")
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    assert!(!app.log_path().exists());
}

#[tokio::test]
async fn a_redirecting_backend_is_a_failure_not_a_delivery() {
    // arrange
    let app = spawn_app().await;
    when_delivering_a_lead()
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
        .expect(1)
        .mount(&app.lead_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app.post_contact(VALID_FORM).await;

    // assert
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn an_undecodable_form_gets_the_json_error_shape() {
    // arrange
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.lead_server)
        .await;

    // act
    let response = app
        .post_contact("nombre=Ana&nombre=Luis&email=ana%40x.com&telefono=123&mensaje=hola&privacy=on")
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], MALFORMED_FORM_MESSAGE);
}
