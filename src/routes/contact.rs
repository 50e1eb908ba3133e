use actix_web::http::header::{HeaderMap, HeaderName, REFERER, USER_AGENT};
use actix_web::error::{InternalError, UrlencodedError};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::domain::{RequestContext, SubmissionInput};
use crate::startup::LandingPageUrl;
use crate::submission::{FormView, SubmissionController, SubmissionState};

/// The landing page's contact form as posted by the browser.
///
/// Missing text fields arrive as empty strings so the validator, not the decoder, reports them.
#[derive(serde::Deserialize)]
pub struct ContactFormData {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub mensaje: String,
    /// Checkbox: browsers send `on` when ticked and omit the field otherwise.
    #[serde(default)]
    pub privacy: Option<String>,
    /// Honeypot, hidden from humans.
    #[serde(default)]
    pub website: String,
}

impl ContactFormData {
    /// Splits the form into the controller's input and the honeypot value.
    pub fn into_parts(self) -> (SubmissionInput, String) {
        let privacy_accepted = matches!(
            self.privacy.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "true" | "1" | "yes")
        );
        let input = SubmissionInput {
            nombre: self.nombre,
            email: self.email,
            telefono: self.telefono,
            mensaje: self.mensaje,
            privacy_accepted,
        };
        (input, self.website)
    }
}

/// Shown when the body cannot be decoded as the contact form at all.
pub const MALFORMED_FORM_MESSAGE: &str =
    "No pudimos leer el formulario. Por favor recargá la página e intentá nuevamente.";

/// Collects what the controller did to the form so it can be sent back as a response.
///
/// The browser owns the button, so only the effects the page must apply are kept.
#[derive(Default)]
struct ResponseView {
    alert: Option<String>,
    success_shown: bool,
    form_reset: bool,
}

impl FormView for ResponseView {
    fn state_changed(&mut self, state: SubmissionState) {
        tracing::debug!(?state, "Submission state changed");
    }

    fn alert(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }

    fn disable_submit(&mut self, _busy_label: &str) {}

    fn restore_submit(&mut self) {}

    fn reset_form(&mut self) {
        self.form_reset = true;
    }

    fn show_success(&mut self) {
        self.success_shown = true;
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn submit_contact(
    form: web::Form<ContactFormData>,
    request: HttpRequest,
    controller: web::Data<SubmissionController>,
    landing_page_url: web::Data<LandingPageUrl>,
) -> HttpResponse {
    let headers = request.headers();
    let context = RequestContext::new(
        header_value(headers, REFERER).unwrap_or_else(|| landing_page_url.0.clone()),
        header_value(headers, USER_AGENT).unwrap_or_default(),
        Utc::now(),
    );
    let (input, honeypot) = form.into_inner().into_parts();

    let mut view = ResponseView::default();
    let outcome = controller
        .submit(input, &honeypot, context, &mut view)
        .await;

    match outcome.state() {
        SubmissionState::Succeeded => {
            HttpResponse::Ok().json(serde_json::json!({
                "success": view.success_shown,
                "reset": view.form_reset,
            }))
        }
        SubmissionState::Failed => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "success": false,
            "message": view.alert,
        })),
        _ => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "message": view.alert,
        })),
    }
}

/// Renders decode failures with the same JSON shape as validation errors.
pub fn contact_form_error(err: UrlencodedError, _request: &HttpRequest) -> actix_web::Error {
    tracing::warn!(error.message = %err, "Rejected an undecodable contact form");
    let response = HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "message": MALFORMED_FORM_MESSAGE,
    }));
    InternalError::from_response(err, response).into()
}
