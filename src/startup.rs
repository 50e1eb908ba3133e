use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use crate::configuration::{DeliveryMode, DeliverySettings, Settings};
use crate::lead_client::LeadClient;
use crate::local_log::LocalLeadLog;
use crate::retry::RetryingTransport;
use crate::routes::{contact_form_error, health_check, submit_contact};
use crate::submission::SubmissionController;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let controller = build_controller(&configuration.delivery)?;

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener =
            TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            controller,
            configuration.application.landing_page_url,
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Wires the controller to whichever sink the delivery mode selects.
pub fn build_controller(settings: &DeliverySettings) -> Result<SubmissionController, anyhow::Error> {
    match settings.mode {
        DeliveryMode::Remote => {
            let remote = &settings.remote;
            let endpoint = remote.endpoint().map_err(anyhow::Error::msg)?;
            tracing::info!(%endpoint, "Delivering leads to the remote backend");
            let client = LeadClient::new(endpoint, remote.api_key.clone(), remote.timeout())
                .context("Failed to build the lead HTTP client")?;
            Ok(SubmissionController::new(RetryingTransport::new(
                client,
                remote.retry_policy(),
            )))
        }
        DeliveryMode::Local => {
            let log = LocalLeadLog::new(&settings.local.log_directory);
            tracing::info!(path = %log.path().display(), "Storing leads in the local log");
            Ok(SubmissionController::new(log))
        }
    }
}

/// Fallback `source_url` for requests that arrive without a `Referer`.
pub struct LandingPageUrl(pub String);

pub fn run(
    listener: TcpListener,
    controller: SubmissionController,
    landing_page_url: String,
) -> Result<Server, std::io::Error> {
    let controller = web::Data::new(controller);
    let landing_page_url = web::Data::new(LandingPageUrl(landing_page_url));
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/contact", web::post().to(submit_contact))
            .app_data(controller.clone())
            .app_data(landing_page_url.clone())
            .app_data(web::FormConfig::default().error_handler(contact_form_error))
    })
    .listen(listener)?
    .run();
    Ok(server)
}
