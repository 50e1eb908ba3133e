use lead_relay::configuration::get_configuration;
use lead_relay::startup::Application;
use lead_relay::telemetry::{get_tracing_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_tracing_subscriber("lead-relay", "info", std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration()?;
    let application = Application::build(configuration).await?;
    tracing::info!(port = application.port(), "Lead relay listening");
    application.run_until_stopped().await?;
    Ok(())
}
