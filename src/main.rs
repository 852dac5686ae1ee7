use subtrack::{
    configuration::get_configuration,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = get_configuration().expect("Failed to read configuration");

    let subscriber = get_subscriber(
        "subtrack".into(),
        config.application.log_level.clone(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
