use schemaweave::error::Result;
use schemaweave::PubSub;

/// Run the check command: compose the configured schema and print its SDL
pub fn run(config_path: String) -> Result<()> {
    tracing::info!("📖 Loading configuration from {}", config_path);

    let (config, schema) = schemaweave::config::compose_from_config(&config_path, &PubSub::default())?;

    tracing::info!(
        "✅ {} fragment(s) and {} resolver(s) compose cleanly",
        config.schema.fragments.len(),
        config.resolver.len()
    );

    println!("{}", schema.sdl());
    Ok(())
}
