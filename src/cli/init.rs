use schemaweave::error::{Result, WeaveError};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "schemaweave.toml";

/// Run the init command to write the author example project into `dir`
pub fn run(dir: String, force: bool) -> Result<()> {
    let dir = Path::new(&dir);
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        return Err(WeaveError::Config(format!(
            "'{}' already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    tracing::info!("🎨 Writing example project to {}", dir.display());

    for fragment in crate::cli::example::example_fragments() {
        let path = dir.join(fragment.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, fragment.source)?;
        tracing::info!("   • {} ({})", fragment.path, fragment.description);
    }

    let config = crate::cli::example::create_example_config();
    let config_str = config_path
        .to_str()
        .ok_or_else(|| WeaveError::Config(format!("Invalid path: {}", config_path.display())))?;
    schemaweave::config::save_config(&config, config_str)?;
    tracing::info!("📝 Generated {}", config_path.display());

    tracing::info!("");
    tracing::info!("💡 Next steps:");
    tracing::info!("   1. Check the composed schema: schemaweave check --config {}", config_path.display());
    tracing::info!("   2. Start the server: schemaweave serve --config {}", config_path.display());

    Ok(())
}
