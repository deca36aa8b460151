mod types;

pub use types::{Config, ResolverConfig, ResolverSource, SchemaConfig, ServerConfig};

use crate::error::{Result, WeaveError};
use crate::schema::{
    Composer, ExecutableSchema, PubSub, Resolver, ResolverMap, ResolverRegistry, SchemaRegistry,
    TypeFragment,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .map_err(|e| WeaveError::Config(format!("Failed to read config file '{}': {}", path, e)))?;

    let config: Config = toml::from_str(&contents)?;
    validate(&config)?;

    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &Config, path: &str) -> Result<()> {
    validate(config)?;

    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string)
        .map_err(|e| WeaveError::Config(format!("Failed to write config file '{}': {}", path, e)))?;

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    config.server.validate().map_err(WeaveError::Config)?;

    if config.schema.fragments.is_empty() {
        return Err(WeaveError::Config(
            "[schema] must list at least one fragment".to_string(),
        ));
    }

    for resolver in &config.resolver {
        resolver.validate().map_err(WeaveError::Config)?;
    }

    Ok(())
}

/// Resolve a path from the config file against the config file's directory
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Read every configured fragment, in order
pub fn load_fragments(config: &Config, base_dir: &Path) -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();

    for fragment in &config.schema.fragments {
        let path = resolve_path(base_dir, fragment);
        let source = fs::read_to_string(&path).map_err(|e| {
            WeaveError::Config(format!(
                "Failed to read schema fragment '{}': {}",
                path.display(),
                e
            ))
        })?;
        registry.register(TypeFragment::new(fragment.clone(), source));
    }

    Ok(registry)
}

/// Build the resolver map described by the `[[resolver]]` entries
///
/// `data` files are read here, so a missing file fails before composition.
pub fn build_resolver_map(config: &Config, base_dir: &Path, pubsub: &PubSub) -> Result<ResolverMap> {
    let mut map = ResolverMap::new("config");

    for entry in &config.resolver {
        let key = entry.key().map_err(WeaveError::Config)?;
        let source = entry.source().map_err(WeaveError::Config)?;

        let resolver = match source {
            ResolverSource::Value(value) => Resolver::constant(value.clone()),
            ResolverSource::Data(path) => {
                let path = resolve_path(base_dir, path);
                let contents = fs::read_to_string(&path).map_err(|e| {
                    WeaveError::Config(format!(
                        "Failed to read data file '{}' for {}: {}",
                        path.display(),
                        key,
                        e
                    ))
                })?;
                let value: Value = serde_json::from_str(&contents)?;
                Resolver::constant(value)
            }
            ResolverSource::Publish(topic) => {
                let pubsub = pubsub.clone();
                let topic = topic.to_string();
                Resolver::from_fn(move |ctx| {
                    let payload = Value::Object(ctx.args);
                    let receivers = pubsub.publish(&topic, payload.clone());
                    tracing::debug!("{} published to '{}' ({} receiver(s))", ctx.key, topic, receivers);
                    async move { Ok(payload) }
                })
            }
            ResolverSource::Subscribe(topic) => {
                let pubsub = pubsub.clone();
                let topic = topic.to_string();
                Resolver::from_stream(move |_ctx| pubsub.subscribe(&topic))
            }
        };

        tracing::debug!("Configured resolver for {}", key);
        map = map.insert(key, resolver);
    }

    Ok(map)
}

/// Load a config file and compose the schema it describes
pub fn compose_from_config(path: &str, pubsub: &PubSub) -> Result<(Config, ExecutableSchema)> {
    let config = load_config(path)?;
    let base_dir = Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let fragments = load_fragments(&config, &base_dir)?;
    let mut resolvers = ResolverRegistry::new();
    resolvers.register(build_resolver_map(&config, &base_dir, pubsub)?)?;

    let mut composer = Composer::new();
    if let Some(root_value) = &config.schema.root_value {
        composer = composer.root_value(root_value.clone());
    }

    let schema = composer.compose_registries(&fragments, &resolvers)?;
    Ok((config, schema))
}
