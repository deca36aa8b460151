use crate::schema::FieldKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub schema: SchemaConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolver: Vec<ResolverConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind the server to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface to bind the server to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// GraphQL HTTP endpoint (also serves the playground)
    #[serde(default = "default_path")]
    pub path: String,

    /// WebSocket endpoint for subscriptions
    #[serde(default = "default_subscription_path")]
    pub subscription_path: String,
}

fn default_port() -> u16 {
    4000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_path() -> String {
    "/graphql".to_string()
}

fn default_subscription_path() -> String {
    "/graphql/ws".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            path: default_path(),
            subscription_path: default_subscription_path(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        for path in [&self.path, &self.subscription_path] {
            if !path.starts_with('/') {
                return Err(format!("Endpoint path '{}' must start with '/'", path));
            }
        }
        if self.path == self.subscription_path {
            return Err(format!(
                "HTTP and subscription endpoints must differ (both are '{}')",
                self.path
            ));
        }
        Ok(())
    }
}

/// Schema sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// SDL files, relative to the config file, composed in this order
    pub fragments: Vec<String>,

    /// Optional root value; root fields without a resolver read their property from it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_value: Option<Value>,
}

/// One `[[resolver]]` entry: a field and where its value comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Field coordinate (format: "Type.field")
    pub field: String,

    /// Inline constant value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// JSON file holding the constant value, relative to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Topic to publish the field arguments on (mutation fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<String>,

    /// Topic to stream payloads from (subscription fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<String>,
}

/// Where a configured resolver gets its value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolverSource<'a> {
    Value(&'a Value),
    Data(&'a str),
    Publish(&'a str),
    Subscribe(&'a str),
}

impl ResolverConfig {
    pub fn key(&self) -> Result<FieldKey, String> {
        self.field.parse()
    }

    /// The single configured source
    pub fn source(&self) -> Result<ResolverSource<'_>, String> {
        let mut sources = Vec::new();
        if let Some(value) = &self.value {
            sources.push(ResolverSource::Value(value));
        }
        if let Some(data) = &self.data {
            sources.push(ResolverSource::Data(data));
        }
        if let Some(topic) = &self.publish {
            sources.push(ResolverSource::Publish(topic));
        }
        if let Some(topic) = &self.subscribe {
            sources.push(ResolverSource::Subscribe(topic));
        }

        match sources.as_slice() {
            [source] => Ok(*source),
            [] => Err(format!(
                "Resolver '{}' needs one of 'value', 'data', 'publish' or 'subscribe'",
                self.field
            )),
            _ => Err(format!(
                "Resolver '{}' sets more than one of 'value', 'data', 'publish' and 'subscribe'",
                self.field
            )),
        }
    }

    /// Validate resolver configuration
    pub fn validate(&self) -> Result<(), String> {
        self.key()?;

        match self.source()? {
            ResolverSource::Publish(topic) | ResolverSource::Subscribe(topic)
                if topic.trim().is_empty() =>
            {
                Err(format!("Resolver '{}' has an empty topic", self.field))
            }
            ResolverSource::Data(path) if path.trim().is_empty() => {
                Err(format!("Resolver '{}' has an empty data path", self.field))
            }
            _ => Ok(()),
        }
    }
}
