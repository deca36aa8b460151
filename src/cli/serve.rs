use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_axum::GraphQLSubscription;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use schemaweave::config::ServerConfig;
use schemaweave::error::{Result, WeaveError};
use schemaweave::{ExecutableSchema, PubSub, RequestContext};
use serde_json::{Map, Value};
use std::net::{IpAddr, SocketAddr};
use tower_http::cors::CorsLayer;

/// Run the serve command to start the GraphQL server
pub async fn run(config_path: String, port: Option<u16>) -> Result<()> {
    tracing::info!("📖 Loading configuration from {}", config_path);

    let pubsub = PubSub::default();
    let (config, schema) = schemaweave::config::compose_from_config(&config_path, &pubsub)?;

    // --port wins over the configured port
    let server = ServerConfig {
        port: port.unwrap_or(config.server.port),
        ..config.server
    };

    let addr = bind_address(&server)?;
    let app = build_router(schema, &server);

    tracing::info!("🚀 GraphQL server running on http://{}{}", addr, server.path);
    tracing::info!("📡 Subscriptions: ws://{}{}", addr, server.subscription_path);
    tracing::info!("📊 Playground: http://{}{}", addr, server.path);
    tracing::info!("💡 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        WeaveError::Server(format!(
            "Failed to bind to {}: {}. Port may be in use.",
            addr, e
        ))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WeaveError::Server(format!("Server error: {}", e)))?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

fn bind_address(server: &ServerConfig) -> Result<SocketAddr> {
    let ip: IpAddr = server.bind.parse().map_err(|e| {
        WeaveError::Config(format!("Invalid bind address '{}': {}", server.bind, e))
    })?;
    Ok(SocketAddr::new(ip, server.port))
}

/// Routes: GraphQL over HTTP and the playground on `path`, WebSocket subscriptions on
/// `subscription_path`, and `/health`
pub fn build_router(schema: ExecutableSchema, server: &ServerConfig) -> Router {
    let subscriptions = GraphQLSubscription::new(schema.inner().clone());
    let playground = playground_html(&server.path, &server.subscription_path);

    Router::new()
        .route(
            &server.path,
            post(graphql_handler).get(move || async move { Html(playground) }),
        )
        .route_service(&server.subscription_path, subscriptions)
        .route("/health", get(health_check))
        .with_state(schema)
        .layer(CorsLayer::permissive())
}

async fn graphql_handler(
    State(schema): State<ExecutableSchema>,
    headers: HeaderMap,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(
        schema
            .execute_with_context(request, request_context(&headers))
            .await,
    )
}

/// Expose request headers to resolvers under `headers`
fn request_context(headers: &HeaderMap) -> RequestContext {
    let mut header_values = Map::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            header_values.insert(name.as_str().to_string(), Value::String(value.to_string()));
        }
    }

    let mut values = Map::new();
    values.insert("headers".to_string(), Value::Object(header_values));
    RequestContext::new(values)
}

fn playground_html(path: &str, subscription_path: &str) -> String {
    playground_source(GraphQLPlaygroundConfig::new(path).subscription_endpoint(subscription_path))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
    tracing::info!("🛑 Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer token"));
        headers.insert("x-tenant", HeaderValue::from_static("acme"));

        let ctx = request_context(&headers);
        assert_eq!(ctx.header("authorization"), Some("Bearer token"));
        assert_eq!(ctx.header("X-Tenant"), Some("acme"));
    }

    #[test]
    fn test_bind_address() {
        let server = ServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(bind_address(&server).unwrap().to_string(), "127.0.0.1:8080");

        let invalid = ServerConfig {
            bind: "localhost:1".to_string(),
            ..Default::default()
        };
        assert!(bind_address(&invalid).is_err());
    }

    #[test]
    fn test_playground_points_at_both_endpoints() {
        let html = playground_html("/graphql", "/graphql/ws");
        assert!(html.contains("/graphql/ws"));
    }
}
