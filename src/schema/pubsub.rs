//! In-process publish/subscribe for subscription resolvers
//!
//! A single broadcast channel carries `(topic, payload)` events; each subscriber
//! filters the channel down to its topic.
//!
//! ```text
//! Mutation resolver ──publish()──▶ broadcast ──▶ subscribe(topic) ──▶ Subscription field
//! ```

use crate::schema::resolver::ResolverResult;

use futures_util::Stream;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

#[derive(Debug)]
struct Event {
    topic: String,
    payload: Value,
}

/// Topic-based event bus shared by publishers and subscription resolvers
#[derive(Debug, Clone)]
pub struct PubSub {
    tx: broadcast::Sender<Arc<Event>>,
}

impl PubSub {
    /// # Arguments
    ///
    /// * `capacity` - Events buffered per subscriber before it starts lagging
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a payload; returns how many subscribers were listening (0 if none)
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        let event = Arc::new(Event {
            topic: topic.to_string(),
            payload,
        });

        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!("Published to '{}' ({} receiver(s))", topic, receivers);
                receivers
            }
            Err(_) => {
                tracing::debug!("Published to '{}' with no receivers", topic);
                0
            }
        }
    }

    /// Stream every payload published on `topic` after this call
    pub fn subscribe(&self, topic: &str) -> impl Stream<Item = ResolverResult> + Send + 'static {
        let topic = topic.to_string();

        BroadcastStream::new(self.tx.subscribe()).filter_map(move |event| match event {
            Ok(event) if event.topic == topic => Some(Ok(event.payload.clone())),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(
                    "Subscriber to '{}' lagged behind, skipped {} event(s)",
                    topic,
                    skipped
                );
                None
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_without_subscribers() {
        let pubsub = PubSub::new(16);
        assert_eq!(pubsub.publish("AUTHOR_ADDED", json!({})), 0);
    }

    #[test]
    fn test_subscribe_filters_by_topic() {
        tokio_test::block_on(async {
            let pubsub = PubSub::new(16);
            let mut stream = Box::pin(pubsub.subscribe("AUTHOR_ADDED"));
            assert_eq!(pubsub.subscriber_count(), 1);

            assert_eq!(pubsub.publish("BOOK_ADDED", json!({ "title": "x" })), 1);
            assert_eq!(
                pubsub.publish("AUTHOR_ADDED", json!({ "firstName": "Hao" })),
                1
            );

            let first = stream.next().await.unwrap().unwrap();
            assert_eq!(first, json!({ "firstName": "Hao" }));
        });
    }

    #[test]
    fn test_clones_share_channel() {
        tokio_test::block_on(async {
            let pubsub = PubSub::new(16);
            let publisher = pubsub.clone();
            let mut stream = Box::pin(pubsub.subscribe("T"));

            publisher.publish("T", json!(1));
            assert_eq!(stream.next().await.unwrap().unwrap(), json!(1));
        });
    }
}
