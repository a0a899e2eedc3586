//! Response-observed notifications.
//!
//! Every call that completes through a request client is published on a
//! [`ResponseChannel`] so an outer layer (logging, tracing, billing) can record
//! call metadata without the action author instrumenting each call site.

use std::{
    fmt,
    sync::{Arc, RwLock},
    time::Duration,
};

use actionkit_types::{Headers, HttpMethod};
use serde_json::Value;
use tracing::warn;

/// Description of the request side of an observed call. Headers are redacted.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
}

/// Response side of an observed call. Credential-bearing headers are redacted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub headers: Headers,
    pub body: Value,
}

/// Emitted once per completed underlying call, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEvent {
    pub request: RequestDescriptor,
    pub response: ResponseDescriptor,
    pub duration: Duration,
}

/// Subscriber to response-observed events.
pub trait ResponseObserver: Send + Sync {
    fn on_response(&self, event: &ResponseEvent);
}

impl<F> ResponseObserver for F
where
    F: Fn(&ResponseEvent) + Send + Sync,
{
    fn on_response(&self, event: &ResponseEvent) {
        self(event)
    }
}

/// Explicit subscriber list. Clones share the same subscribers.
#[derive(Clone, Default)]
pub struct ResponseChannel {
    observers: Arc<RwLock<Vec<Arc<dyn ResponseObserver>>>>,
}

impl fmt::Debug for ResponseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseChannel").field("observers", &self.len()).finish()
    }
}

impl ResponseChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn ResponseObserver>) {
        match self.observers.write() {
            Ok(mut observers) => observers.push(observer),
            Err(poisoned) => poisoned.into_inner().push(observer),
        }
    }

    /// Forwards every event published here to `target`.
    pub fn forward_to(&self, target: &ResponseChannel) {
        let target = target.clone();
        self.subscribe(Arc::new(move |event: &ResponseEvent| target.publish(event)));
    }

    pub fn publish(&self, event: &ResponseEvent) {
        // Snapshot so observers may subscribe from inside a callback.
        let observers: Vec<Arc<dyn ResponseObserver>> = match self.observers.read() {
            Ok(observers) => observers.clone(),
            Err(poisoned) => {
                warn!("response channel lock poisoned; recovering subscriber list");
                poisoned.into_inner().clone()
            }
        };
        for observer in observers {
            observer.on_response(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.read().map(|observers| observers.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(status: u16) -> ResponseEvent {
        ResponseEvent {
            request: RequestDescriptor {
                method: HttpMethod::Post,
                url: "https://track.example.com/api/v1/customers/1/events".into(),
                headers: Headers::new(),
            },
            response: ResponseDescriptor {
                status,
                headers: Headers::new(),
                body: Value::Null,
            },
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn publishes_to_every_subscriber() {
        let channel = ResponseChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            channel.subscribe(Arc::new(move |event: &ResponseEvent| {
                seen.lock().expect("seen lock").push(event.response.status);
            }));
        }

        channel.publish(&event(201));

        assert_eq!(*seen.lock().expect("seen lock"), vec![201, 201]);
    }

    #[test]
    fn forwarding_republishes_on_target() {
        let source = ResponseChannel::new();
        let target = ResponseChannel::new();
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        target.subscribe(Arc::new(move |_: &ResponseEvent| {
            *counter.lock().expect("counter lock") += 1;
        }));
        source.forward_to(&target);

        source.publish(&event(200));
        source.publish(&event(404));

        assert_eq!(*seen.lock().expect("seen lock"), 2);
        assert_eq!(source.len(), 1);
    }
}
