//! In-memory transport shared by the engine integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use actionkit_engine::ActionRuntime;
use actionkit_types::{HttpMethod, HttpRequest, HttpResponse};
use actionkit_util::http::{HttpError, HttpTransport};
use async_trait::async_trait;
use serde_json::Value;

/// Answers calls from a route table and records every request it receives.
///
/// Unrouted calls answer 404 with an empty body.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(HttpMethod, String), (u16, Value)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, method: HttpMethod, url: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert((method, url.to_string()), (status, body));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let (status, body) = self
            .routes
            .lock()
            .expect("routes lock")
            .get(&(request.method, request.url.clone()))
            .cloned()
            .unwrap_or((404, Value::Null));
        let mut response = HttpResponse::new(status, body);
        response.url = request.url.clone();
        response.headers.insert("content-type".into(), "application/json".into());
        self.requests.lock().expect("requests lock").push(request);
        Ok(response)
    }
}

pub fn runtime(transport: &Arc<FakeTransport>) -> ActionRuntime {
    ActionRuntime::new(Arc::clone(transport) as Arc<dyn HttpTransport>)
}
