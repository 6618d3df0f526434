// SPDX-License-Identifier: MIT OR Apache-2.0
//! Executors: named async tasks whose progress lives in the state store.
//!
//! Each executor owns the record `{config, data, error, isLoading}` at its
//! id. Effects only schedule runs; [`ExecutorManager::run_pending`] drives
//! them through the handler registered for the executor's `type`. Failures
//! land in the record's `error` field instead of being returned.

use crate::error::{ExecutorError, HttpError};
use crate::schema::MExecutorConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use topo_editor_expression::ReactiveContext;

/// Type string of the REST handler
pub const REST_API: &str = "restApi";

/// Runs executors of one type
pub trait ExecutorHandler: Send + Sync {
    /// Run `config` with `props` and resolve to the result data
    fn run<'a>(&'a self, config: &'a MExecutorConfig, props: &'a Value) -> BoxFuture<'a, Result<Value, ExecutorError>>;
}

/// HTTP verb
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

/// Request handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequest {
    /// Target URL
    pub url: String,
    /// Verb
    pub method: HttpMethod,
    /// Request headers
    pub headers: IndexMap<String, String>,
    /// Query parameters
    pub params: Option<Value>,
    /// Body
    pub data: Option<Value>,
}

/// Sends HTTP requests for [`RestApiHandler`]
pub trait HttpTransport: Send + Sync {
    /// Send the request and resolve to the decoded response body
    fn request(&self, request: HttpRequest) -> BoxFuture<'static, Result<Value, HttpError>>;
}

/// Fields of a `restApi` executor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiConfig {
    /// Target URL
    pub url: String,
    /// Verb
    #[serde(default)]
    pub method: HttpMethod,
    /// Request headers
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Fixed body or query values
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    /// Timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl RestApiConfig {
    /// Build the request; `props` override the fixed data, GET sends them as query
    pub fn request(&self, props: &Value) -> HttpRequest {
        let mut data = self.data.clone().unwrap_or_default();
        if let Some(props) = props.as_object() {
            data.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let data = (!data.is_empty()).then_some(Value::Object(data));

        let (params, data) = match self.method {
            HttpMethod::Get => (data, None),
            _ => (None, data),
        };

        HttpRequest {
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            params,
            data,
        }
    }
}

/// Handler for `restApi` executors
pub struct RestApiHandler {
    transport: Arc<dyn HttpTransport>,
}

impl RestApiHandler {
    /// Handler sending through `transport`
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl fmt::Debug for RestApiHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestApiHandler").finish_non_exhaustive()
    }
}

impl ExecutorHandler for RestApiHandler {
    fn run<'a>(&'a self, config: &'a MExecutorConfig, props: &'a Value) -> BoxFuture<'a, Result<Value, ExecutorError>> {
        async move {
            let rest: RestApiConfig = serde_json::from_value(Value::Object(config.options.clone()))?;
            let request = rest.request(props);
            tracing::debug!(executor = %config.id, url = %request.url, method = ?request.method, "Sending request");

            let response = self.transport.request(request);
            match rest.timeout {
                Some(ms) => tokio::time::timeout(Duration::from_millis(ms), response)
                    .await
                    .map_err(|_| ExecutorError::Timeout(ms))?
                    .map_err(ExecutorError::from),
                None => response.await.map_err(ExecutorError::from),
            }
        }
        .boxed()
    }
}

/// State record of one executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorState {
    /// Declaration
    pub config: MExecutorConfig,
    /// Last successful result
    pub data: Value,
    /// Last failure
    pub error: Option<Value>,
    /// Whether a run is scheduled or in flight
    pub is_loading: bool,
}

/// Owns executor records, handlers and scheduled runs
pub struct ExecutorManager {
    context: ReactiveContext,
    handlers: IndexMap<String, Arc<dyn ExecutorHandler>>,
    pending: VecDeque<(String, Value)>,
}

impl fmt::Debug for ExecutorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorManager")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl ExecutorManager {
    /// Manager writing records into `context`
    pub fn new(context: ReactiveContext) -> Self {
        Self {
            context,
            handlers: IndexMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Register the handler for an executor type
    pub fn register_handler(&mut self, kind: impl Into<String>, handler: Arc<dyn ExecutorHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Whether a handler exists for `kind`
    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Write a fresh record for `config`
    pub fn init_executor(&self, config: &MExecutorConfig) {
        self.context.set(
            &config.id,
            json!({
                "config": config,
                "data": {},
                "error": null,
                "isLoading": false,
            }),
        );
        tracing::debug!(executor = %config.id, kind = %config.kind, "Executor initialized");
    }

    /// Remove a record
    pub fn delete_executor(&self, id: &str) -> bool {
        self.context.unset(id)
    }

    /// Read a record
    pub fn get_executor(&self, id: &str) -> Option<ExecutorState> {
        self.context
            .get(id)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Mark loading and queue a run. Returns `false` for unknown ids.
    pub fn schedule(&mut self, id: &str, payload: Value) -> bool {
        if self.get_executor(id).is_none() {
            return false;
        }
        self.context.set(&format!("{id}.isLoading"), Value::Bool(true));
        self.pending.push_back((id.to_string(), payload));
        true
    }

    /// Number of queued runs
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Run one executor now. Returns whether it succeeded.
    pub async fn run_executor(&self, id: &str, props: &Value) -> bool {
        let Some(state) = self.get_executor(id) else {
            tracing::error!(executor = %id, "Executor does not exist");
            return false;
        };
        self.context.set(&format!("{id}.isLoading"), Value::Bool(true));

        let result = match self.handlers.get(&state.config.kind) {
            Some(handler) => handler.run(&state.config, props).await,
            None => Err(ExecutorError::UnknownType(state.config.kind.clone())),
        };

        let succeeded = match result {
            Ok(data) => {
                self.context.set(&format!("{id}.data"), data);
                self.context.set(&format!("{id}.error"), Value::Null);
                true
            }
            Err(error) => {
                tracing::warn!(executor = %id, %error, "Executor failed");
                self.context.set(&format!("{id}.error"), error.to_value());
                false
            }
        };
        self.context.set(&format!("{id}.isLoading"), Value::Bool(false));
        succeeded
    }

    /// Run queued executors in order. Returns how many succeeded.
    pub async fn run_pending(&mut self) -> usize {
        let mut succeeded = 0;
        while let Some((id, props)) = self.pending.pop_front() {
            if self.run_executor(&id, &props).await {
                succeeded += 1;
            }
        }
        succeeded
    }

    /// Drop queued runs
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeTransport {
        requests: Mutex<Vec<HttpRequest>>,
        fail: bool,
    }

    impl HttpTransport for FakeTransport {
        fn request(&self, request: HttpRequest) -> BoxFuture<'static, Result<Value, HttpError>> {
            self.requests.lock().push(request.clone());
            let fail = self.fail;
            async move {
                if fail {
                    Err(HttpError {
                        status: Some(500),
                        message: "boom".into(),
                        body: None,
                    })
                } else {
                    Ok(json!({"url": request.url, "params": request.params}))
                }
            }
            .boxed()
        }
    }

    fn users() -> MExecutorConfig {
        serde_json::from_value(json!({
            "id": "users",
            "name": "Users",
            "type": "restApi",
            "url": "/api/users",
            "method": "GET",
            "data": {"page": 1}
        }))
        .unwrap()
    }

    fn manager(transport: Arc<FakeTransport>) -> ExecutorManager {
        let mut manager = ExecutorManager::new(ReactiveContext::default());
        manager.register_handler(REST_API, Arc::new(RestApiHandler::new(transport)));
        manager.init_executor(&users());
        manager
    }

    #[test]
    fn test_init_record() {
        let manager = ExecutorManager::new(ReactiveContext::default());
        manager.init_executor(&users());

        let state = manager.get_executor("users").unwrap();
        assert_eq!(state.data, json!({}));
        assert_eq!(state.error, None);
        assert!(!state.is_loading);
        assert!(manager.delete_executor("users"));
        assert!(manager.get_executor("users").is_none());
    }

    #[test]
    fn test_get_sends_data_as_query() {
        let rest: RestApiConfig = serde_json::from_value(json!({"url": "/u", "data": {"page": 1}})).unwrap();
        let request = rest.request(&json!({"page": 2, "q": "ada"}));
        assert_eq!(request.params, Some(json!({"page": 2, "q": "ada"})));
        assert_eq!(request.data, None);

        let rest: RestApiConfig = serde_json::from_value(json!({"url": "/u", "method": "POST"})).unwrap();
        let request = rest.request(&json!({"name": "ada"}));
        assert_eq!(request.params, None);
        assert_eq!(request.data, Some(json!({"name": "ada"})));
    }

    #[tokio::test]
    async fn test_run_stores_data() {
        let transport = Arc::new(FakeTransport::default());
        let mut manager = manager(transport.clone());

        assert!(manager.schedule("users", json!({"q": "ada"})));
        assert!(manager.get_executor("users").unwrap().is_loading);
        assert_eq!(manager.run_pending().await, 1);

        let state = manager.get_executor("users").unwrap();
        assert!(!state.is_loading);
        assert_eq!(state.data["params"], json!({"page": 1, "q": "ada"}));
        assert_eq!(transport.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_recorded_not_returned() {
        let transport = Arc::new(FakeTransport {
            fail: true,
            ..Default::default()
        });
        let manager = manager(transport);

        assert!(!manager.run_executor("users", &Value::Null).await);
        let state = manager.get_executor("users").unwrap();
        assert!(!state.is_loading);
        assert_eq!(state.error.unwrap()["status"], json!(500));
    }

    #[tokio::test]
    async fn test_unknown_type_and_id() {
        let mut manager = ExecutorManager::new(ReactiveContext::default());
        let mut config = users();
        config.kind = "graphql".into();
        manager.init_executor(&config);

        assert!(!manager.run_executor("users", &Value::Null).await);
        let error = manager.get_executor("users").unwrap().error.unwrap();
        assert_eq!(error["message"], json!("No handler for executor type graphql"));

        assert!(!manager.schedule("missing", Value::Null));
        assert_eq!(manager.pending_len(), 0);
    }
}
