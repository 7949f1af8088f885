//! Common test utilities: mock transports, descriptors and env isolation

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use connprobe::core::probe::{
    AuthStrategy, EndpointSpec, ProbeClient, ProbeRequest, ProbeResponse, SecretRef,
    ServiceDescriptor, TransportError,
};
use tempfile::TempDir;

/// Test helper to create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Saves the listed variables (plus HOME), clears them, restores on drop
pub struct IsolatedEnv {
    saved: Vec<(String, Option<String>)>,
}

impl IsolatedEnv {
    pub fn new(names: &[&str]) -> Self {
        let mut saved = Vec::new();
        for name in names.iter().copied().chain(["HOME", "CONNPROBE_DEBUG"]) {
            saved.push((name.to_string(), env::var(name).ok()));
            if name != "HOME" {
                env::remove_var(name);
            }
        }
        Self { saved }
    }

    pub fn set(&self, name: &str, value: &str) {
        env::set_var(name, value);
    }

    pub fn set_temp_home(&self, temp_dir: &std::path::Path) {
        env::set_var("HOME", temp_dir);
    }
}

impl Drop for IsolatedEnv {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(v) => env::set_var(name, v),
                None => env::remove_var(name),
            }
        }
    }
}

/// What the mock transport does for one request
#[derive(Clone)]
pub enum Reply {
    Status(u16, Vec<(&'static str, &'static str)>),
    Fail(TransportError),
    Hang,
}

pub fn status(code: u16) -> Reply {
    Reply::Status(code, Vec::new())
}

type Handler = dyn Fn(&ProbeRequest) -> Reply + Send + Sync;

/// Scripted transport that records every request it receives
pub struct MockProbeClient {
    handler: Box<Handler>,
    requests: Mutex<Vec<ProbeRequest>>,
}

impl MockProbeClient {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ProbeRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Reply by URL path; unknown paths answer 404
    pub fn routes(routes: &[(&str, Reply)]) -> Arc<Self> {
        let table: HashMap<String, Reply> = routes
            .iter()
            .map(|(path, reply)| (path.to_string(), reply.clone()))
            .collect();
        Self::new(move |request| {
            table
                .get(&path_of(request))
                .cloned()
                .unwrap_or_else(|| status(404))
        })
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ProbeClient for MockProbeClient {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
        let reply = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        let start = Instant::now();
        match reply {
            Reply::Status(code, headers) => Ok(ProbeResponse {
                status_code: code,
                headers: headers
                    .into_iter()
                    .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                    .collect(),
                duration: start.elapsed(),
            }),
            Reply::Fail(error) => Err(error),
            Reply::Hang => futures::future::pending().await,
        }
    }
}

pub fn path_of(request: &ProbeRequest) -> String {
    url::Url::parse(&request.url)
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

pub fn header_of<'a>(request: &'a ProbeRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Small storefront service: root, one resource list, bearer then none
pub fn shop_descriptor(base_url: Option<&str>) -> ServiceDescriptor {
    ServiceDescriptor {
        name: "shop".to_string(),
        env_prefix: "SHOP".to_string(),
        base_url: base_url.map(str::to_string),
        endpoints: vec![
            EndpointSpec::root("/wp-json"),
            EndpointSpec::resource_list("/wp-json/shop/v1/products", "/wp-json/shop/v1"),
        ],
        auth: vec![
            AuthStrategy::Bearer {
                token: SecretRef::Env("SHOP_API_KEY".to_string()),
            },
            AuthStrategy::None,
        ],
        timeout: Duration::from_millis(8000),
        deadline: None,
    }
}
