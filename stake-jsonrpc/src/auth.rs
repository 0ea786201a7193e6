use jsonrpc_core::Metadata;
use jsonrpc_http_server::hyper::{header, Body, Request};
use jsonrpc_http_server::MetaExtractor;
use log::{debug, warn};
use stake_shared_types::Address;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request metadata: the principal the bearer key resolved to, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerMeta {
    pub caller: Option<Address>,
}

impl CallerMeta {
    pub fn anonymous() -> Self {
        CallerMeta { caller: None }
    }

    pub fn for_caller(caller: Address) -> Self {
        CallerMeta { caller: Some(caller) }
    }
}

impl Metadata for CallerMeta {}

/// Maps API keys to the principal that operations are issued as.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyManager {
    keys: HashMap<String, Address>,
}

impl ApiKeyManager {
    pub fn new() -> Self {
        ApiKeyManager { keys: HashMap::new() }
    }

    pub fn from_keys(keys: HashMap<String, Address>) -> Self {
        ApiKeyManager { keys }
    }

    pub fn insert(&mut self, api_key: impl Into<String>, principal: Address) {
        self.keys.insert(api_key.into(), principal);
    }

    pub fn validate_api_key(&self, api_key: &str) -> Option<Address> {
        self.keys.get(api_key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolves an `Authorization` header value of the form `Bearer <key>`.
    pub fn resolve_header(&self, value: Option<&str>) -> Option<Address> {
        let api_key = value?.strip_prefix("Bearer ")?.trim();
        match self.validate_api_key(api_key) {
            Some(principal) => {
                debug!("API key resolved to {}", principal);
                Some(principal)
            }
            None => {
                warn!("Rejected unknown API key");
                None
            }
        }
    }
}

/// Reads the bearer key off each HTTP request and turns it into [`CallerMeta`].
/// Requests without a valid key still reach public methods.
pub struct BearerMetaExtractor {
    api_key_manager: Arc<ApiKeyManager>,
}

impl BearerMetaExtractor {
    pub fn new(api_key_manager: Arc<ApiKeyManager>) -> Self {
        BearerMetaExtractor { api_key_manager }
    }
}

impl MetaExtractor<CallerMeta> for BearerMetaExtractor {
    fn read_metadata(&self, request: &Request<Body>) -> CallerMeta {
        let auth_header = request.headers().get(header::AUTHORIZATION).and_then(|h| h.to_str().ok());
        CallerMeta { caller: self.api_key_manager.resolve_header(auth_header) }
    }
}
