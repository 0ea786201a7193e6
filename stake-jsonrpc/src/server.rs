use jsonrpc_core::MetaIoHandler;
use jsonrpc_http_server::{AccessControlAllowOrigin, DomainsValidation, Server, ServerBuilder};
use log::{info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{ApiKeyManager, BearerMetaExtractor, CallerMeta};
use crate::rpc::{RpcImpl, StakeRpc};

const DEFAULT_THREADS: usize = 4;

pub struct RpcServer {
    handler: MetaIoHandler<CallerMeta>,
    api_key_manager: Arc<ApiKeyManager>,
    threads: usize,
}

impl RpcServer {
    pub fn new(rpc_impl: RpcImpl, api_key_manager: ApiKeyManager) -> Self {
        let mut handler = MetaIoHandler::default();
        handler.extend_with(rpc_impl.to_delegate());
        RpcServer { handler, api_key_manager: Arc::new(api_key_manager), threads: DEFAULT_THREADS }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// The request handler, for dispatching calls without an HTTP transport.
    pub fn handler(&self) -> &MetaIoHandler<CallerMeta> {
        &self.handler
    }

    /// Binds the HTTP transport. The returned [`Server`] serves requests on its own
    /// threads until it is closed through its close handle.
    pub fn start(self, addr: &SocketAddr) -> io::Result<Server> {
        warn!("Starting JSON-RPC server on HTTP (insecure) at {}", addr);
        if self.api_key_manager.is_empty() {
            warn!("No API keys configured; only public methods will succeed");
        }
        let extractor = BearerMetaExtractor::new(self.api_key_manager.clone());

        let server = ServerBuilder::with_meta_extractor(self.handler, extractor)
            .cors(DomainsValidation::AllowOnly(vec![AccessControlAllowOrigin::Any]))
            .threads(self.threads)
            .start_http(addr)?;

        info!("JSON-RPC server listening on {}", server.address());
        Ok(server)
    }
}
