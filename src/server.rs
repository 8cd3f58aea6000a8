//! The acceptor and the state every session shares.
//!
//! [`Server::run`] accepts connections until the shutdown coordinator
//! closes the listener. At most [`MAX_CONNECTIONS`] sockets are open at a
//! time: the acceptor takes a permit before each `accept()`, so a sixth
//! client waits in the listen backlog until one of the five closes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use numeri::config::ServerConfig;
//! use numeri::server::Server;
//!
//! # async fn example() -> numeri::error::Result<()> {
//! let server = Server::bind(ServerConfig::new()).await?;
//! println!("listening on {}", server.local_addr());
//! server.run().await
//! # }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, debug_span, error, info, warn, Instrument};

use crate::config::{AcceptErrorPolicy, ServerConfig, MAX_CONNECTIONS};
use crate::counters::CounterSet;
use crate::dedup::DedupStore;
use crate::error::{Result, ServerError};
use crate::observers::text::TextObserver;
use crate::observers::Observer;
use crate::record_log::{RecordLog, WriterRecordLog};
use crate::reporter::Reporter;
use crate::session::Session;
use crate::shutdown::ShutdownCoordinator;

/// Pause after a tolerated accept error.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// State shared by the acceptor, every session and the reporter.
#[derive(Debug)]
pub struct ServerContext {
    dedup: DedupStore,
    counters: Arc<CounterSet>,
    shutdown: Arc<ShutdownCoordinator>,
    record_log: RwLock<Arc<dyn RecordLog>>,
}

impl ServerContext {
    /// Creates empty server state writing first-seen records to `record_log`.
    pub fn new(record_log: Arc<dyn RecordLog>) -> Self {
        Self {
            dedup: DedupStore::new(),
            counters: Arc::new(CounterSet::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            record_log: RwLock::new(record_log),
        }
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn counters(&self) -> &Arc<CounterSet> {
        &self.counters
    }

    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    pub fn record_log(&self) -> Arc<dyn RecordLog> {
        Arc::clone(&self.record_log.read())
    }

    /// Redirects first-seen records to another log.
    pub fn set_record_log(&self, record_log: Arc<dyn RecordLog>) {
        *self.record_log.write() = record_log;
    }
}

/// A source of accepted connections.
trait Listener: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// A bound server, ready to run.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
    context: Arc<ServerContext>,
    observers: Vec<Box<dyn Observer>>,
}

impl Server {
    /// Binds the listener, then opens the record log.
    ///
    /// The record log file named by the configuration is recreated empty
    /// once the address is secured, so a failed bind leaves it untouched.
    /// Without a file, records go to stderr.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let record_log: Arc<dyn RecordLog> = match &config.record_log {
            Some(path) => Arc::new(WriterRecordLog::file(path)?),
            None => Arc::new(WriterRecordLog::stderr()),
        };
        info!(addr = %local_addr, max_connections = MAX_CONNECTIONS, "listening");

        Ok(Self {
            listener,
            local_addr,
            config,
            context: Arc::new(ServerContext::new(record_log)),
            observers: Vec::new(),
        })
    }

    /// Replaces the record log. Handles from [`context`](Self::context)
    /// taken earlier see the new log too.
    pub fn with_record_log(self, record_log: Arc<dyn RecordLog>) -> Self {
        self.context.set_record_log(record_log);
        self
    }

    /// Adds a reporting sink. Without any, reports go to a [`TextObserver`].
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The shared server state.
    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// The shutdown coordinator, for stopping the server from outside.
    pub fn shutdown(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(self.context.shutdown())
    }

    /// Accepts connections until shutdown completes.
    ///
    /// Returns `Ok(())` once the terminate command (or an external
    /// [`ShutdownCoordinator::stop`]) has drained every session and closed
    /// the listener. Under [`AcceptErrorPolicy::FailFast`] an accept error
    /// outside shutdown ends the server with [`ServerError::Accept`].
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            local_addr,
            config,
            context,
            mut observers,
        } = self;

        let reporter = config.reporting.then(|| {
            if observers.is_empty() {
                observers.push(Box::new(TextObserver::new()));
            }
            observers
                .into_iter()
                .fold(
                    Reporter::new(Arc::clone(context.counters()), config.report_interval),
                    Reporter::with_boxed_observer,
                )
                .spawn()
        });

        let result = accept_loop(&listener, &context, config.accept_errors).await;

        if let Some(handle) = reporter {
            handle.abort();
        }
        drop(listener);
        match &result {
            Ok(()) => info!(addr = %local_addr, "server stopped"),
            Err(e) => error!(addr = %local_addr, error = %e, "server failed"),
        }
        result
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

async fn accept_loop<L: Listener>(
    listener: &L,
    context: &Arc<ServerContext>,
    policy: AcceptErrorPolicy,
) -> Result<()> {
    let limiter = Arc::new(Semaphore::new(MAX_CONNECTIONS));
    let shutdown = context.shutdown();

    loop {
        let permit = tokio::select! {
            biased;
            _ = shutdown.listener_closing() => break,
            permit = Arc::clone(&limiter).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let accepted = tokio::select! {
            biased;
            _ = shutdown.listener_closing() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) if shutdown.is_fired() => {
                debug!(error = %e, "accept failed during shutdown");
                break;
            }
            Err(e) => match policy {
                AcceptErrorPolicy::FailFast => return Err(ServerError::Accept(e)),
                AcceptErrorPolicy::Continue => {
                    warn!(error = %e, "accept failed, retrying");
                    drop(permit);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };

        debug!(%peer, available = limiter.available_permits(), "connection accepted");
        let session = Session::new(stream, Arc::clone(context)).with_permit(permit);
        tokio::spawn(session.run().instrument(debug_span!("session", %peer)));
    }

    debug!("listener closed");
    Ok(())
}
