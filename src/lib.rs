//! # Numeri - Concurrent Number Deduplication Server
//!
//! A TCP server that accepts fixed-format numeric records from many
//! simultaneous clients, deduplicates them against a running set, and keeps
//! rolling and lifetime statistics.
//!
//! ## Protocol
//!
//! Every frame is exactly 10 bytes: a 9-byte payload followed by `\n`.
//!
//! ```text
//!   client                                   server
//!     │  "000000042\n"  ───────────────────►   │  first seen: log "42", count new
//!     │  ◄─────────────  "message received: 42\n"
//!     │  "000000042\n"  ───────────────────►   │  seen before: count duplicate, no reply
//!     │  "12a456789\n"  ───────────────────►   │  invalid: close this connection
//!     │  "terminate\n"  ───────────────────►   │  drain every session, close listener
//! ```
//!
//! Payloads are nine ASCII digits; a single `.` is tolerated anywhere in
//! the payload. Leading zeros are part of a record's identity and are only
//! stripped when the record is logged or acknowledged.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌─────────────────────────────────────────────┐
//!   clients ──►    │ Acceptor (max 5 open sockets)               │
//!                  │    │ spawns                                 │
//!                  │    ▼                                        │
//!                  │ Session ×N ──► DedupStore   (RwLock<HashSet>)│
//!                  │    │      ──► CounterSet   (atomics)        │
//!                  │    │      ──► RecordLog    (numbers.log)    │
//!                  │    │ terminate                              │
//!                  │    ▼                                        │
//!                  │ ShutdownCoordinator (signal + join barrier) │
//!                  │                                             │
//!                  │ Reporter ──every 10 s──► Observers          │
//!                  └─────────────────────────────────────────────┘
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | Acceptor and shared [`ServerContext`](server::ServerContext) |
//! | [`session`] | Per-connection read, validate, act, respond loop |
//! | [`protocol`] | Frames, record keys, validation, acknowledgements |
//! | [`dedup`] | Grow-only set of seen records |
//! | [`counters`] | `new`, `duplicate` and lifetime `total` counters |
//! | [`shutdown`] | One-shot signal plus join barrier |
//! | [`reporter`] | Periodic snapshot-and-reset of the counters |
//! | [`observers`] | Report sinks: text, table, JSON |
//! | [`record_log`] | Destination of the one-line-per-record log |
//! | [`client`] | Protocol client used by the load generator |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use numeri::config::ServerConfig;
//! use numeri::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> numeri::error::Result<()> {
//!     let server = Server::bind(ServerConfig::new()).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | `Serialize`/`Deserialize` for [`Report`](snapshot::Report) |
//! | `table` | Table observer using `tabled` |
//! | `json` | JSON observer using `serde_json` |
//! | `full` | All observers |
//! | `cli` | The `numeri_server` and `numeri_client` binaries (default) |

pub mod adapters;
pub mod client;
pub mod config;
pub mod counters;
pub mod dedup;
pub mod error;
pub mod observers;
pub mod protocol;
pub mod record_log;
pub mod reporter;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod snapshot;
