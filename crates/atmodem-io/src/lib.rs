//! Line engine for AT-command modems.
//!
//! One tokio task owns the transport exclusively. It frames the modem's byte
//! stream into lines, separates unsolicited result codes from command
//! responses, and feeds two bounded channels that callers drain with
//! explicit timeouts. Request/response exchanges are built on top of the
//! response channel.
//!
//! # Architecture
//!
//! - [`framer`] -- CR/LF and prompt framing with an overflow bound
//! - [`classify`] -- async/sync classification and observer callbacks
//! - [`dispatch`] -- bounded line channels and backpressure policy
//! - [`matcher`] -- end-of-response criteria
//! - [`session`] -- deadline-bounded response collection
//! - [`config`] -- [`ModemConfig`] and its validation
//! - [`io`] -- IO task types, spawn, and the select loop

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod framer;
pub mod io;
pub mod matcher;
pub mod session;

pub use classify::{AsyncObserver, Classification, ObserverSet};
pub use config::ModemConfig;
pub use dispatch::{Backpressure, LineQueue};
pub use io::{IoStats, ModemIo, spawn_io_task};
pub use matcher::{EndCriteria, EndCriterion, EndMatch};
pub use session::{Completion, Response};
