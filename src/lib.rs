//! # Botlog
//!
//! An asynchronous file log writer for game bots, plus the small map utilities bots lean on.
//!
//! It provides:
//! - [`LogWriter`](crate::log_writer::LogWriter): producers append text entries without
//!   waiting on disk, a background thread writes them in order, and nothing queued is lost on
//!   shutdown
//! - [`LogHandle`](crate::log_handle::LogHandle): a cloneable producer handle, usable as a
//!   `tracing-subscriber` writer
//! - [`init_logger`](crate::logger::init_logger): sends `tracing` events to a timestamped
//!   file through a `LogWriter`
//! - Map geometry ([`geometry`]) and caller-owned random sampling ([`random`])
//!
//! Game callbacks typically run on several threads (networking, simulation). Any of them may
//! log, and the file is only ever touched by the writer's own thread.
//!
//! # Documentation Overview
//!
//! - For the writer lifecycle and its shutdown guarantee, see the [`log_writer`] module.
//! - For open mode, queue capacity, overflow and retry policies, see
//!   [`WriterConfigBuilder`](crate::configuration::WriterConfigBuilder).
//! - For what happened to appended entries, see [`WriterStats`](crate::stats::WriterStats).
//!
//! # Usage Example
//!
//! ```no_run
//! use std::time::Duration;
//! use botlog::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = WriterConfigBuilder::new()
//!         .with_open_mode(OpenMode::Append)
//!         .with_capacity(10_000)
//!         .with_overflow(OverflowPolicy::Block(Duration::from_millis(5)))
//!         .build()?;
//!
//!     let mut log = LogWriter::with_config("bot.log", config)?;
//!
//!     let mut rng = RandomGenerator::from_seed(7);
//!     let rally = rng.point_in(Point2D::new(0.0, 0.0), Point2D::new(128.0, 128.0));
//!     log.append(format!("rallying at {rally:?}\n"));
//!
//!     let stats = log.shutdown();
//!     println!("{} written, {} lost", stats.written, stats.lost());
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;
pub mod configuration;
pub mod geometry;
pub mod log_handle;
pub mod log_writer;
pub mod logger;
mod pending_queue;
pub mod random;
mod sink;
pub mod stats;

/// Commonly used types for quick access.
///
/// ```rust
/// use botlog::prelude::*;
/// ```
pub mod prelude {
    pub use crate::configuration::{
        DrainMode, OpenMode, OverflowPolicy, WriterConfig, WriterConfigBuilder,
    };
    pub use crate::geometry::{Point2D, Point2DI, Point3D};
    pub use crate::log_handle::LogHandle;
    pub use crate::log_writer::LogWriter;
    pub use crate::random::RandomGenerator;
    pub use crate::stats::WriterStats;
}
