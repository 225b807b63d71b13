//! Live match scraping: discovery, per-match workers and their
//! supervision.
//!
//! The flow is one directed loop. [`DiscoveryService`] renders the
//! source site's listing page, diffs the live links against the
//! persisted snapshot and asks the [`WorkerSupervisor`] to reconcile:
//! a [`MatchWorker`] is started per added match and stopped per removed
//! one. Each worker extracts the tracked field classes every poll
//! interval, suppresses unchanged values through [`ChangeFilter`]s and
//! delivers the rest to the collector service.

#![warn(clippy::all)]

mod diff;
mod discovery;
mod error;
mod extract;
mod filter;
mod supervisor;
#[cfg(test)]
mod testutil;
mod worker;

pub use diff::{diff, SnapshotDiff};
pub use discovery::DiscoveryService;
pub use error::{Result, ScrapeError};
pub use extract::{LimitedOversOdds, OverSummary, SessionOdds, SessionOddsEntry, TeamOdds, TeamScore};
pub use filter::ChangeFilter;
pub use supervisor::{WorkerStatus, WorkerSupervisor};
pub use worker::{LiveMatchWorker, MatchObserver, MatchWorker};
