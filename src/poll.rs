//! Off-loop fetch dispatch.
//!
//! Fetches run on spawned tasks and report back to the engine's control
//! loop as [`PollMsg`]s over an unbounded channel.  Nothing in here touches
//! engine state; the loop applies each message as one atomic step.
//!
//! ## For contributors
//!
//! An in-flight fetch is never cancelled.  If its source was deselected or
//! silenced in the meantime the engine simply discards the result, so a
//! late message is always safe to send.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::FetchError;
use crate::source::{FeedItem, Source, SourceFetcher, MAX_ITEMS_TO_FETCH};

pub type FetchResult = Result<Vec<FeedItem>, FetchError>;

/// Messages sent from fetch tasks to the control loop.
#[derive(Debug)]
pub enum PollMsg {
    /// A single source's timer-driven fetch finished.
    Fetched { source: Source, result: FetchResult },
    /// A full fetch cycle finished.  Sources that were not fetched are
    /// absent.
    FetchedAll(Vec<(Source, FetchResult)>),
}

/// One fetch to perform: the fetcher and the identities to ask for.
pub struct FetchJob {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub identities: Vec<String>,
}

impl FetchJob {
    async fn run(self) -> (Source, FetchResult) {
        let source = self.fetcher.source();
        debug!(%source, "fetching");
        let result = self.fetcher.fetch(&self.identities, MAX_ITEMS_TO_FETCH).await;
        (source, result)
    }
}

/// Fetch one source and report a [`PollMsg::Fetched`].
pub fn spawn_fetch(job: FetchJob, tx: mpsc::UnboundedSender<PollMsg>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (source, result) = job.run().await;
        // If the receiver is gone the engine has stopped; drop the result.
        let _ = tx.send(PollMsg::Fetched { source, result });
    })
}

/// Fetch every job concurrently, join, and report one [`PollMsg::FetchedAll`].
pub fn spawn_fetch_all(jobs: Vec<FetchJob>, tx: mpsc::UnboundedSender<PollMsg>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let results = join_all(jobs.into_iter().map(FetchJob::run)).await;
        let _ = tx.send(PollMsg::FetchedAll(results));
    })
}
