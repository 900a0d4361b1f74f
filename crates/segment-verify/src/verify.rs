// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::batch::create_batches;
use crate::catalog::{NodeDirectory, SegmentCatalog};
use crate::check::PieceChecker;
use crate::error::{Error, Result};
use crate::health::NodeHealthTracker;
use crate::node::NodeAliasResolver;
use crate::types::{Batch, NodeAlias, Segment};

/// Tunables for one verification run.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Pieces to confirm per segment. Zero means verify every piece, with
    /// the retry pass disabled.
    pub check: usize,
    /// Offline strikes before a partially-responsive node is marked
    /// offline. Zero disables the threshold.
    pub max_offline: u32,
    /// Maximum concurrent per-node batch checks.
    pub concurrency: usize,
    /// Segments per scan batch.
    pub batch_size: usize,
    /// Sub-ranges to scan in parallel.
    pub n_ranges: u32,
    /// Trusted nodes exempt from per-node throttling; they are checked in
    /// pass one only.
    pub priority_nodes: HashSet<NodeAlias>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            check: 3,
            max_offline: 2,
            concurrency: 1000,
            batch_size: 10_000,
            n_ranges: 16,
            priority_nodes: HashSet::new(),
        }
    }
}

/// Drives batched per-node verification for one scan range.
///
/// Holds the per-run alias cache; construct a fresh verifier per run when
/// freshness matters. The health tracker is shared process-wide across all
/// verifiers of a scan.
pub struct SegmentVerifier {
    config: VerifyConfig,
    resolver: Mutex<NodeAliasResolver>,
    checker: Arc<dyn PieceChecker>,
    health: Arc<NodeHealthTracker>,
}

impl SegmentVerifier {
    pub fn new(
        config: VerifyConfig,
        catalog: Arc<dyn SegmentCatalog>,
        directory: Arc<dyn NodeDirectory>,
        checker: Arc<dyn PieceChecker>,
        health: Arc<NodeHealthTracker>,
    ) -> Self {
        Self {
            config,
            resolver: Mutex::new(NodeAliasResolver::new(catalog, directory)),
            checker,
            health,
        }
    }

    /// Verify a collection of segments, in at most two passes.
    ///
    /// Pass one checks pieces in catalog order. Segments whose check budget
    /// is still unspent are retried exactly once, against a derived piece
    /// list: reversed so the second pass samples previously-unsampled nodes
    /// first, and with priority nodes stripped since re-checking them buys
    /// no new information. Segments still unspent after pass two are left
    /// unresolved, visible through their status; bounding worst-case run
    /// latency takes precedence over chasing them further.
    pub async fn verify(&self, cancel: &CancellationToken, segments: &[Segment]) -> Result<()> {
        for segment in segments {
            let budget = if self.config.check == 0 {
                segment.alias_pieces.len()
            } else {
                self.config.check
            };
            segment.status.set_retry(budget as i32);
        }

        let batches = create_batches(segments);
        self.verify_batches(cancel, batches).await?;

        let retry_segments: Vec<&Segment> = segments.iter().filter(|s| s.status.retry() > 0).collect();
        if retry_segments.is_empty() || self.config.check == 0 {
            return Ok(());
        }

        debug!(segments = retry_segments.len(), "retrying unresolved segments");
        let derived: Vec<Segment> = retry_segments.iter().map(|s| self.retry_segment(s)).collect();
        let retry_batches = create_batches(&derived);
        self.verify_batches(cancel, retry_batches).await?;

        Ok(())
    }

    /// New piece list for the retry pass; the shared status `Arc` keeps
    /// both passes' outcomes on one set of counters.
    fn retry_segment(&self, segment: &Segment) -> Segment {
        let alias_pieces = segment
            .alias_pieces
            .iter()
            .rev()
            .filter(|piece| !self.config.priority_nodes.contains(&piece.alias))
            .copied()
            .collect();
        Segment {
            id: segment.id,
            alias_pieces,
            status: segment.status.clone(),
        }
    }

    /// Fan batches out to their nodes, bounded by the configured
    /// concurrency; blocks until every spawned check joins.
    ///
    /// Node-offline failures feed the health tracker; any other check
    /// failure is logged and contained, leaving the affected segments
    /// retry-eligible. Only alias resolution failure escapes, before any
    /// network call touches that batch's node.
    pub async fn verify_batches(&self, cancel: &CancellationToken, batches: Vec<Batch>) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<()> = JoinSet::new();

        let spawned: Result<()> = async {
            for batch in batches {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let info = self.resolver.lock().await.resolve(batch.alias).await?;
                let ignore_throttle = self.config.priority_nodes.contains(&batch.alias);

                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Other("concurrency limiter closed".into()))?;
                let checker = self.checker.clone();
                let health = self.health.clone();
                let max_offline = self.config.max_offline;

                tasks.spawn(async move {
                    let _permit = permit;
                    match checker.check_pieces(batch.alias, &info, &batch.items, ignore_throttle).await {
                        Ok(confirmed) => {
                            debug!(alias = %batch.alias, pieces = batch.items.len(), confirmed, "verified batch");
                            health.record_success(batch.alias);
                        }
                        Err(err) if err.is_offline() => {
                            warn!(alias = %batch.alias, "node offline while verifying batch: {err}");
                            health.record_offline(batch.alias, err.confirmed(), max_offline);
                        }
                        Err(err) => {
                            error!(alias = %batch.alias, "verifying a batch failed: {err}");
                        }
                    }
                });
            }
            Ok(())
        }
        .await;

        if let Err(err) = spawned {
            tasks.shutdown().await;
            return Err(err);
        }
        while let Some(joined) = tasks.join_next().await {
            joined?;
        }
        Ok(())
    }
}
