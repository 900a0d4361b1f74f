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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::{NodeDirectory, SegmentCatalog};
use crate::check::PieceChecker;
use crate::error::Result;
use crate::health::NodeHealthTracker;
use crate::provider::create_providers;
use crate::types::{NodeAlias, Segment, SegmentId};
use crate::verify::{SegmentVerifier, VerifyConfig};

/// Aggregate outcome of one whole-catalog scan, for the external
/// health/reputation sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Segments scanned across all ranges.
    pub segments: u64,
    /// Segments whose check budget was still unspent after both passes.
    pub unresolved_segments: Vec<SegmentId>,
    /// Definite "piece is gone" answers received from nodes.
    pub not_found_pieces: u64,
    /// Nodes marked offline during the scan.
    pub offline_nodes: Vec<NodeAlias>,
}

#[derive(Default)]
struct ScanTotals {
    segments: AtomicU64,
    not_found: AtomicU64,
    unresolved: Mutex<Vec<SegmentId>>,
}

impl ScanTotals {
    fn observe(&self, segments: &[Segment]) {
        self.segments.fetch_add(segments.len() as u64, Ordering::SeqCst);
        for segment in segments {
            self.not_found.fetch_add(segment.status.not_found().max(0) as u64, Ordering::SeqCst);
            if segment.status.retry() > 0 {
                self.unresolved
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(segment.id);
            }
        }
    }
}

/// Drives one verification run over the whole catalog: splits the key
/// space, scans the sub-ranges in parallel against a single snapshot, and
/// verifies each delivered batch.
///
/// Each range gets a fresh `SegmentVerifier` so alias caches are scoped to
/// the run, while node health is shared process-wide.
pub struct ScanRunner {
    config: VerifyConfig,
    catalog: Arc<dyn SegmentCatalog>,
    directory: Arc<dyn NodeDirectory>,
    checker: Arc<dyn PieceChecker>,
    health: Arc<NodeHealthTracker>,
}

impl ScanRunner {
    pub fn new(
        config: VerifyConfig,
        catalog: Arc<dyn SegmentCatalog>,
        directory: Arc<dyn NodeDirectory>,
        checker: Arc<dyn PieceChecker>,
        health: Arc<NodeHealthTracker>,
    ) -> Self {
        Self {
            config,
            catalog,
            directory,
            checker,
            health,
        }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<VerifyReport> {
        let providers = create_providers(self.catalog.clone(), self.config.n_ranges, self.config.batch_size)?;
        let totals = Arc::new(ScanTotals::default());
        let mut ranges: JoinSet<Result<()>> = JoinSet::new();

        for provider in providers {
            let verifier = SegmentVerifier::new(
                self.config.clone(),
                self.catalog.clone(),
                self.directory.clone(),
                self.checker.clone(),
                self.health.clone(),
            );
            let totals = totals.clone();
            let cancel = cancel.clone();
            ranges.spawn(async move {
                let verifier = &verifier;
                let totals = &totals;
                let cancel = &cancel;
                provider
                    .iterate(cancel, |segments| async move {
                        verifier.verify(cancel, &segments).await?;
                        totals.observe(&segments);
                        Ok(())
                    })
                    .await
            });
        }

        while let Some(joined) = ranges.join_next().await {
            if let Err(err) = joined? {
                ranges.shutdown().await;
                return Err(err);
            }
        }

        let mut unresolved = std::mem::take(&mut *totals.unresolved.lock().unwrap_or_else(PoisonError::into_inner));
        unresolved.sort();

        let report = VerifyReport {
            segments: totals.segments.load(Ordering::SeqCst),
            unresolved_segments: unresolved,
            not_found_pieces: totals.not_found.load(Ordering::SeqCst),
            offline_nodes: self.health.offline_nodes(),
        };
        info!(
            segments = report.segments,
            unresolved = report.unresolved_segments.len(),
            not_found = report.not_found_pieces,
            offline = report.offline_nodes.len(),
            "verification scan finished"
        );
        Ok(report)
    }
}
