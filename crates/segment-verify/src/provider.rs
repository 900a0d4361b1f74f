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

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalog::{ListSegments, SegmentCatalog};
use crate::error::{Error, Result};
use crate::range::{create_stream_ranges, StreamRange};
use crate::types::{Segment, SegmentId};

/// Streams one sub-range of the segment table at a fixed snapshot.
///
/// The `as_of` timestamp is bound at construction, so all sub-range
/// providers of one scan pass observe a mutually consistent view of the
/// catalog even though they scan concurrently against live writers.
/// Iteration is finite and restartable: a fresh provider over the same
/// range starts again from the top at its own snapshot.
pub struct SegmentProvider {
    catalog: Arc<dyn SegmentCatalog>,
    range: StreamRange,
    as_of: SystemTime,
    batch_size: usize,
}

impl SegmentProvider {
    pub fn new(catalog: Arc<dyn SegmentCatalog>, range: StreamRange, as_of: SystemTime, batch_size: usize) -> Self {
        Self {
            catalog,
            range,
            as_of,
            batch_size: batch_size.max(1),
        }
    }

    pub fn range(&self) -> &StreamRange {
        &self.range
    }

    /// Stream the range in key order, delivering batches of at most
    /// `batch_size` segments to `on_batch`, plus a trailing partial batch.
    ///
    /// An `on_batch` error or run cancellation aborts immediately; no batch
    /// is delivered twice. Cancellation is checked at every row boundary.
    pub async fn iterate<F, Fut>(&self, cancel: &CancellationToken, mut on_batch: F) -> Result<()>
    where
        F: FnMut(Vec<Segment>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut cursor: Option<SegmentId> = None;
        let mut pending: Vec<Segment> = Vec::with_capacity(self.batch_size);
        let mut total = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let page = self
                .catalog
                .list_segments(&ListSegments {
                    range: self.range,
                    as_of: self.as_of,
                    cursor,
                    limit: self.batch_size,
                })
                .await?;
            if page.is_empty() {
                break;
            }
            cursor = page.last().map(|segment| segment.id);
            total += page.len();

            for segment in page {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                pending.push(segment);
                if pending.len() >= self.batch_size {
                    let batch = std::mem::replace(&mut pending, Vec::with_capacity(self.batch_size));
                    on_batch(batch).await?;
                }
            }
        }

        if !pending.is_empty() {
            on_batch(std::mem::take(&mut pending)).await?;
        }

        debug!(range = ?self.range, segments = total, "finished scanning range");
        Ok(())
    }
}

/// Split the key space into `n_ranges` providers sharing a single `as_of`
/// snapshot, one scan pass' worth of work.
pub fn create_providers(catalog: Arc<dyn SegmentCatalog>, n_ranges: u32, batch_size: usize) -> Result<Vec<SegmentProvider>> {
    let as_of = SystemTime::now();
    let ranges = create_stream_ranges(n_ranges)?;
    Ok(ranges
        .into_iter()
        .map(|range| SegmentProvider::new(catalog.clone(), range, as_of, batch_size))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_segment, MemoryCatalog};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn catalog_with(n: usize) -> Arc<MemoryCatalog> {
        let segments = (0..n).map(|i| make_segment(i as u128 + 1, &[(1, 0)])).collect();
        Arc::new(MemoryCatalog::new(segments))
    }

    async fn collect_batches(provider: &SegmentProvider) -> Vec<Vec<Segment>> {
        let collected = Mutex::new(Vec::new());
        provider
            .iterate(&CancellationToken::new(), |batch| {
                collected.lock().unwrap().push(batch);
                async { Ok(()) }
            })
            .await
            .unwrap();
        collected.into_inner().unwrap()
    }

    #[tokio::test]
    async fn test_batches_full_then_trailing_partial() {
        let provider = SegmentProvider::new(catalog_with(7), StreamRange::full(), SystemTime::now(), 3);
        let batches = collect_batches(&provider).await;

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        // Key order across batch boundaries.
        let ids: Vec<SegmentId> = batches.iter().flatten().map(|s| s.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_empty_range_delivers_no_batches() {
        let catalog = catalog_with(0);
        let provider = SegmentProvider::new(catalog.clone(), StreamRange::full(), SystemTime::now(), 3);
        assert!(collect_batches(&provider).await.is_empty());
        assert_eq!(catalog.pages_served(), 1, "one empty page ends the scan");
    }

    #[tokio::test]
    async fn test_on_batch_error_aborts_iteration() {
        let catalog = catalog_with(9);
        let provider = SegmentProvider::new(catalog, StreamRange::full(), SystemTime::now(), 3);

        let delivered = Mutex::new(0usize);
        let err = provider
            .iterate(&CancellationToken::new(), |_batch| {
                *delivered.lock().unwrap() += 1;
                async { Err(Error::Other("stop".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(*delivered.lock().unwrap(), 1, "no batch after the failing one");
    }

    #[tokio::test]
    async fn test_cancellation_aborts_before_next_batch() {
        let provider = SegmentProvider::new(catalog_with(9), StreamRange::full(), SystemTime::now(), 3);

        let cancel = CancellationToken::new();
        let inner = cancel.clone();
        let err = provider
            .iterate(&cancel, move |_batch| {
                inner.cancel();
                async { Ok(()) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_disjoint_ranges_partition_the_snapshot() {
        let catalog = catalog_with(50);
        let providers = create_providers(catalog.clone(), 4, 8).unwrap();
        assert_eq!(providers.len(), 4);

        let mut seen: HashSet<Uuid> = HashSet::new();
        for provider in &providers {
            for batch in collect_batches(provider).await {
                for segment in batch {
                    assert!(seen.insert(segment.id.stream_id), "segment seen in two ranges");
                }
            }
        }
        assert_eq!(seen.len(), 50, "union of ranges covers the snapshot");
    }

    #[tokio::test]
    async fn test_restart_with_fresh_provider_starts_from_the_top() {
        let catalog = catalog_with(5);
        let first = SegmentProvider::new(catalog.clone(), StreamRange::full(), SystemTime::now(), 2);
        let second = SegmentProvider::new(catalog, StreamRange::full(), SystemTime::now(), 2);

        let a: Vec<SegmentId> = collect_batches(&first).await.into_iter().flatten().map(|s| s.id).collect();
        let b: Vec<SegmentId> = collect_batches(&second).await.into_iter().flatten().map(|s| s.id).collect();
        assert_eq!(a, b);
    }
}
