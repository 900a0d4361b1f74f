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

//! In-memory collaborators shared by the module tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{AliasMap, ListSegments, NodeDirectory, NodeRecord, SegmentCatalog};
use crate::check::{CheckError, PieceChecker};
use crate::error::{Error, Result};
use crate::types::{AliasPiece, BatchItem, NodeAlias, NodeId, NodeInfo, Segment, SegmentId, SegmentPosition};

pub(crate) fn make_segment(stream: u128, pieces: &[(u32, u16)]) -> Segment {
    Segment::new(
        SegmentId::new(Uuid::from_u128(stream), SegmentPosition::default()),
        pieces.iter().map(|&(alias, num)| AliasPiece::new(NodeAlias(alias), num)).collect(),
    )
}

/// Segment catalog backed by a sorted in-memory vector, with call counters
/// for cache behavior assertions.
pub(crate) struct MemoryCatalog {
    segments: Vec<Segment>,
    aliases: Mutex<HashMap<NodeAlias, NodeId>>,
    alias_fetches: AtomicUsize,
    pages_served: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new(mut segments: Vec<Segment>) -> Self {
        segments.sort_by_key(|s| s.id);
        Self {
            segments,
            aliases: Mutex::new(HashMap::new()),
            alias_fetches: AtomicUsize::new(0),
            pages_served: AtomicUsize::new(0),
        }
    }

    pub fn with_alias(self, alias: NodeAlias, node_id: NodeId) -> Self {
        self.insert_alias(alias, node_id);
        self
    }

    pub fn insert_alias(&self, alias: NodeAlias, node_id: NodeId) {
        self.aliases.lock().unwrap().insert(alias, node_id);
    }

    pub fn alias_map_fetches(&self) -> usize {
        self.alias_fetches.load(Ordering::SeqCst)
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentCatalog for MemoryCatalog {
    async fn list_segments(&self, query: &ListSegments) -> Result<Vec<Segment>> {
        self.pages_served.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .segments
            .iter()
            .filter(|s| query.range.contains(&s.id.stream_id))
            .filter(|s| query.cursor.map_or(true, |cursor| s.id > cursor))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn latest_alias_map(&self) -> Result<AliasMap> {
        self.alias_fetches.fetch_add(1, Ordering::SeqCst);
        let aliases = self.aliases.lock().unwrap().clone();
        Ok(aliases.into_iter().collect())
    }
}

/// Node directory over a fixed set of records.
#[derive(Default)]
pub(crate) struct StaticDirectory {
    records: Mutex<HashMap<NodeId, NodeRecord>>,
    lookups: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, node_id: NodeId, address: &str, version: &str) -> Self {
        self.records.lock().unwrap().insert(
            node_id,
            NodeRecord {
                address: address.to_string(),
                version: version.to_string(),
            },
        );
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeDirectory for StaticDirectory {
    async fn lookup(&self, node_id: NodeId) -> Result<NodeRecord> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .get(&node_id)
            .cloned()
            .ok_or_else(|| Error::NodeDirectory(format!("node {node_id} not found")))
    }
}

/// Piece checker with scripted node behavior: a node either answers nothing
/// (offline), or answers every still-budgeted item, reporting configured
/// missing pieces as not found.
#[derive(Default)]
pub(crate) struct ScriptedChecker {
    offline: HashSet<NodeAlias>,
    missing: HashSet<(SegmentId, u16)>,
    calls: Mutex<Vec<(NodeAlias, usize, bool)>>,
}

impl ScriptedChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline_node(mut self, alias: NodeAlias) -> Self {
        self.offline.insert(alias);
        self
    }

    pub fn missing_piece(mut self, segment_id: SegmentId, piece_num: u16) -> Self {
        self.missing.insert((segment_id, piece_num));
        self
    }

    /// Every `check_pieces` call as (alias, item count, ignore_throttle).
    pub fn calls(&self) -> Vec<(NodeAlias, usize, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, alias: NodeAlias) -> usize {
        self.calls.lock().unwrap().iter().filter(|(a, _, _)| *a == alias).count()
    }
}

#[async_trait]
impl PieceChecker for ScriptedChecker {
    async fn check_pieces(
        &self,
        alias: NodeAlias,
        _node: &NodeInfo,
        items: &[BatchItem],
        ignore_throttle: bool,
    ) -> std::result::Result<usize, CheckError> {
        self.calls.lock().unwrap().push((alias, items.len(), ignore_throttle));

        if self.offline.contains(&alias) {
            return Err(CheckError::NodeOffline { confirmed: 0 });
        }

        let mut confirmed = 0;
        for item in items {
            if item.status.retry() <= 0 {
                continue;
            }
            if self.missing.contains(&(item.segment_id, item.piece_num)) {
                item.status.mark_not_found();
            } else {
                item.status.mark_found();
                confirmed += 1;
            }
        }
        Ok(confirmed)
    }
}
