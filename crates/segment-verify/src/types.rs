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

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Full node identifier, as stored in the node directory.
pub type NodeId = Uuid;

/// Compact integer standing in for a full node identifier inside the
/// catalog, to keep per-segment piece lists small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAlias(pub u32);

impl fmt::Display for NodeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a segment within its object stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentPosition {
    pub part: u32,
    pub index: u32,
}

impl SegmentPosition {
    pub fn new(part: u32, index: u32) -> Self {
        Self { part, index }
    }

    /// Encode into the packed u64 form the catalog keys segments by.
    pub fn encode(self) -> u64 {
        ((self.part as u64) << 32) | self.index as u64
    }

    pub fn decode(value: u64) -> Self {
        Self {
            part: (value >> 32) as u32,
            index: value as u32,
        }
    }
}

/// Stable identifier of one segment: owning stream plus position.
///
/// Orders the same way the catalog's primary key does (stream id first,
/// packed position second), which the paged scan cursor relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId {
    pub stream_id: Uuid,
    pub position: SegmentPosition,
}

impl SegmentId {
    pub fn new(stream_id: Uuid, position: SegmentPosition) -> Self {
        Self { stream_id, position }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stream_id, self.position.encode())
    }
}

/// One physical copy of a segment on one node: (node alias, piece number).
/// Immutable once read from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasPiece {
    pub alias: NodeAlias,
    pub piece_num: u16,
}

impl AliasPiece {
    pub fn new(alias: NodeAlias, piece_num: u16) -> Self {
        Self { alias, piece_num }
    }
}

/// Mutable verification state of one segment during a run.
///
/// Pieces of one segment live on many nodes and are checked by concurrent
/// batch tasks, so every counter is atomic. `retry` is the remaining check
/// budget: it is seeded once at the start of a pass and consumed by every
/// definite per-piece answer; a segment whose budget never reaches zero is
/// reported as unresolved.
#[derive(Debug, Default)]
pub struct SegmentStatus {
    retry: AtomicI32,
    found: AtomicI32,
    not_found: AtomicI32,
}

impl SegmentStatus {
    pub fn set_retry(&self, n: i32) {
        self.retry.store(n, Ordering::SeqCst);
    }

    pub fn retry(&self) -> i32 {
        self.retry.load(Ordering::SeqCst)
    }

    pub fn found(&self) -> i32 {
        self.found.load(Ordering::SeqCst)
    }

    pub fn not_found(&self) -> i32 {
        self.not_found.load(Ordering::SeqCst)
    }

    /// The piece exists on its node; consumes one unit of check budget.
    pub fn mark_found(&self) {
        self.found.fetch_add(1, Ordering::SeqCst);
        self.retry.fetch_sub(1, Ordering::SeqCst);
    }

    /// The node answered definitively that the piece is gone; also consumes
    /// budget, the loss is visible through `not_found` afterwards.
    pub fn mark_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::SeqCst);
        self.retry.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Read-only snapshot of one catalog segment row for the duration of a run.
///
/// The piece list is never mutated in place: the retry pass derives a new
/// list (reversed, priority nodes stripped) that shares the same status via
/// the `Arc`, so outcomes from either pass land on one set of counters.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub alias_pieces: Vec<AliasPiece>,
    pub status: Arc<SegmentStatus>,
}

impl Segment {
    pub fn new(id: SegmentId, alias_pieces: Vec<AliasPiece>) -> Self {
        Self {
            id,
            alias_pieces,
            status: Arc::new(SegmentStatus::default()),
        }
    }
}

/// One piece check destined for a single node, carrying a handle to its
/// segment's status so the piece-check primitive can record the outcome.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub segment_id: SegmentId,
    pub piece_num: u16,
    pub status: Arc<SegmentStatus>,
}

/// All pieces to verify against one node in one pass. Assembled fresh per
/// pass, never persisted.
#[derive(Debug, Clone)]
pub struct Batch {
    pub alias: NodeAlias,
    pub items: Vec<BatchItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Network address of a node, paired with its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUrl {
    pub id: NodeId,
    pub address: String,
}

/// Cached (address, protocol version) for one alias; populated on first
/// use, valid for the lifetime of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub node_url: NodeUrl,
    pub version: String,
}
