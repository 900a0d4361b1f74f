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

//! Continuous verification that erasure-coded segment pieces still exist on
//! the storage nodes the metadata catalog says they do.
//!
//! The catalog's key space is split into disjoint stream id ranges scanned
//! in parallel against one consistent snapshot. For every batch of segments
//! the pieces to check are grouped by owning node, fanned out under a
//! bounded concurrency limit, and unresolved segments get exactly one
//! bounded retry with a reversed, priority-filtered piece list. Outcomes
//! feed a process-wide node health record that distinguishes "this node is
//! unreachable" from "this one piece check failed".
//!
//! This crate detects and reports; repairing pieces, redundancy thresholds,
//! and node disqualification policy live elsewhere. The catalog, the node
//! directory, and the per-piece wire check are consumed through the
//! `SegmentCatalog`, `NodeDirectory`, and `PieceChecker` traits.

mod batch;
mod catalog;
mod check;
mod error;
mod health;
mod node;
mod provider;
mod range;
mod scan;
mod types;
mod verify;

#[cfg(test)]
pub(crate) mod testutil;

pub use batch::create_batches;
pub use catalog::{AliasMap, ListSegments, NodeDirectory, NodeRecord, SegmentCatalog};
pub use check::{CheckError, PieceChecker};
pub use error::{Error, Result};
pub use health::NodeHealthTracker;
pub use node::NodeAliasResolver;
pub use provider::{create_providers, SegmentProvider};
pub use range::{create_stream_ranges, StreamRange};
pub use scan::{ScanRunner, VerifyReport};
pub use types::{
    AliasPiece, Batch, BatchItem, NodeAlias, NodeId, NodeInfo, NodeUrl, Segment, SegmentId, SegmentPosition, SegmentStatus,
};
pub use verify::{SegmentVerifier, VerifyConfig};
