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

//! Seams to the metadata catalog and the node directory.
//!
//! The catalog's storage engine, schema, and snapshot mechanism are owned
//! elsewhere; this crate only consumes a paged snapshot scan and the alias
//! table through these traits.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::Result;
use crate::range::StreamRange;
use crate::types::{NodeAlias, NodeId, Segment, SegmentId};

/// One page request against the segment table at a fixed snapshot.
///
/// Rows are returned in primary-key order (`SegmentId` order), strictly
/// after `cursor` when one is set, limited to `limit` rows. An empty page
/// means the range is exhausted. Two scans with the same `as_of` observe
/// the same rows, regardless of concurrent writers.
#[derive(Debug, Clone)]
pub struct ListSegments {
    pub range: StreamRange,
    pub as_of: SystemTime,
    pub cursor: Option<SegmentId>,
    pub limit: usize,
}

/// Snapshot of the catalog's alias table: alias to full node identifier.
/// May be stale between fetches; the resolver refreshes it at most once
/// per miss.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: HashMap<NodeAlias, NodeId>,
}

impl AliasMap {
    pub fn new(entries: HashMap<NodeAlias, NodeId>) -> Self {
        Self { entries }
    }

    pub fn node(&self, alias: NodeAlias) -> Option<NodeId> {
        self.entries.get(&alias).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(NodeAlias, NodeId)> for AliasMap {
    fn from_iter<T: IntoIterator<Item = (NodeAlias, NodeId)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Read access to the segment catalog.
#[async_trait]
pub trait SegmentCatalog: Send + Sync {
    /// Stream one page of segment rows for a range at a snapshot.
    async fn list_segments(&self, query: &ListSegments) -> Result<Vec<Segment>>;

    /// Fetch the current complete alias table.
    async fn latest_alias_map(&self) -> Result<AliasMap>;
}

/// Address and advertised protocol version of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub address: String,
    pub version: String,
}

/// The node directory (overlay): node identifier to contact information.
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    async fn lookup(&self, node_id: NodeId) -> Result<NodeRecord>;
}
