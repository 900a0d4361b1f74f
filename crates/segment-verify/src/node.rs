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

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{AliasMap, NodeDirectory, SegmentCatalog};
use crate::error::{Error, Result};
use crate::types::{NodeAlias, NodeInfo, NodeUrl};

/// Maps compact node aliases to full node contact information, memoized for
/// the lifetime of one orchestrator.
///
/// Miss path: local alias table lookup, then exactly one alias table
/// refresh from the catalog per miss (never a refresh per call, to bound
/// catalog load), then a node directory lookup for address and version.
/// Entries never expire within a run; a caller that needs freshness
/// constructs a new orchestrator.
pub struct NodeAliasResolver {
    catalog: Arc<dyn SegmentCatalog>,
    directory: Arc<dyn NodeDirectory>,
    alias_map: AliasMap,
    node_info: HashMap<NodeAlias, NodeInfo>,
}

impl NodeAliasResolver {
    pub fn new(catalog: Arc<dyn SegmentCatalog>, directory: Arc<dyn NodeDirectory>) -> Self {
        Self {
            catalog,
            directory,
            alias_map: AliasMap::default(),
            node_info: HashMap::new(),
        }
    }

    /// Resolve an alias to cached node info.
    ///
    /// Failure here means the catalog's alias table itself is inconsistent
    /// and is fatal for the containing run, not retryable at this layer.
    pub async fn resolve(&mut self, alias: NodeAlias) -> Result<NodeInfo> {
        if let Some(info) = self.node_info.get(&alias) {
            return Ok(info.clone());
        }

        let node_id = match self.alias_map.node(alias) {
            Some(node_id) => node_id,
            None => {
                let latest = self.catalog.latest_alias_map().await?;
                debug!(alias = %alias, entries = latest.len(), "refreshed alias table on miss");
                self.alias_map = latest;
                self.alias_map.node(alias).ok_or(Error::AliasNotFound(alias))?
            }
        };

        let record = self.directory.lookup(node_id).await?;
        let info = NodeInfo {
            node_url: NodeUrl {
                id: node_id,
                address: record.address,
            },
            version: record.version,
        };
        self.node_info.insert(alias, info.clone());
        Ok(info)
    }
}
