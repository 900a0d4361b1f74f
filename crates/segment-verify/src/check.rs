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

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BatchItem, NodeAlias, NodeInfo};

/// Failure of one batch's piece checks against one node.
///
/// Both variants carry the number of pieces already confirmed before the
/// failure: a node that answered nothing is treated very differently from
/// one that answered partially (see `NodeHealthTracker`).
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("node offline ({confirmed} pieces confirmed before failure)")]
    NodeOffline { confirmed: usize },

    #[error("piece check failed ({confirmed} pieces confirmed): {reason}")]
    Failed { confirmed: usize, reason: String },
}

impl CheckError {
    pub fn confirmed(&self) -> usize {
        match self {
            CheckError::NodeOffline { confirmed } => *confirmed,
            CheckError::Failed { confirmed, .. } => *confirmed,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, CheckError::NodeOffline { .. })
    }
}

/// The external per-piece verification primitive.
///
/// Implementations own the wire protocol, per-node request throttling, and
/// their own network timeouts; no call may block indefinitely. For every
/// definite per-piece answer the implementation records the outcome on the
/// item's segment status (`mark_found` / `mark_not_found`); pieces the node
/// never answered for are left untouched so they stay retry-eligible.
/// Implementations skip items whose segment budget is already spent, so a
/// batch assembled before other nodes answered does not over-sample.
#[async_trait]
pub trait PieceChecker: Send + Sync {
    /// Check every item against the node, returning how many pieces were
    /// confirmed present. `ignore_throttle` bypasses per-node throttling
    /// for priority nodes.
    async fn check_pieces(
        &self,
        alias: NodeAlias,
        node: &NodeInfo,
        items: &[BatchItem],
        ignore_throttle: bool,
    ) -> Result<usize, CheckError>;
}
