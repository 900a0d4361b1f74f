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

use crate::types::{Batch, BatchItem, NodeAlias, Segment};

/// Group every alias-piece across the input segments into one batch per
/// owning node.
///
/// Batch order is first-occurrence order of each alias; item order within a
/// batch is input traversal order. Nothing is deduplicated: a segment that
/// lists the same alias twice contributes two items.
pub fn create_batches(segments: &[Segment]) -> Vec<Batch> {
    let mut order: Vec<NodeAlias> = Vec::new();
    let mut by_alias: HashMap<NodeAlias, Vec<BatchItem>> = HashMap::new();

    for segment in segments {
        for piece in &segment.alias_pieces {
            let items = by_alias.entry(piece.alias).or_insert_with(|| {
                order.push(piece.alias);
                Vec::new()
            });
            items.push(BatchItem {
                segment_id: segment.id,
                piece_num: piece.piece_num,
                status: segment.status.clone(),
            });
        }
    }

    order
        .into_iter()
        .map(|alias| Batch {
            alias,
            items: by_alias.remove(&alias).unwrap_or_default(),
        })
        .collect()
}
