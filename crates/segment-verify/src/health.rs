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

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::types::NodeAlias;

#[derive(Debug, Default)]
struct HealthState {
    offline: HashSet<NodeAlias>,
    strikes: HashMap<NodeAlias, u32>,
}

/// Process-wide record of which nodes are currently considered reachable.
///
/// Every node is online until proven otherwise. The single mutex is held
/// only for the read-modify-write of a counter or set membership, never
/// across an await point or a network call; concurrent batch tasks feed it
/// through the orchestrator's reconciliation calls.
///
/// The policy is deliberately asymmetric: strikes grow on partial failure
/// and shrink by one on any full success. Gradual trust recovery avoids
/// oscillating a flaky node in and out of the online set on a single lucky
/// batch.
#[derive(Debug, Default)]
pub struct NodeHealthTracker {
    state: Mutex<HealthState>,
}

impl NodeHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile an offline-class batch failure.
    ///
    /// A node that confirmed zero pieces is marked offline immediately.
    /// A node that answered some requests but not all collects a strike and
    /// only goes offline once strikes reach `max_offline`; `max_offline` of
    /// zero disables the threshold, so partially-responsive nodes are never
    /// excluded.
    pub fn record_offline(&self, alias: NodeAlias, confirmed: usize, max_offline: u32) {
        let mut state = self.lock();
        if confirmed == 0 {
            state.offline.insert(alias);
            return;
        }
        let strikes = state.strikes.entry(alias).or_insert(0);
        *strikes += 1;
        if max_offline > 0 && *strikes >= max_offline {
            state.offline.insert(alias);
        }
    }

    /// Reconcile a batch that completed without an offline error: decrement
    /// accumulated strikes by one, never below zero.
    pub fn record_success(&self, alias: NodeAlias) {
        let mut state = self.lock();
        if let Some(strikes) = state.strikes.get_mut(&alias) {
            if *strikes > 0 {
                *strikes -= 1;
            }
        }
    }

    pub fn is_online(&self, alias: NodeAlias) -> bool {
        !self.lock().offline.contains(&alias)
    }

    pub fn strikes(&self, alias: NodeAlias) -> u32 {
        self.lock().strikes.get(&alias).copied().unwrap_or(0)
    }

    /// Sorted snapshot of offline nodes, for the external health sink.
    pub fn offline_nodes(&self) -> Vec<NodeAlias> {
        let state = self.lock();
        let mut nodes: Vec<NodeAlias> = state.offline.iter().copied().collect();
        nodes.sort();
        nodes
    }

    /// True if no node has been marked offline and no strikes are recorded.
    pub fn is_untouched(&self) -> bool {
        let state = self.lock();
        state.offline.is_empty() && state.strikes.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HealthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
