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

use thiserror::Error;

use crate::types::NodeAlias;

/// Errors that abort a verification run.
///
/// Per-batch failures (an unreachable node, a piece that fails its check) are
/// contained inside `verify_batches` and never surface here; only
/// catalog-layer and alias-layer failures are fatal to a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid range count: {0}")]
    InvalidRangeCount(u32),

    #[error("node alias {0} not found in alias table")]
    AliasNotFound(NodeAlias),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("node directory error: {0}")]
    NodeDirectory(String),

    #[error("verification run cancelled")]
    Cancelled,

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for segment verification operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create an Other error from any error type.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Other(error.into().to_string())
    }
}
