//! Function version snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stratus_core::{FunctionId, VersionId};

/// One immutable code snapshot of a function.
///
/// Version numbers start at 1 and increase per function without reuse.
/// At most one version per function is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionVersion {
    /// Unique identifier of this snapshot.
    pub id: VersionId,
    /// Owning function.
    pub function_id: FunctionId,
    /// Per-function sequence number.
    pub version: u32,
    /// Source code payload.
    pub code: String,
    /// Who created the version, if known.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Whether this is the version that executes.
    pub is_active: bool,
    /// When the version was created.
    pub created_at: DateTime<Utc>,
}
