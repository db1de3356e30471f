//! Pipeline lifecycle states.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Where a [`crate::Pipeline`] is in its run.
///
/// `Idle → FetchingAll → Resolving → Aggregating → Persisting → Done`.
/// A failed attempt returns to `FetchingAll` while whole-run attempts
/// remain and ends in `Failed` once they are exhausted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    /// Not started.
    #[default]
    Idle,
    /// Fetching and decoding the three sources.
    FetchingAll,
    /// Resolving stations to regions.
    Resolving,
    /// Merging station counts with vehicle counts.
    Aggregating,
    /// Writing the output.
    Persisting,
    /// The output was written.
    Done,
    /// Every attempt failed; nothing was written.
    Failed,
}
