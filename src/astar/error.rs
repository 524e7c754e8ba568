// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Error conditions which may occur during [find_route](crate::find_route).
///
/// Exhausting the search without reaching the destination is not an error;
/// in that case an empty route is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AStarError {
    /// The start or end nodes don't exist in a graph.
    #[error("invalid node: {0}")]
    InvalidReference(i64),

    /// Route search has exceeded its limit of steps.
    /// Either the nodes are really far apart, or no route exists.
    ///
    /// Concluding that no route exists requires traversing the whole connected
    /// component of the start node. The step limit protects against resource exhaustion.
    #[error("step limit exceeded")]
    StepLimitExceeded,
}
