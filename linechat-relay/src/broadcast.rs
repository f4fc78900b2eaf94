//! Fan-out of one line to every registered session.

use crate::registry::Registry;
use crate::sink::Delivery;

/// Outcome of one [`broadcast`] round.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Destinations that accepted the line.
    pub delivered: usize,
    /// Destinations whose queue was full or whose writer was gone.
    pub dropped: usize,
}

/// Offers `line` to every session in a registry snapshot.
///
/// Best effort: a full or closed destination is skipped and never affects
/// the others. Sessions registered after the snapshot miss this round.
pub fn broadcast(registry: &Registry, line: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (name, sink) in registry.snapshot() {
        match sink.offer(line) {
            Delivery::Queued => report.delivered += 1,
            Delivery::Full => {
                tracing::debug!(to = %name, "outbound queue full, broadcast line dropped");
                report.dropped += 1;
            }
            Delivery::Closed => {
                tracing::debug!(to = %name, "writer closed, broadcast line dropped");
                report.dropped += 1;
            }
        }
    }

    report
}
