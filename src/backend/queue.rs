use tracing::{info, warn};

use super::{Backend, Request};

/// Requests deferred while autosave is off.
#[derive(Debug, Default)]
pub struct PendingQueue {
    pending: Vec<Request>,
}

/// Outcome of flushing the queue. One failed request does not stop the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    pub sent: usize,
    pub failed: usize,
}

impl SaveReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

impl PendingQueue {
    pub fn push(&mut self, request: Request) {
        self.pending.push(request);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn flush<B: Backend + ?Sized>(&mut self, backend: &mut B) -> SaveReport {
        let mut report = SaveReport::default();
        if self.is_empty() {
            return report;
        }

        for request in self.pending.drain(..) {
            report.sent += 1;
            match backend.send(&request) {
                Ok(resp) if resp.correct => {}
                Ok(_) => {
                    report.failed += 1;
                    warn!(action = request.action.as_str(), element = ?request.element, "queued request rejected");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(action = request.action.as_str(), element = ?request.element, error = %e, "queued request failed");
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "flushed pending changes");
        report
    }
}
