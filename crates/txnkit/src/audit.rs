use std::time::Instant;

/// Outcome of a step's forward action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Handler completed successfully.
    Executed,
    /// Handler reported a failure.
    Failed,
}

/// What happened to a step during rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompensationStatus {
    /// No rollback was needed.
    NotRequired,
    /// Rollback ran without error.
    Compensated,
    /// Rollback reported a failure.
    Failed,
    /// Rollback never ran because a fail-fast halt stopped the scan.
    Skipped,
}

/// Record of one attempted step.
#[derive(Debug)]
pub struct StepRecord {
    /// 1-based position in the transaction.
    pub position: usize,
    pub name: Option<String>,
    pub status: StepStatus,
    pub compensation: CompensationStatus,
    /// When the handler started.
    pub started_at: Instant,
    /// When the handler or the rollback last completed.
    pub completed_at: Option<Instant>,
}

impl StepRecord {
    /// The step's name, or `step N` when it has none.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("step {}", self.position))
    }
}

/// Audit trail of a single run.
#[derive(Debug, Default)]
pub struct TxnAuditLog {
    records: Vec<StepRecord>,
    compensation_order: Vec<usize>,
}

impl TxnAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, position: usize, name: Option<&str>) {
        self.records.push(StepRecord {
            position,
            name: name.map(str::to_string),
            status: StepStatus::Executed,
            compensation: CompensationStatus::NotRequired,
            started_at: Instant::now(),
            completed_at: None,
        });
    }

    pub(crate) fn record_success(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_compensated(&mut self, position: usize) {
        self.set_compensation(position, CompensationStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, position: usize) {
        self.set_compensation(position, CompensationStatus::Failed);
    }

    /// Mark every step at or below `position` as skipped.
    pub(crate) fn record_skipped_through(&mut self, position: usize) {
        for record in self.records.iter_mut().filter(|r| r.position <= position) {
            record.compensation = CompensationStatus::Skipped;
        }
    }

    fn set_compensation(&mut self, position: usize, status: CompensationStatus) {
        self.compensation_order.push(position);
        if let Some(record) = self.records.iter_mut().find(|r| r.position == position) {
            record.compensation = status;
            record.completed_at = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Record for the step at a 1-based position.
    #[must_use]
    pub fn record(&self, position: usize) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.position == position)
    }

    /// Positions whose rollback ran, in the order it ran.
    #[must_use]
    pub fn compensated_positions(&self) -> &[usize] {
        &self.compensation_order
    }

    /// One line per step, for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match (record.status, record.compensation) {
                (_, CompensationStatus::Compensated) => "↩",
                (_, CompensationStatus::Failed) => "⚠",
                (_, CompensationStatus::Skipped) => "…",
                (StepStatus::Failed, _) => "✗",
                (StepStatus::Executed, _) => "✓",
            };
            lines.push(format!("{status} {}", record.label()));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_audit_log_is_empty() {
        let log = TxnAuditLog::new();
        assert!(log.records().is_empty());
        assert!(log.compensated_positions().is_empty());
    }

    #[test]
    fn record_start_adds_pending_step() {
        let mut log = TxnAuditLog::new();
        log.record_start(1, Some("reserve"));

        let record = &log.records()[0];
        assert_eq!(record.position, 1);
        assert_eq!(record.name.as_deref(), Some("reserve"));
        assert_eq!(record.compensation, CompensationStatus::NotRequired);
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn record_failure_updates_last_step() {
        let mut log = TxnAuditLog::new();
        log.record_start(1, None);
        log.record_success();
        log.record_start(2, None);
        log.record_failure();

        assert_eq!(log.records()[0].status, StepStatus::Executed);
        assert_eq!(log.records()[1].status, StepStatus::Failed);
        assert!(log.records()[1].completed_at.is_some());
    }

    #[test]
    fn compensation_updates_matching_position_and_order() {
        let mut log = TxnAuditLog::new();
        log.record_start(1, None);
        log.record_success();
        log.record_start(2, None);
        log.record_failure();
        log.record_compensated(2);
        log.record_compensation_failed(1);

        assert_eq!(
            log.record(2).map(|r| r.compensation),
            Some(CompensationStatus::Compensated)
        );
        assert_eq!(
            log.record(1).map(|r| r.compensation),
            Some(CompensationStatus::Failed)
        );
        assert_eq!(log.compensated_positions(), &[2, 1]);
    }

    #[test]
    fn skipped_marks_remaining_steps() {
        let mut log = TxnAuditLog::new();
        for position in 1..=3 {
            log.record_start(position, None);
            log.record_success();
        }
        log.record_compensation_failed(3);
        log.record_skipped_through(2);

        assert_eq!(log.records()[0].compensation, CompensationStatus::Skipped);
        assert_eq!(log.records()[1].compensation, CompensationStatus::Skipped);
        assert_eq!(log.records()[2].compensation, CompensationStatus::Failed);
    }

    #[test]
    fn summary_uses_labels_and_symbols() {
        let mut log = TxnAuditLog::new();
        log.record_start(1, Some("reserve"));
        log.record_success();
        log.record_start(2, None);
        log.record_failure();
        log.record_compensated(1);

        let summary = log.summary();
        assert!(summary.contains("↩ reserve"));
        assert!(summary.contains("✗ step 2"));
    }
}
