use std::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step is running or executed successfully.
    Executed,
    /// Step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
    /// Step is pure and needed no compensation.
    Skipped,
    /// Step had side effects but no compensation to run.
    MissingCompensation,
}

/// Record of one `execute` call in a transaction.
#[derive(Debug)]
pub struct AuditRecord {
    /// The command that was run.
    pub command: String,
    /// Current status.
    pub status: StepStatus,
    /// When the step started executing.
    pub started_at: Instant,
    /// When the step last changed state (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Compensation command (if any).
    pub compensation: Option<String>,
}

/// Audit log tracking every step execution and compensation of a transaction.
#[derive(Debug, Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step execution starting. Returns the record's sequence number.
    pub(crate) fn record_start(&mut self, command: &str) -> usize {
        self.records.push(AuditRecord {
            command: command.to_string(),
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
            compensation: None,
        });
        self.records.len() - 1
    }

    pub(crate) fn record_success(&mut self, sequence: usize, compensation: Option<&str>) {
        if let Some(record) = self.records.get_mut(sequence) {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.compensation = compensation.map(str::to_string);
        }
    }

    pub(crate) fn record_failure(&mut self, sequence: usize) {
        self.set_status(sequence, StepStatus::Failed);
    }

    pub(crate) fn record_compensated(&mut self, sequence: usize) {
        self.set_status(sequence, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, sequence: usize) {
        self.set_status(sequence, StepStatus::CompensationFailed);
    }

    pub(crate) fn record_skipped(&mut self, sequence: usize) {
        self.set_status(sequence, StepStatus::Skipped);
    }

    pub(crate) fn record_missing_compensation(&mut self, sequence: usize) {
        self.set_status(sequence, StepStatus::MissingCompensation);
    }

    fn set_status(&mut self, sequence: usize, status: StepStatus) {
        if let Some(record) = self.records.get_mut(sequence) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Get all records in execution order.
    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Get a summary of the transaction for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
                StepStatus::Skipped => "·",
                StepStatus::MissingCompensation => "!",
            };
            lines.push(format!("{status} {}", record.command));
        }
        lines.join("\n")
    }
}
