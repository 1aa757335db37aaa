use std::fmt;

/// Lifecycle of one engine run.
///
/// `Ready -> Running -> {Completed, Aborted}`; terminal statuses never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Commands and initial state accepted, nothing dispatched yet.
    Ready,
    /// Executing commands in list order.
    Running,
    /// Every command succeeded; the state is the result.
    Completed,
    /// A command failed; no further commands ran.
    Aborted,
}

impl Status {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Running => "Running",
            Status::Completed => "Completed",
            Status::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
