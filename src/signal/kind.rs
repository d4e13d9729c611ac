//! Signal kinds.

use std::fmt;

/// What a caller is told when its deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalKind {
    /// The default: the guarded call ran out of time.
    #[default]
    Timeout,
    /// A caller-chosen label, surfaced unchanged in `DeadlineExceeded`.
    Custom(&'static str),
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Timeout => "timeout",
            SignalKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
