//! Per-record errors, and the bounded log they are collected into while a
//! file is processed

use fnv::FnvHashSet;
use std::fmt::Display;

use crate::columns::RecordError;

/// Number of distinct unresolved-modification messages kept per run
pub const MAX_LOGGED_MOD_ERRORS: usize = 250;
/// Size cap for the log of malformed records
pub const MAX_LOG_CHARS: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationError {
    /// A mass token did not match any catalog entry, even after relaxing
    /// its positional context
    UnresolvedModification { peptide: String, masses: Vec<f64> },
}

impl Display for AnnotationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationError::UnresolvedModification { peptide, masses } => {
                write!(f, "unrecognized modification mass")?;
                if masses.len() > 1 {
                    f.write_str("es")?;
                }
                for (ix, mass) in masses.iter().enumerate() {
                    match ix {
                        0 => write!(f, " {}", mass)?,
                        _ => write!(f, ", {}", mass)?,
                    }
                }
                write!(f, " in {}", peptide)
            }
        }
    }
}

impl std::error::Error for AnnotationError {}

/// Counts every per-record error, but keeps only a bounded amount of text
#[derive(Debug, Default)]
pub struct ErrorAccumulator {
    unresolved: usize,
    malformed: usize,
    mod_messages: Vec<String>,
    seen: FnvHashSet<String>,
    log: String,
    log_full: bool,
}

impl ErrorAccumulator {
    pub fn should_continue_logging(&self) -> bool {
        self.mod_messages.len() < MAX_LOGGED_MOD_ERRORS
    }

    /// Count a rejected record; its message is kept if it has not been seen
    /// and fewer than [`MAX_LOGGED_MOD_ERRORS`] messages were kept so far
    pub fn record_error(&mut self, scan: i32, err: &AnnotationError) {
        self.unresolved += 1;
        if !self.should_continue_logging() {
            return;
        }
        let message = err.to_string();
        if self.seen.insert(message.clone()) {
            self.mod_messages.push(format!("scan {}: {}", scan, message));
        }
    }

    /// Count a malformed input line and append it to the capped log
    pub fn record_malformed(&mut self, line: usize, err: &RecordError) {
        self.malformed += 1;
        self.push_message(format!("line {}: {}", line, err));
    }

    /// Append a free-form message. Returns false once the log is full; after
    /// that point every message is dropped.
    pub fn push_message<S: AsRef<str>>(&mut self, message: S) -> bool {
        let message = message.as_ref();
        if self.log_full || self.log.len() + message.len() + 1 > MAX_LOG_CHARS {
            self.log_full = true;
            return false;
        }
        self.log.push_str(message);
        self.log.push('\n');
        true
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    pub fn is_empty(&self) -> bool {
        self.unresolved == 0 && self.malformed == 0 && self.log.is_empty()
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn mod_messages(&self) -> &[String] {
        &self.mod_messages
    }

    /// Multi-line report of everything collected, or `None` if nothing went wrong
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut s = String::new();
        if self.unresolved > 0 {
            s.push_str(&format!(
                "{} record(s) rejected due to unrecognized modification masses",
                self.unresolved
            ));
            if self.mod_messages.len() >= MAX_LOGGED_MOD_ERRORS {
                s.push_str(&format!(" (first {} shown)", MAX_LOGGED_MOD_ERRORS));
            }
            s.push('\n');
            for message in &self.mod_messages {
                s.push_str("  ");
                s.push_str(message);
                s.push('\n');
            }
        }
        if self.malformed > 0 {
            s.push_str(&format!("{} malformed record(s) skipped\n", self.malformed));
        }
        for line in self.log.lines() {
            s.push_str("  ");
            s.push_str(line);
            s.push('\n');
        }
        if self.log_full {
            s.push_str("  (further messages suppressed)\n");
        }
        Some(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unresolved(peptide: &str) -> AnnotationError {
        AnnotationError::UnresolvedModification {
            peptide: peptide.into(),
            masses: vec![120.5],
        }
    }

    #[test]
    fn display() {
        assert_eq!(
            unresolved("K.PEP+120.5.R").to_string(),
            "unrecognized modification mass 120.5 in K.PEP+120.5.R"
        );
        let err = AnnotationError::UnresolvedModification {
            peptide: "X".into(),
            masses: vec![1.5, -2.0],
        };
        assert_eq!(err.to_string(), "unrecognized modification masses 1.5, -2 in X");
    }

    #[test]
    fn mod_errors_are_capped_but_counted() {
        let mut acc = ErrorAccumulator::default();
        for i in 0..300 {
            acc.record_error(i, &unresolved(&format!("PEP{}", i)));
        }
        // duplicates are counted but not logged again
        acc.record_error(1, &unresolved("PEP0"));
        assert_eq!(acc.unresolved_count(), 301);
        assert_eq!(acc.mod_messages().len(), MAX_LOGGED_MOD_ERRORS);
        assert!(!acc.should_continue_logging());
        assert!(acc.summary().unwrap().contains("(first 250 shown)"));
    }

    #[test]
    fn distinct_messages_only() {
        let mut acc = ErrorAccumulator::default();
        acc.record_error(10, &unresolved("PEP"));
        acc.record_error(11, &unresolved("PEP"));
        assert_eq!(acc.unresolved_count(), 2);
        assert_eq!(acc.mod_messages().len(), 1);
    }

    #[test]
    fn log_is_capped() {
        let mut acc = ErrorAccumulator::default();
        let message = "x".repeat(1000);
        assert!(acc.push_message(&message));
        assert!(acc.push_message(&message));
        assert!(acc.push_message(&message));
        assert!(acc.push_message(&message));
        assert!(!acc.push_message(&message));
        // a short message no longer fits either, once the cap was hit
        assert!(!acc.push_message("short"));
        assert!(acc.log().len() <= MAX_LOG_CHARS);
        assert!(acc.summary().unwrap().contains("further messages suppressed"));
    }

    #[test]
    fn empty() {
        let acc = ErrorAccumulator::default();
        assert!(acc.is_empty());
        assert_eq!(acc.summary(), None);
    }
}
