// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Compensation for writes that span stores without a shared transaction.
//!
//! Perform the hard-to-undo step first, register its compensation, then
//! apply the record-store batch as the commit point. On failure, `abort`
//! runs the registered compensations newest first.
//!
//! ```rust,ignore
//! let record = keyring.import_armored(&name, armor, passphrase, owner)?;
//! let mut saga = Saga::new("import_account");
//! let kr = Arc::clone(&keyring);
//! saga.on_rollback("delete keyring entry", move || kr.delete(&name));
//!
//! match records.write(batch) {
//!     Ok(()) => saga.commit(),
//!     Err(e) => return Err(saga.abort_with(e.into())),
//! }
//! ```

use std::fmt;

type Compensation = Box<dyn FnOnce() -> Result<(), String> + Send>;

/// A compensation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step}: {message}")]
pub struct CompensationError {
    pub step: String,
    pub message: String,
}

/// Failure of the forward step whose rollback also failed.
pub trait RollbackFailed: Sized {
    fn rollback_failed(rollback: CompensationError, original: Self) -> Self;
}

pub struct Saga {
    name: &'static str,
    steps: Vec<(String, Compensation)>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn on_rollback<F, E>(&mut self, step: impl Into<String>, compensate: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: fmt::Display,
    {
        self.steps.push((
            step.into(),
            Box::new(move || compensate().map_err(|e| e.to_string())),
        ));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Forward path succeeded; drop the compensations.
    pub fn commit(self) {
        tracing::trace!(saga = self.name, steps = self.steps.len(), "Saga committed");
    }

    /// Run every compensation, newest first. All of them run even when one
    /// fails; the first failure is returned.
    pub fn abort(self) -> Result<(), CompensationError> {
        let mut first_failure = None;

        for (step, compensate) in self.steps.into_iter().rev() {
            if let Err(message) = compensate() {
                tracing::error!(saga = self.name, step = %step, error = %message, "Compensation failed");
                first_failure.get_or_insert(CompensationError { step, message });
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => {
                tracing::warn!(saga = self.name, "Saga rolled back");
                Ok(())
            }
        }
    }

    /// Abort and fold a rollback failure into `original`.
    pub fn abort_with<E: RollbackFailed>(self, original: E) -> E {
        match self.abort() {
            Ok(()) => original,
            Err(rollback) => E::rollback_failed(rollback, original),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Original(&'static str),
        Wrapped(String),
    }

    impl RollbackFailed for TestError {
        fn rollback_failed(rollback: CompensationError, original: Self) -> Self {
            TestError::Wrapped(format!("{rollback} : {original:?}"))
        }
    }

    #[test]
    fn abort_runs_compensations_newest_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("test");
        for step in ["first", "second"] {
            let log = Arc::clone(&log);
            saga.on_rollback(step, move || {
                log.lock().unwrap().push(step);
                Ok::<(), String>(())
            });
        }
        assert_eq!(saga.len(), 2);

        assert!(saga.abort().is_ok());
        assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn failed_compensation_wraps_the_original_error() {
        let mut saga = Saga::new("test");
        saga.on_rollback("delete key", || Err::<(), _>("disk full"));

        let err = saga.abort_with(TestError::Original("batch failed"));
        assert_eq!(
            err,
            TestError::Wrapped("delete key: disk full : Original(\"batch failed\")".to_string())
        );
    }

    #[test]
    fn successful_rollback_returns_the_original_error() {
        let mut saga = Saga::new("test");
        saga.on_rollback("noop", || Ok::<(), String>(()));
        assert_eq!(
            saga.abort_with(TestError::Original("x")),
            TestError::Original("x")
        );
    }

    #[test]
    fn commit_skips_compensations() {
        let ran = Arc::new(Mutex::new(false));
        let mut saga = Saga::new("test");
        let flag = Arc::clone(&ran);
        saga.on_rollback("flag", move || {
            *flag.lock().unwrap() = true;
            Ok::<(), String>(())
        });
        saga.commit();
        assert!(!*ran.lock().unwrap());
    }
}
