//! Per-session analysis runs that can be superseded.
//!
//! Submitting a new analysis for a session cancels the run already in flight for
//! that session, so at most one report build per session is live at a time.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::abundance::AbundanceTable;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::report::AnalysisReport;
use crate::taxdb::ReferenceLookup;
use crate::types::SampleMetadata;

/// Cooperative cancellation flag, checked between analysis stages and before every reference lookup.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A running analysis. Dropping the handle does not stop the run; call [`cancel`](Self::cancel).
pub struct AnalysisHandle {
    session_id: String,
    token: Arc<CancelToken>,
    worker: JoinHandle<AnalysisResult<AnalysisReport>>,
}

impl AnalysisHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the run ends.
    pub fn wait(self) -> AnalysisResult<AnalysisReport> {
        match self.worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Tracks the live run of every session.
#[derive(Default)]
pub struct SessionManager {
    active: Arc<Mutex<AHashMap<String, Arc<CancelToken>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an analysis on a background thread, cancelling the session's previous run.
    ///
    /// The table and metadata are moved in, so the run owns its input snapshot.
    pub fn submit<L>(
        &self,
        session_id: impl Into<String>,
        table: AbundanceTable,
        metadata: SampleMetadata,
        lookup: Arc<L>,
        config: AnalysisConfig,
    ) -> AnalysisHandle
    where
        L: ReferenceLookup + Send + ?Sized + 'static,
    {
        let session_id = session_id.into();
        let token = Arc::new(CancelToken::new());

        if let Some(previous) = self.active.lock().insert(session_id.clone(), token.clone()) {
            log::info!("Superseding in-flight analysis for session {session_id}");
            previous.cancel();
        }

        let active = Arc::clone(&self.active);
        let worker_token = Arc::clone(&token);
        let worker_session = session_id.clone();
        let worker = thread::spawn(move || {
            let result = crate::run_analysis(
                &table,
                metadata,
                lookup.as_ref(),
                &config,
                Some((worker_session.as_str(), worker_token.as_ref())),
            );

            // Only clear the slot if a newer run has not replaced it.
            let mut active = active.lock();
            if active
                .get(&worker_session)
                .is_some_and(|current| Arc::ptr_eq(current, &worker_token))
            {
                active.remove(&worker_session);
            }
            result
        });

        AnalysisHandle {
            session_id,
            token,
            worker,
        }
    }

    /// Cancel the session's live run, if any. Returns whether one was found.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.active.lock().remove(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active.lock().contains_key(session_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.active.lock().len()
    }
}

pub(crate) fn check_cancelled(cancel: Option<(&str, &CancelToken)>) -> AnalysisResult<()> {
    match cancel {
        Some((session_id, token)) if token.is_cancelled() => Err(AnalysisError::Cancelled {
            session_id: session_id.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, LookupError};
    use crate::taxdb::{EmptyReference, LookupOutcome, TaxonSignature};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    fn table(sample: &str) -> AbundanceTable {
        AbundanceTable::from_counts(sample, [("A", "alpha", 10), ("B", "beta", 5)]).unwrap()
    }

    fn sequential() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.classification.parallel_lookups = false;
        config
    }

    /// Blocks every lookup until released, so a run can be caught mid-flight.
    struct GatedLookup {
        started: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ReferenceLookup for GatedLookup {
        fn lookup(&self, _sig: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError> {
            if let Some(tx) = self.started.lock().take() {
                let _ = tx.send(());
            }
            let _ = self.release.lock().recv_timeout(Duration::from_secs(5));
            Ok(LookupOutcome::NotFound)
        }
    }

    /// Slow lookup that counts how often it is asked.
    #[derive(Default)]
    struct SlowCountingLookup {
        calls: AtomicUsize,
    }

    impl ReferenceLookup for SlowCountingLookup {
        fn lookup(&self, _sig: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(LookupOutcome::NotFound)
        }
    }

    #[test]
    fn cancelled_run_stops_issuing_lookups() {
        let sessions = SessionManager::new();
        let lookup = Arc::new(SlowCountingLookup::default());
        let table = AbundanceTable::from_counts(
            "S1",
            (0..40).map(|i| (format!("T{i}"), format!("taxon {i}"), 5)),
        )
        .unwrap();

        let handle = sessions.submit("user-1", table, SampleMetadata::default(), Arc::clone(&lookup), sequential());
        while lookup.calls.load(Ordering::SeqCst) < 2 {
            thread::sleep(Duration::from_millis(1));
        }
        handle.cancel();
        let at_cancel = lookup.calls.load(Ordering::SeqCst);

        let err = handle.wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        // at most the lookup already in flight completes
        let total = lookup.calls.load(Ordering::SeqCst);
        assert!(total <= at_cancel + 1, "{total} lookups after cancelling at {at_cancel}");
        assert!(total < 40);
    }

    #[test]
    fn completed_run_returns_report_and_clears_session() {
        let sessions = SessionManager::new();
        let handle = sessions.submit(
            "user-1",
            table("S1"),
            SampleMetadata::default(),
            Arc::new(EmptyReference),
            sequential(),
        );
        let report = handle.wait().unwrap();
        assert_eq!(report.sample_id(), "S1");
        assert_eq!(report.summary().novel_species, 2);
        assert!(!sessions.is_active("user-1"));
        assert_eq!(sessions.active_sessions(), 0);
    }

    #[test]
    fn resubmitting_cancels_previous_run() {
        let sessions = SessionManager::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gated = Arc::new(GatedLookup {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(release_rx),
        });

        let first = sessions.submit("user-1", table("S1"), SampleMetadata::default(), gated, sequential());
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let second = sessions.submit(
            "user-1",
            table("S2"),
            SampleMetadata::default(),
            Arc::new(EmptyReference),
            sequential(),
        );
        assert!(first.is_cancelled());
        for _ in 0..2 {
            let _ = release_tx.send(());
        }

        let err = first.wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.to_string().contains("user-1"));
        assert_eq!(second.wait().unwrap().sample_id(), "S2");
    }

    #[test]
    fn sessions_are_independent() {
        let sessions = SessionManager::new();
        let a = sessions.submit("a", table("SA"), SampleMetadata::default(), Arc::new(EmptyReference), sequential());
        let b = sessions.submit("b", table("SB"), SampleMetadata::default(), Arc::new(EmptyReference), sequential());
        assert!(!a.is_cancelled());
        assert!(!b.is_cancelled());
        assert_eq!(a.wait().unwrap().sample_id(), "SA");
        assert_eq!(b.wait().unwrap().sample_id(), "SB");
    }

    #[test]
    fn explicit_cancel_of_unknown_session() {
        assert!(!SessionManager::new().cancel("nobody"));
    }

    #[test]
    fn invalid_table_fails_without_report() {
        let sessions = SessionManager::new();
        let empty = AbundanceTable::from_counts("S0", [("A", "alpha", 0)]).unwrap();
        let err = sessions
            .submit("u", empty, SampleMetadata::default(), Arc::new(EmptyReference), sequential())
            .wait()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
