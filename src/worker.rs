//! Background thread running project saves and loads.
//!
//! Project I/O can be slow, so interactive callers hand it to a
//! [`ProjectWorker`] and wait on the returned completion channel instead of
//! blocking their own loop. The worker has a single slot: while one
//! operation is in flight, further submissions fail with
//! [`ProjectError::Busy`]. A job that panics takes the worker thread down;
//! from then on submissions fail with [`ProjectError::WorkerStopped`].

use crate::error::{ProjectError, Result};
use crate::project::{Project, ProjectSnapshot};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce(&Project) + Send>;

/// Holds the worker's single slot; releases it when dropped.
///
/// Dropped when the job finishes, when it panics, or when it is discarded
/// unrun because the worker thread is gone.
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns a [`Project`] on a dedicated thread.
pub struct ProjectWorker {
    jobs: Option<Sender<Job>>,
    busy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProjectWorker {
    /// Move `project` onto a new worker thread.
    pub fn spawn(project: Project) -> Result<Self> {
        let (jobs, queue) = bounded::<Job>(1);

        let handle = thread::Builder::new()
            .name("project-io".to_string())
            .spawn(move || {
                for job in queue.iter() {
                    job(&project);
                }
                tracing::debug!("Project worker stopped");
            })?;

        Ok(Self {
            jobs: Some(jobs),
            busy: Arc::new(AtomicBool::new(false)),
            handle: Some(handle),
        })
    }

    /// Whether an operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Save `snapshot` in the background.
    pub fn submit_save(&self, snapshot: ProjectSnapshot) -> Result<Receiver<Result<()>>> {
        self.submit(move |project| project.save(&snapshot.properties, &snapshot.states))
    }

    /// Load the project in the background.
    ///
    /// Apply the result to a live session with [`crate::Session::apply`].
    pub fn submit_load(&self) -> Result<Receiver<Result<ProjectSnapshot>>> {
        self.submit(Project::load)
    }

    fn submit<T, F>(&self, operation: F) -> Result<Receiver<Result<T>>>
    where
        T: Send + 'static,
        F: FnOnce(&Project) -> Result<T> + Send + 'static,
    {
        if self.is_stopped() {
            return Err(ProjectError::WorkerStopped);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ProjectError::Busy);
        }

        let (reply, completion) = bounded(1);
        let slot = SlotGuard(Arc::clone(&self.busy));
        let job: Job = Box::new(move |project| {
            let result = operation(project);
            // Free the slot before replying so the caller can resubmit at once.
            drop(slot);
            let _ = reply.send(result);
        });

        // A rejected job is dropped here, releasing the slot.
        let sent = match &self.jobs {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        };
        if !sent {
            return Err(ProjectError::WorkerStopped);
        }

        Ok(completion)
    }

    /// Whether the worker thread has exited, e.g. after a job panicked.
    fn is_stopped(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ProjectWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop after the in-flight job.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Project worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeStore, MemoryAttributeStore};
    use crate::project::ProjectConfig;
    use crate::registry::SerializerRegistry;
    use crate::state::RawSourceState;
    use crate::types::fixed_path;
    use serde_json::Value;
    use std::time::Duration;

    /// Memory store whose reads wait for a signal.
    struct GatedStore {
        inner: MemoryAttributeStore,
        gate: Receiver<()>,
    }

    impl AttributeStore for GatedStore {
        fn get_attribute(&self, group: &str, key: &str) -> Result<Option<Value>> {
            let _ = self.gate.recv_timeout(Duration::from_secs(5));
            self.inner.get_attribute(group, key)
        }

        fn set_attribute(&self, group: &str, key: &str, value: Value) -> Result<()> {
            self.inner.set_attribute(group, key, value)
        }
    }

    fn project(store: Box<dyn AttributeStore>) -> Project {
        Project::new(
            store,
            SerializerRegistry::with_defaults(),
            fixed_path("/project"),
            ProjectConfig::default(),
        )
    }

    #[test]
    fn test_save_then_load_in_background() {
        let worker = ProjectWorker::spawn(project(Box::new(MemoryAttributeStore::new()))).unwrap();

        let mut snapshot = ProjectSnapshot::default();
        snapshot
            .states
            .add_state(Arc::new(RawSourceState::new("em")))
            .unwrap();
        worker.submit_save(snapshot).unwrap().recv().unwrap().unwrap();

        let loaded = worker.submit_load().unwrap().recv().unwrap().unwrap();
        assert_eq!(loaded.states.len(), 1);
        assert_eq!(loaded.states.get(0).unwrap().name(), "em");
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_single_slot() {
        let (open, gate) = bounded(1);
        let store = GatedStore {
            inner: MemoryAttributeStore::new(),
            gate,
        };
        let worker = ProjectWorker::spawn(project(Box::new(store))).unwrap();

        let pending = worker.submit_load().unwrap();
        assert!(worker.is_busy());
        let second = worker.submit_save(ProjectSnapshot::default());
        assert!(matches!(second, Err(ProjectError::Busy)));

        open.send(()).unwrap();
        let loaded = pending.recv().unwrap().unwrap();
        assert!(loaded.states.is_empty());

        // The slot is free again once the completion arrived.
        worker
            .submit_save(ProjectSnapshot::default())
            .unwrap()
            .recv()
            .unwrap()
            .unwrap();
    }

    struct PanickingStore;

    impl AttributeStore for PanickingStore {
        fn get_attribute(&self, _group: &str, _key: &str) -> Result<Option<Value>> {
            panic!("attribute store failure");
        }

        fn set_attribute(&self, _group: &str, _key: &str, _value: Value) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_panicking_job_stops_worker() {
        let worker = ProjectWorker::spawn(project(Box::new(PanickingStore))).unwrap();

        // The reply sender is dropped with the panicking job.
        assert!(worker.submit_load().unwrap().recv().is_err());

        // Once the thread is gone every submission reports it. A job queued
        // while the thread is still unwinding is discarded unanswered.
        let mut stopped = false;
        for _ in 0..500 {
            match worker.submit_save(ProjectSnapshot::default()) {
                Err(ProjectError::WorkerStopped) => {
                    stopped = true;
                    break;
                }
                Err(ProjectError::Busy) => {}
                Err(other) => panic!("unexpected error {}", other),
                Ok(completion) => assert!(completion.recv().is_err()),
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert!(stopped);
        assert!(!worker.is_busy());
        assert!(matches!(worker.submit_load(), Err(ProjectError::WorkerStopped)));
    }

    #[test]
    fn test_drop_waits_for_in_flight_job() {
        let worker = ProjectWorker::spawn(project(Box::new(MemoryAttributeStore::new()))).unwrap();
        let completion = worker.submit_save(ProjectSnapshot::default()).unwrap();
        drop(worker);

        assert!(completion.recv().unwrap().is_ok());
    }
}
