//! Background worker that owns the alarm service.
//!
//! # Responsibility
//! - Move store and scheduler work off the caller's (UI) thread.
//! - Run jobs one at a time, in submission order.
//!
//! # Invariants
//! - The service is only touched from the worker thread.
//! - A panicking job is logged and does not stop the worker.
//! - Dropping the worker drains queued jobs, then joins the thread.

use crate::model::alarm::{Alarm, AlarmId};
use crate::platform::WakeTimerHost;
use crate::repo::alarm_repo::AlarmStore;
use crate::schedule::clock::Clock;
use crate::service::alarm_service::{
    AlarmService, AlarmServiceError, AlarmServiceResult, CreateAlarmRequest,
};
use crossbeam_channel::Sender;
use log::{debug, error};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

const WORKER_THREAD_NAME: &str = "morpheus-alarm-worker";

type Job<S, H, C> = Box<dyn FnOnce(&mut AlarmService<S, H, C>) + Send>;

pub struct AlarmWorker<S, H, C>
where
    S: AlarmStore + Send + 'static,
    H: WakeTimerHost + 'static,
    C: Clock + 'static,
{
    jobs: Option<Sender<Job<S, H, C>>>,
    handle: Option<JoinHandle<()>>,
}

impl<S, H, C> AlarmWorker<S, H, C>
where
    S: AlarmStore + Send + 'static,
    H: WakeTimerHost + 'static,
    C: Clock + 'static,
{
    /// Moves `service` onto a dedicated thread.
    pub fn spawn(service: AlarmService<S, H, C>) -> std::io::Result<Self> {
        let (jobs, inbox) = crossbeam_channel::unbounded::<Job<S, H, C>>();
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut service = service;
                for job in inbox.iter() {
                    if catch_unwind(AssertUnwindSafe(|| job(&mut service))).is_err() {
                        error!("event=worker_job module=worker status=panicked");
                    }
                }
                debug!("event=worker_stop module=worker status=ok");
            })?;
        debug!("event=worker_start module=worker status=ok thread={WORKER_THREAD_NAME}");
        Ok(Self {
            jobs: Some(jobs),
            handle: Some(handle),
        })
    }

    /// Runs `job` on the worker thread and waits for its result.
    ///
    /// # Errors
    /// - `WorkerStopped` when the worker is gone or the job panicked.
    pub fn execute<T, F>(&self, job: F) -> AlarmServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut AlarmService<S, H, C>) -> T + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(AlarmServiceError::WorkerStopped)?;
        let (reply, result) = crossbeam_channel::bounded(1);
        jobs.send(Box::new(move |service| {
            // The caller may have given up waiting; nothing to do then.
            let _ = reply.send(job(service));
        }))
        .map_err(|_| AlarmServiceError::WorkerStopped)?;
        result.recv().map_err(|_| AlarmServiceError::WorkerStopped)
    }

    pub fn alarms(&self) -> AlarmServiceResult<Vec<Alarm>> {
        self.execute(|service| service.alarms())?
            .map_err(AlarmServiceError::from)
    }

    pub fn create_alarm(&self, request: CreateAlarmRequest) -> AlarmServiceResult<Alarm> {
        self.execute(move |service| service.create_alarm(&request))?
    }

    pub fn toggle_alarm(&self, id: AlarmId) -> AlarmServiceResult<Alarm> {
        self.execute(move |service| service.toggle_alarm(id))?
    }

    pub fn set_enabled(&self, id: AlarmId, enabled: bool) -> AlarmServiceResult<Alarm> {
        self.execute(move |service| service.set_enabled(id, enabled))?
    }

    pub fn edit_alarm(&self, alarm: Alarm) -> AlarmServiceResult<Alarm> {
        self.execute(move |service| service.edit_alarm(&alarm))?
    }

    pub fn delete_alarm(&self, id: AlarmId) -> AlarmServiceResult<()> {
        self.execute(move |service| service.delete_alarm(id))?
    }

    pub fn on_alarm_fired(&self, id: AlarmId) -> AlarmServiceResult<Option<Alarm>> {
        self.execute(move |service| service.on_alarm_fired(id))?
    }

    pub fn reschedule_enabled(&self) -> AlarmServiceResult<usize> {
        self.execute(|service| service.reschedule_enabled())?
    }

    /// Stops accepting jobs and waits for queued ones to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.jobs.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=worker_stop module=worker status=error error=join_failed");
            }
        }
    }
}

impl<S, H, C> Drop for AlarmWorker<S, H, C>
where
    S: AlarmStore + Send + 'static,
    H: WakeTimerHost + 'static,
    C: Clock + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
