//! The dispatch engine.
//!
//! [`HandlerRecord::invoke`] runs one dispatch cycle:
//!
//! 1. An unbound record reports "consumed" without doing anything.
//! 2. A static routine is called once, inline, with the parameters.
//! 3. An instance routine is fanned out: every live instance in the
//!    registry snapshot gets its own task on tokio's blocking pool, dead
//!    references are set aside, all tasks are awaited, their results are
//!    OR-ed together, and the dead references are pruned. Outside a tokio
//!    runtime the instances are invoked inline instead.
//!
//! The cycle completes before `invoke` returns, so the flag always reflects
//! every invocation of that cycle. Failures of single invocations are
//! reported to the record's [`ErrorSink`](crate::ErrorSink) and count as
//! "not consumed"; they never stop sibling invocations.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future;
use tokio::runtime::Handle;
use tracing::{Instrument, Level, Span, debug, span, trace};

use crate::error::{BoxError, InvocationError};
use crate::identity::HandlerId;
use crate::instance::Target;
use crate::record::HandlerRecord;
use crate::routine::{InstanceRoutine, Routine, StaticFn};

/// Result of one instance invocation: `None` when the instance had the
/// wrong type.
type Outcome = Result<Option<Result<bool, BoxError>>, InvocationError>;

impl<P> HandlerRecord<P>
where
    P: Send + Sync + 'static,
{
    /// Runs one dispatch cycle with `params` and returns the consumed flag.
    ///
    /// Inside a tokio runtime every live instance is invoked on its own
    /// blocking task; under any other executor they run inline in turn.
    ///
    /// # Returns
    ///
    /// - `true` for an unbound record.
    /// - The routine's own result for a static routine.
    /// - `true` iff at least one live instance reported consumed, for an
    ///   instance routine (`false` when no instance is alive).
    pub async fn invoke(&self, params: P) -> bool {
        let Some(binding) = self.binding.get() else {
            trace!("No routine bound, reporting consumed");
            return true;
        };

        match &binding.routine {
            Routine::Static(call) => self.call_static(&binding.id, call, &params),
            Routine::Instance(routine) => {
                let span = span!(Level::DEBUG, "dispatch", handler = %binding.id);
                self.fan_out(&binding.id, routine, Arc::new(params))
                    .instrument(span)
                    .await
            }
        }
    }

    fn call_static(&self, id: &HandlerId, call: &StaticFn<P>, params: &P) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| call(params))) {
            Ok(Ok(consumed)) => {
                trace!(handler = %id, consumed, "Static routine returned");
                consumed
            }
            Ok(Err(source)) => {
                self.sink.report(InvocationError::Failed {
                    handler: id.clone(),
                    source,
                });
                false
            }
            Err(payload) => {
                self.sink.report(InvocationError::Panicked {
                    handler: id.clone(),
                    message: panic_message(payload.as_ref()),
                });
                false
            }
        }
    }

    async fn fan_out(&self, id: &HandlerId, routine: &InstanceRoutine<P>, params: Arc<P>) -> bool {
        // Held for the whole cycle: one fan-out and prune per handler at a time.
        let mut pending = self.pending_prune.lock().await;
        pending.clear();

        let mut targets = Vec::new();
        for instance in self.instances.snapshot() {
            match instance.target() {
                Some(target) => targets.push(target),
                None => pending.push(instance),
            }
        }

        let invoked = targets.len();
        let outcomes = match Handle::try_current() {
            Ok(handle) => Self::spawn_all(&handle, id, routine, targets, &params).await,
            Err(_) => {
                trace!("No tokio runtime, invoking instances inline");
                Self::call_all_inline(id, routine, targets, &params)
            }
        };

        let mut consumed = false;
        let mut failed = 0usize;
        for outcome in outcomes {
            let error = match outcome {
                Ok(Some(Ok(result))) => {
                    consumed |= result;
                    continue;
                }
                Ok(Some(Err(source))) => InvocationError::Failed {
                    handler: id.clone(),
                    source,
                },
                Ok(None) => InvocationError::TypeMismatch {
                    handler: id.clone(),
                    expected: routine.receiver_name(),
                },
                Err(error) => error,
            };
            failed += 1;
            self.sink.report(error);
        }

        let pruned = self.instances.prune(&pending);
        pending.clear();

        debug!(invoked, failed, pruned, consumed, "Dispatch cycle complete");
        consumed
    }

    /// Runs every invocation on the blocking pool and waits for all of them.
    ///
    /// Routines may block; they must not occupy the async workers that
    /// drive other handlers' cycles.
    async fn spawn_all(
        handle: &Handle,
        id: &HandlerId,
        routine: &InstanceRoutine<P>,
        targets: Vec<Target>,
        params: &Arc<P>,
    ) -> Vec<Outcome> {
        let tasks: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let call = Arc::clone(&routine.call);
                let params = Arc::clone(params);
                let span = Span::current();
                handle.spawn_blocking(move || span.in_scope(|| call(&*target, &*params)))
            })
            .collect();

        future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.map_err(|join_error| {
                    if join_error.is_panic() {
                        InvocationError::Panicked {
                            handler: id.clone(),
                            message: panic_message(join_error.into_panic().as_ref()),
                        }
                    } else {
                        InvocationError::Aborted {
                            handler: id.clone(),
                        }
                    }
                })
            })
            .collect()
    }

    /// Runs every invocation on the calling thread, one after the other.
    fn call_all_inline(
        id: &HandlerId,
        routine: &InstanceRoutine<P>,
        targets: Vec<Target>,
        params: &P,
    ) -> Vec<Outcome> {
        targets
            .iter()
            .map(|target| {
                panic::catch_unwind(AssertUnwindSafe(|| (routine.call)(&**target, params)))
                    .map_err(|payload| InvocationError::Panicked {
                        handler: id.clone(),
                        message: panic_message(payload.as_ref()),
                    })
            })
            .collect()
    }
}

/// Renders a panic payload as text.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    /// Instance whose routine reports a fixed answer.
    struct Voter {
        answer: bool,
        calls: AtomicUsize,
    }

    impl Voter {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn vote(&self, _: &u32) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn voter_record() -> Arc<HandlerRecord<u32>> {
        Arc::new(HandlerRecord::bound(
            HandlerId::of::<Voter>("vote"),
            Routine::method(Voter::vote),
        ))
    }

    fn collecting_sink() -> (Arc<Mutex<Vec<String>>>, Arc<dyn crate::ErrorSink>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink_errors = Arc::clone(&errors);
        let sink: Arc<dyn crate::ErrorSink> = Arc::new(move |error: InvocationError| {
            sink_errors.lock().push(error.to_string());
        });
        (errors, sink)
    }

    #[tokio::test]
    async fn test_unbound_record_reports_consumed() {
        let record = HandlerRecord::<u32>::new();
        assert!(record.invoke(1).await);
    }

    #[tokio::test]
    async fn test_static_routine_returns_its_result() {
        let record = HandlerRecord::bound("even", Routine::function(|n: &u32| n % 2 == 0));
        assert!(record.invoke(2).await);
        assert!(!record.invoke(3).await);
        assert_eq!(record.instance_count(), 0);
    }

    #[tokio::test]
    async fn test_static_routine_without_bool_counts_as_consumed() {
        let seen = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&seen);
        let record = HandlerRecord::bound(
            "log",
            Routine::function(move |n: &u32| {
                probe.store(*n as usize, Ordering::SeqCst);
            }),
        );

        assert!(record.invoke(42).await);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_static_routine_runs_without_runtime() {
        let record = HandlerRecord::bound("odd", Routine::function(|n: &u32| n % 2 == 1));
        assert!(tokio_test::block_on(record.invoke(3)));
    }

    #[tokio::test]
    async fn test_static_failure_is_reported_not_propagated() {
        let (errors, sink) = collecting_sink();
        let record = HandlerRecord::bound(
            "fails",
            Routine::function(|_: &u32| -> Result<bool, BoxError> { Err("no device".into()) }),
        )
        .with_error_sink(sink);

        assert!(!record.invoke(0).await);
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no device"));
    }

    #[tokio::test]
    async fn test_static_panic_is_isolated() {
        let (errors, sink) = collecting_sink();
        let record = HandlerRecord::bound(
            "panics",
            Routine::function(|_: &u32| -> bool { panic!("static boom") }),
        )
        .with_error_sink(sink);

        assert!(!record.invoke(0).await);
        assert!(errors.lock()[0].contains("static boom"));
    }

    #[tokio::test]
    async fn test_zero_live_instances_is_not_consumed() {
        let record = voter_record();
        assert!(!record.invoke(0).await);

        let gone = Voter::new(true);
        record.register_instance(&gone).unwrap();
        drop(gone);
        assert!(!record.invoke(0).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_aggregation_is_logical_or() {
        let record = voter_record();
        let voters = [Voter::new(false), Voter::new(true), Voter::new(false)];
        for voter in &voters {
            record.register_instance(voter).unwrap();
        }
        assert!(record.invoke(0).await);
        assert!(voters.iter().all(|v| v.calls() == 1));

        let record = voter_record();
        let voters = [Voter::new(false), Voter::new(false), Voter::new(false)];
        for voter in &voters {
            record.register_instance(voter).unwrap();
        }
        assert!(!record.invoke(0).await);
        assert!(voters.iter().all(|v| v.calls() == 1));
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_invoked_twice() {
        let record = voter_record();
        let voter = Voter::new(false);
        record.register_instance(&voter).unwrap();
        record.register_instance(&voter).unwrap();

        record.invoke(0).await;
        assert_eq!(voter.calls(), 2);
    }

    #[tokio::test]
    async fn test_dead_refs_are_pruned_after_cycle() {
        let record = voter_record();
        let alive = Voter::new(false);
        let doomed = Voter::new(true);
        record.register_instance(&alive).unwrap();
        record.register_instance(&doomed).unwrap();

        drop(doomed);
        assert_eq!(record.instance_count(), 2);

        assert!(!record.invoke(0).await);
        assert_eq!(record.instance_count(), 1);
        assert_eq!(alive.calls(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_instance_is_not_invoked() {
        let record = voter_record();
        let voter = Voter::new(true);
        record.register_instance(&voter).unwrap();
        record.unregister_instance(&*voter);

        assert!(!record.invoke(0).await);
        assert_eq!(voter.calls(), 0);
    }

    /// Instance whose routine fails or panics on demand.
    struct Flaky {
        mode: u8,
    }

    impl Flaky {
        fn handle(&self, _: &u32) -> Result<bool, BoxError> {
            match self.mode {
                0 => Ok(false),
                1 => Ok(true),
                2 => Err("sensor offline".into()),
                _ => panic!("flaky instance panicked"),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_instances_do_not_block_siblings() {
        let (errors, sink) = collecting_sink();
        let record = HandlerRecord::bound("flaky", Routine::method(Flaky::handle))
            .with_error_sink(sink);

        let instances: Vec<_> = [2, 3, 1, 0]
            .into_iter()
            .map(|mode| Arc::new(Flaky { mode }))
            .collect();
        for instance in &instances {
            record.register_instance(instance).unwrap();
        }

        assert!(record.invoke(0).await);

        let errors = errors.lock();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("sensor offline")));
        assert!(errors.iter().any(|e| e.contains("flaky instance panicked")));
    }

    #[tokio::test]
    async fn test_only_failures_report_not_consumed() {
        let (_errors, sink) = collecting_sink();
        let record = HandlerRecord::bound("flaky", Routine::method(Flaky::handle))
            .with_error_sink(sink);
        let broken = Arc::new(Flaky { mode: 2 });
        record.register_instance(&broken).unwrap();

        assert!(!record.invoke(0).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_handlers_do_not_block_each_other() {
        struct Gate {
            open: Arc<AtomicBool>,
        }

        impl Gate {
            fn wait(&self, _: &u32) -> bool {
                while !self.open.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                true
            }
        }

        let open = Arc::new(AtomicBool::new(false));
        let slow = Arc::new(HandlerRecord::bound("slow", Routine::method(Gate::wait)));
        let gate = Arc::new(Gate {
            open: Arc::clone(&open),
        });
        slow.register_instance(&gate).unwrap();

        let fast = voter_record();
        let voter = Voter::new(true);
        fast.register_instance(&voter).unwrap();

        let slow_task = {
            let slow = Arc::clone(&slow);
            tokio::spawn(async move { slow.invoke(0).await })
        };

        let fast_result = tokio::time::timeout(Duration::from_secs(5), fast.invoke(0)).await;
        assert_eq!(fast_result.ok(), Some(true));
        assert!(!slow_task.is_finished());

        open.store(true, Ordering::SeqCst);
        assert!(slow_task.await.unwrap());
    }

    /// Instance whose routine blocks its thread until the latch opens.
    struct Latch {
        open: Arc<AtomicBool>,
    }

    impl Latch {
        fn wait(&self, _: &u32) -> bool {
            while !self.open.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocked_routines_do_not_starve_worker_pool() {
        let open = Arc::new(AtomicBool::new(false));
        let slow = Arc::new(HandlerRecord::bound("slow", Routine::method(Latch::wait)));
        // More blocked instances than there are async workers.
        let latches: Vec<_> = (0..3)
            .map(|_| {
                Arc::new(Latch {
                    open: Arc::clone(&open),
                })
            })
            .collect();
        for latch in &latches {
            slow.register_instance(latch).unwrap();
        }

        let fast = voter_record();
        let voter = Voter::new(true);
        fast.register_instance(&voter).unwrap();

        let slow_task = {
            let slow = Arc::clone(&slow);
            tokio::spawn(async move { slow.invoke(0).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let fast_task = {
            let fast = Arc::clone(&fast);
            tokio::spawn(async move { fast.invoke(0).await })
        };
        let fast_result = tokio::time::timeout(Duration::from_secs(5), fast_task).await;
        open.store(true, Ordering::SeqCst);

        assert_eq!(fast_result.ok().and_then(Result::ok), Some(true));
        assert!(slow_task.await.unwrap());
    }

    #[test]
    fn test_instances_run_inline_without_tokio_runtime() {
        let (errors, sink) = collecting_sink();
        let record = HandlerRecord::bound("flaky", Routine::method(Flaky::handle))
            .with_error_sink(sink);
        let instances: Vec<_> = [0, 3, 1]
            .into_iter()
            .map(|mode| Arc::new(Flaky { mode }))
            .collect();
        for instance in &instances {
            record.register_instance(instance).unwrap();
        }
        let gone = Arc::new(Flaky { mode: 1 });
        record.register_instance(&gone).unwrap();
        drop(gone);

        assert!(futures::executor::block_on(record.invoke(0)));
        assert_eq!(record.instance_count(), 3);

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("flaky instance panicked"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_use_of_one_handler_stays_consistent() {
        let record = voter_record();
        let keepers: Vec<_> = (0..8).map(|_| Voter::new(false)).collect();
        for keeper in &keepers {
            record.register_instance(keeper).unwrap();
        }

        let mut workers = Vec::new();
        for worker in 0..8 {
            let record = Arc::clone(&record);
            workers.push(tokio::spawn(async move {
                for round in 0..25 {
                    let temp = Voter::new(worker % 2 == 0);
                    record.register_instance(&temp).unwrap();
                    record.invoke(round).await;
                    if round % 2 == 0 {
                        record.unregister_instance(&*temp);
                    }
                    // Odd rounds leave a dead ref for a later cycle to prune.
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        assert_eq!(record.live_instance_count(), keepers.len());
        record.invoke(0).await;
        assert_eq!(record.instance_count(), keepers.len());
        assert!(keepers.iter().all(|k| k.calls() >= 1));
    }
}
