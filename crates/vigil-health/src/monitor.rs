//! Scheduler — the tick loop that drives the remediation engine.
//!
//! Each tick walks the registry once, in order, then sleeps for the
//! configured interval. Shutdown is cooperative: the flag is checked at the
//! tick boundary, between targets, and during the sleep, never in the middle
//! of a target's remediation.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info};

use vigil_core::{Notice, Registry, TargetId};

use crate::engine::{RemediationEngine, TargetOutcome};

/// Per-target outcomes of one tick, in processing order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub outcomes: Vec<(TargetId, TargetOutcome)>,
}

impl TickReport {
    pub fn outcome(&self, target_id: &TargetId) -> Option<TargetOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == target_id)
            .map(|(_, outcome)| *outcome)
    }
}

pub struct Scheduler {
    registry: Registry,
    engine: RemediationEngine,
    interval: Duration,
    ticks: u64,
}

impl Scheduler {
    pub fn new(registry: Registry, engine: RemediationEngine, interval: Duration) -> Self {
        Self {
            registry,
            engine,
            interval,
            ticks: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Process every target once.
    ///
    /// A panic while processing one target is caught and recorded as
    /// [`TargetOutcome::Faulted`]; the remaining targets still run. If
    /// shutdown is requested, targets not yet started are skipped.
    pub async fn tick(&mut self, shutdown: &mut watch::Receiver<bool>) -> TickReport {
        self.ticks += 1;
        let tick = self.ticks;
        debug!(tick, targets = self.registry.len(), "tick starting");

        let mut report = TickReport::default();
        for target in self.registry.iter_mut() {
            if *shutdown.borrow() {
                info!(tick, "shutdown requested, skipping remaining targets");
                break;
            }

            let target_id = target.target_id.clone();
            let outcome = AssertUnwindSafe(self.engine.process(target, shutdown))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    error!(
                        %target_id,
                        panic = panic_message(panic.as_ref()),
                        "target processing panicked"
                    );
                    TargetOutcome::Faulted
                });

            debug!(%target_id, ?outcome, failures = target.failure_count, "target processed");
            report.outcomes.push((target_id, outcome));
        }

        report
    }

    /// Tick until shutdown, then send the stop notice exactly once.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            targets = self.registry.len(),
            "monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.tick(&mut shutdown).await;

            // The address wait may already have consumed the change.
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    debug!("sleep interrupted by shutdown");
                    break;
                }
            }
        }

        info!(ticks = self.ticks, "monitor shutting down");
        self.engine.notify(&Notice::monitoring_stopped()).await;
        info!("monitor stopped");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::fakes::Fakes;

    fn scheduler(fakes: &Fakes, targets: &str) -> Scheduler {
        Scheduler::new(
            Registry::parse(targets),
            RemediationEngine::new(fakes.collaborators(), EngineSettings::default()),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn empty_registry_ticks_with_no_work() {
        let fakes = Fakes::default();
        let mut scheduler = scheduler(&fakes, "");
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.tick(&mut rx).await;
        assert!(report.outcomes.is_empty());
        assert_eq!(scheduler.ticks(), 1);
    }

    #[tokio::test]
    async fn tick_visits_targets_in_registry_order() {
        let fakes = Fakes::default();
        fakes.resolver.set_address("i-01", "10.0.0.1");
        fakes.resolver.set_address("i-02", "10.0.0.2");
        fakes.resolver.set_address("i-03", "10.0.0.3");
        let mut scheduler = scheduler(&fakes, "i-02:b,i-01:a,i-03:c");
        let (_tx, mut rx) = watch::channel(false);

        scheduler.tick(&mut rx).await;
        assert_eq!(fakes.prober.probed(), ["10.0.0.2", "10.0.0.1", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn notifier_failure_on_one_target_does_not_block_the_next() {
        let fakes = Fakes::default();
        fakes.resolver.set_address("i-aaa", "10.0.0.1");
        fakes.resolver.set_address("i-bbb", "10.0.0.2");
        fakes.prober.script("10.0.0.1", &[false]);
        fakes.prober.script("10.0.0.2", &[false]);
        fakes.notifier.fail_when_body_contains("i-aaa");
        let mut scheduler = scheduler(&fakes, "i-aaa:nginx,i-bbb:nginx1");
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.tick(&mut rx).await;
        assert_eq!(
            report.outcome(&TargetId::from("i-bbb")),
            Some(TargetOutcome::SoftRemediated { attempt: 1 })
        );
        assert_eq!(fakes.executor.commands().len(), 2);
        let sent = fakes.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("i-bbb"));
    }

    #[tokio::test]
    async fn panicking_collaborator_is_isolated() {
        let fakes = Fakes::default();
        fakes.resolver.set_address("i-01", "10.0.0.1");
        fakes.resolver.set_address("i-02", "10.0.0.2");
        fakes.prober.panic_on("10.0.0.1");
        let mut scheduler = scheduler(&fakes, "i-01:a,i-02:b");
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.tick(&mut rx).await;
        assert_eq!(
            report.outcome(&TargetId::from("i-01")),
            Some(TargetOutcome::Faulted)
        );
        assert_eq!(
            report.outcome(&TargetId::from("i-02")),
            Some(TargetOutcome::Healthy)
        );
    }

    #[tokio::test]
    async fn repeated_successes_are_idempotent() {
        let fakes = Fakes::default();
        fakes.resolver.set_address("i-01", "10.0.0.1");
        let mut scheduler = scheduler(&fakes, "i-01:nginx");
        let (_tx, mut rx) = watch::channel(false);

        for _ in 0..5 {
            let report = scheduler.tick(&mut rx).await;
            assert_eq!(report.outcomes[0].1, TargetOutcome::Healthy);
        }
        assert!(scheduler.registry().iter().all(|t| t.failure_count == 0));
        assert!(fakes.notifier.sent().is_empty());
        assert!(fakes.executor.commands().is_empty());
        assert!(fakes.controller.reboots().is_empty());
    }

    #[tokio::test]
    async fn shutdown_before_tick_skips_all_targets() {
        let fakes = Fakes::default();
        fakes.resolver.set_address("i-01", "10.0.0.1");
        let mut scheduler = scheduler(&fakes, "i-01:nginx");
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let report = scheduler.tick(&mut rx).await;
        assert!(report.outcomes.is_empty());
        assert!(fakes.prober.probed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_sleep_sends_one_notice_and_stops() {
        let fakes = Fakes::default();
        fakes.resolver.set_address("i-01", "10.0.0.1");
        let scheduler = scheduler(&fakes, "i-01:nginx");
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(rx));

        // Two ticks complete (t=0, t=300); signal arrives during the second sleep.
        tokio::time::sleep(Duration::from_secs(450)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(fakes.prober.probed().len(), 2);
        assert_eq!(fakes.notifier.subjects(), ["Vigil monitoring stopped"]);

        // No further ticks after run returned.
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(fakes.prober.probed().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_address_wait_stops_without_sleeping() {
        let fakes = Fakes::default();
        fakes.resolver.unavailable_for("i-01", 1000);
        let scheduler = scheduler(&fakes, "i-01:nginx");
        let (tx, rx) = watch::channel(false);
        let started = tokio::time::Instant::now();

        let handle = tokio::spawn(scheduler.run(rx));
        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // The sender stays alive, so only the flag itself can end the loop.
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(fakes.controller.starts().len(), 1);
        assert_eq!(fakes.notifier.subjects(), ["Vigil monitoring stopped"]);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_notice_failure_is_swallowed() {
        let fakes = Fakes::default();
        fakes.notifier.fail_when_body_contains("no longer running");
        let scheduler = scheduler(&fakes, "");
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(fakes.notifier.sent().is_empty());
    }

    #[test]
    fn panic_message_extracts_text() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
