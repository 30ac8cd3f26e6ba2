//! Check-cycle scheduling
//!
//! Two loops share one [`Orchestrator`]: an interval loop driving
//! change-driven cycles and a calendar loop driving periodic cycles. Each
//! tick runs its cycle as a separate task, so a slow cycle never delays the
//! next tick. With `serialize_cycles` set, a tick that fires while another
//! cycle is still running is skipped.

mod calendar;

pub use calendar::next_periodic;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use vigil_health::TickMode;

use crate::config::SchedulerConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
struct CycleRunner {
    orchestrator: Arc<Orchestrator>,
    lock: Option<Arc<Mutex<()>>>,
}

impl CycleRunner {
    /// Spawn a cycle into `cycles`. In serialized mode the lock is taken
    /// here, and the tick is skipped while another cycle holds it.
    fn spawn(&self, cycles: &mut JoinSet<()>, mode: TickMode) {
        let guard = match &self.lock {
            Some(lock) => match lock.clone().try_lock_owned() {
                Ok(guard) => Some(guard),
                Err(_) => {
                    warn!(%mode, "Previous check cycle still running, skipping tick");
                    return;
                }
            },
            None => None,
        };

        let orchestrator = self.orchestrator.clone();
        cycles.spawn(async move {
            let _guard = guard;
            if let Err(e) = orchestrator.run_cycle(mode).await {
                error!(error = %e, %mode, "Check cycle failed");
            }
        });
    }
}

/// Scheduler state
pub struct Scheduler {
    runner: CycleRunner,
    check_interval: Duration,
    periodic_times: Vec<NaiveTime>,
    periodic_weekdays: Vec<Weekday>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(config: &SchedulerConfig, orchestrator: Arc<Orchestrator>) -> DaemonResult<Self> {
        if config.check_interval_secs == 0 {
            return Err(DaemonError::Scheduler(
                "check interval must be greater than zero".to_string(),
            ));
        }

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            runner: CycleRunner {
                orchestrator,
                lock: config
                    .serialize_cycles
                    .then(|| Arc::new(Mutex::new(()))),
            },
            check_interval: Duration::from_secs(config.check_interval_secs),
            periodic_times: config.parsed_periodic_times()?,
            periodic_weekdays: config.periodic_weekdays.clone(),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Start the scheduler background tasks
    pub async fn start(&self) {
        let mut handles = self.handles.lock().await;

        handles.push(tokio::spawn(run_interval(
            self.runner.clone(),
            self.check_interval,
            self.shutdown_tx.subscribe(),
        )));

        if self.periodic_times.is_empty() || self.periodic_weekdays.is_empty() {
            info!("No periodic report times configured");
        } else {
            handles.push(tokio::spawn(run_periodic(
                self.runner.clone(),
                self.periodic_times.clone(),
                self.periodic_weekdays.clone(),
                self.shutdown_tx.subscribe(),
            )));
        }

        info!(
            check_interval_secs = self.check_interval.as_secs(),
            periodic_times = ?self.periodic_times,
            serialized = self.runner.lock.is_some(),
            "Scheduler started"
        );
    }

    /// Stop ticking and wait for in-flight cycles to finish
    pub async fn stop(&self) -> DaemonResult<()> {
        self.shutdown_tx.send_replace(true);

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            handle
                .await
                .map_err(|e| DaemonError::Scheduler(e.to_string()))?;
        }

        info!("Scheduler stopped");
        Ok(())
    }
}

async fn run_interval(runner: CycleRunner, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                runner.spawn(&mut cycles, TickMode::ChangeDriven);
            }
            Some(_) = cycles.join_next() => {}
        }
    }

    drain(cycles).await;
}

async fn run_periodic(
    runner: CycleRunner,
    times: Vec<NaiveTime>,
    weekdays: Vec<Weekday>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cycles = JoinSet::new();
    let mut last_fired: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        let after = last_fired.map_or(now, |fired| fired.max(now));
        let Some(next) = next_periodic(after, &times, &weekdays) else {
            break;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(wait) => {
                info!(trigger = %next, "Periodic report due");
                last_fired = Some(next);
                runner.spawn(&mut cycles, TickMode::Periodic);
            }
            Some(_) = cycles.join_next() => {}
        }
    }

    drain(cycles).await;
}

async fn drain(mut cycles: JoinSet<()>) {
    while let Some(result) = cycles.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Check cycle task panicked");
        }
    }
}
