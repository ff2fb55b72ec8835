//! scheduler.rs: one daily trigger per subscriber, driven by a single loop.
//!
//! The job table is keyed strictly by subscriber: installing a job replaces
//! that subscriber's previous trigger and nothing else. The loop never runs a
//! digest itself; due jobs become `DeliveryTask`s on the dispatcher queue.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use metrics::gauge;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};

use crate::SubscriberId;

/// A fire observed later than this past its instant is skipped, not run late.
pub const MISFIRE_GRACE_SECS: i64 = 300;

/// Upper bound on one sleep, so wall-clock jumps are noticed.
const MAX_SLEEP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJob {
    pub subscriber_id: SubscriberId,
    pub display_name: String,
    pub trigger_hour_utc: u32,
    pub trigger_minute_utc: u32,
    pub next_fire: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryReason {
    /// Out-of-band send right after (re)subscribing.
    Subscribed,
    Scheduled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTask {
    pub subscriber_id: SubscriberId,
    pub display_name: String,
    pub reason: DeliveryReason,
}

/// Next UTC `hour:minute` strictly after `after`.
pub fn next_occurrence(after: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let hour = hour.min(23);
    let minute = minute.min(59);
    let today = after
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_default()
        .and_utc();
    if today > after {
        today
    } else {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
    }
}

/// Uniformly random `(hour, minute)`.
pub fn random_trigger_time<R: Rng + ?Sized>(rng: &mut R) -> (u32, u32) {
    (rng.random_range(0..24), rng.random_range(0..60))
}

pub struct Scheduler {
    jobs: Mutex<HashMap<SubscriberId, ScheduledJob>>,
    wake: Notify,
    tasks: mpsc::UnboundedSender<DeliveryTask>,
}

impl Scheduler {
    pub fn new(tasks: mpsc::UnboundedSender<DeliveryTask>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            wake: Notify::new(),
            tasks,
        }
    }

    /// Send one digest now and (re)install a daily trigger at a random time.
    pub fn subscribe(&self, subscriber_id: SubscriberId, display_name: &str) -> ScheduledJob {
        let (hour, minute) = random_trigger_time(&mut rand::rng());
        self.subscribe_at(subscriber_id, display_name, hour, minute, Utc::now())
    }

    pub fn subscribe_at(
        &self,
        subscriber_id: SubscriberId,
        display_name: &str,
        hour: u32,
        minute: u32,
        now: DateTime<Utc>,
    ) -> ScheduledJob {
        self.enqueue(DeliveryTask {
            subscriber_id,
            display_name: display_name.to_string(),
            reason: DeliveryReason::Subscribed,
        });
        self.install(subscriber_id, display_name, hour, minute, now)
    }

    /// Replace (or create) the trigger for one subscriber.
    pub fn install(
        &self,
        subscriber_id: SubscriberId,
        display_name: &str,
        hour: u32,
        minute: u32,
        now: DateTime<Utc>,
    ) -> ScheduledJob {
        let job = ScheduledJob {
            subscriber_id,
            display_name: display_name.to_string(),
            trigger_hour_utc: hour.min(23),
            trigger_minute_utc: minute.min(59),
            next_fire: next_occurrence(now, hour, minute),
        };
        let total = {
            let mut jobs = self.jobs.lock().expect("scheduler mutex poisoned");
            jobs.insert(subscriber_id, job.clone());
            jobs.len()
        };
        gauge!("scheduler_jobs").set(total as f64);
        tracing::info!(
            target: "scheduler",
            subscriber = subscriber_id,
            "scheduled daily message at {:02}:{:02} UTC (next {})",
            job.trigger_hour_utc,
            job.trigger_minute_utc,
            job.next_fire.to_rfc3339()
        );
        self.wake.notify_one();
        job
    }

    /// Remove one subscriber's trigger. Returns whether one existed.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) -> bool {
        let (removed, total) = {
            let mut jobs = self.jobs.lock().expect("scheduler mutex poisoned");
            let removed = jobs.remove(&subscriber_id).is_some();
            (removed, jobs.len())
        };
        gauge!("scheduler_jobs").set(total as f64);
        if removed {
            tracing::info!(target: "scheduler", subscriber = subscriber_id, "unsubscribed");
            self.wake.notify_one();
        }
        removed
    }

    pub fn job(&self, subscriber_id: SubscriberId) -> Option<ScheduledJob> {
        let jobs = self.jobs.lock().expect("scheduler mutex poisoned");
        jobs.get(&subscriber_id).cloned()
    }

    /// All jobs, ordered by subscriber id.
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        let jobs = self.jobs.lock().expect("scheduler mutex poisoned");
        let mut out: Vec<ScheduledJob> = jobs.values().cloned().collect();
        out.sort_by_key(|j| j.subscriber_id);
        out
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().expect("scheduler mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        let jobs = self.jobs.lock().expect("scheduler mutex poisoned");
        jobs.values().map(|j| j.next_fire).min()
    }

    /// Fire every job due at `now` and advance it to its next occurrence.
    /// Fires later than the grace period are skipped. Returns the tasks sent.
    pub fn fire_due(&self, now: DateTime<Utc>) -> Vec<DeliveryTask> {
        let mut fired = Vec::new();
        {
            let mut jobs = self.jobs.lock().expect("scheduler mutex poisoned");
            for job in jobs.values_mut() {
                if job.next_fire > now {
                    continue;
                }
                let late_by = (now - job.next_fire).num_seconds();
                if late_by <= MISFIRE_GRACE_SECS {
                    fired.push(DeliveryTask {
                        subscriber_id: job.subscriber_id,
                        display_name: job.display_name.clone(),
                        reason: DeliveryReason::Scheduled,
                    });
                } else {
                    tracing::warn!(target: "scheduler", subscriber = job.subscriber_id, late_by, "missed trigger skipped");
                }
                job.next_fire =
                    next_occurrence(now, job.trigger_hour_utc, job.trigger_minute_utc);
            }
        }
        for task in &fired {
            tracing::info!(target: "scheduler", subscriber = task.subscriber_id, "trigger fired");
            self.enqueue(task.clone());
        }
        fired
    }

    fn enqueue(&self, task: DeliveryTask) {
        if self.tasks.send(task).is_err() {
            tracing::error!(target: "scheduler", "delivery queue closed, task dropped");
        }
    }

    /// Drive the job table on the wall clock until the process exits.
    pub async fn run(self: std::sync::Arc<Self>) {
        self.run_with(Utc::now).await
    }

    /// Same loop with the current instant taken from `clock`.
    pub async fn run_with<C>(self: std::sync::Arc<Self>, clock: C)
    where
        C: Fn() -> DateTime<Utc> + Send + Sync,
    {
        tracing::info!(target: "scheduler", "scheduler loop started");
        loop {
            let now = clock();
            self.fire_due(now);

            let sleep_for = self
                .next_wakeup()
                .and_then(|t| (t - now).to_std().ok())
                .unwrap_or(MAX_SLEEP)
                .min(MAX_SLEEP);

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.wake.notified() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, h, m, s).unwrap()
    }

    #[test]
    fn next_occurrence_is_strictly_after() {
        assert_eq!(next_occurrence(at(8, 0, 0), 9, 30), at(9, 30, 0));
        assert_eq!(
            next_occurrence(at(9, 30, 0), 9, 30),
            Utc.with_ymd_and_hms(2025, 9, 7, 9, 30, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(at(23, 59, 30), 0, 0),
            Utc.with_ymd_and_hms(2025, 9, 7, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn random_times_are_in_range() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let (h, m) = random_trigger_time(&mut rng);
            assert!(h < 24 && m < 60);
        }
    }

    #[test]
    fn fire_once_then_advance_a_day() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let s = Scheduler::new(tx);
        s.install(1, "Jamie", 9, 0, at(8, 0, 0));

        assert!(s.fire_due(at(8, 59, 59)).is_empty());
        assert_eq!(s.fire_due(at(9, 0, 10)).len(), 1);
        // Same day again: nothing.
        assert!(s.fire_due(at(9, 1, 0)).is_empty());
        assert_eq!(
            s.job(1).unwrap().next_fire,
            Utc.with_ymd_and_hms(2025, 9, 7, 9, 0, 0).unwrap()
        );
        assert_eq!(rx.try_recv().unwrap().reason, DeliveryReason::Scheduled);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn late_fire_is_skipped_not_caught_up() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let s = Scheduler::new(tx);
        s.install(1, "Jamie", 9, 0, at(8, 0, 0));
        assert!(s.fire_due(at(11, 0, 0)).is_empty());
        assert!(rx.try_recv().is_err());
        assert_eq!(
            s.job(1).unwrap().next_fire,
            Utc.with_ymd_and_hms(2025, 9, 7, 9, 0, 0).unwrap()
        );
    }
}
