//! 提醒调度
//!
//! 把比赛的开始时间换算成四个延迟动作的触发时刻并投递到任务后端：
//! 赛前 24h / 2h 的比赛提醒，赛后 12h / 24h 的付款提醒。任务触发时
//! 只按 kind 重新发布对应的领域事件，提醒内容和送达是下游订阅者的事。
//!
//! 窗口已过（delay ≤ 0）的提醒静默跳过——迟到的提醒没有价值，临开赛
//! 前补发只会骚扰用户。
//!
//! 比赛取消后已入队的提醒不撤回：触发时由下游检查当前状态。

use async_trait::async_trait;
use shared::util::{now_millis, MILLIS_PER_HOUR};
use shared::{EventPayload, GameEvent};
use std::sync::Arc;
use std::time::Duration;

use crate::bus::{EventBus, EventHandler};

pub mod job_queue;

pub use job_queue::{JobBackend, JobHandler, JobQueue, JobRecord};

/// Queue name for all reminder jobs
pub const REMINDER_QUEUE: &str = "reminders";

/// The four delayed actions derived from a game's start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Game24h,
    Game2h,
    Payment12h,
    Payment24h,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 4] = [
        ReminderKind::Game24h,
        ReminderKind::Game2h,
        ReminderKind::Payment12h,
        ReminderKind::Payment24h,
    ];

    /// Job kind tag used in the backend
    pub fn kind_name(self) -> &'static str {
        match self {
            ReminderKind::Game24h => "game-reminder-24h",
            ReminderKind::Game2h => "game-reminder-2h",
            ReminderKind::Payment12h => "payment-reminder-12h",
            ReminderKind::Payment24h => "payment-reminder-24h",
        }
    }

    pub fn from_kind_name(name: &str) -> Option<Self> {
        match name {
            "game-reminder-24h" => Some(ReminderKind::Game24h),
            "game-reminder-2h" => Some(ReminderKind::Game2h),
            "payment-reminder-12h" => Some(ReminderKind::Payment12h),
            "payment-reminder-24h" => Some(ReminderKind::Payment24h),
            _ => None,
        }
    }

    /// Fire instant relative to the game's start (millis; negative =
    /// before start)
    pub fn offset_millis(self) -> i64 {
        match self {
            ReminderKind::Game24h => -24 * MILLIS_PER_HOUR,
            ReminderKind::Game2h => -2 * MILLIS_PER_HOUR,
            ReminderKind::Payment12h => 12 * MILLIS_PER_HOUR,
            ReminderKind::Payment24h => 24 * MILLIS_PER_HOUR,
        }
    }

    /// Domain event re-published when the job fires
    pub fn event(self, game_id: &str) -> GameEvent {
        match self {
            ReminderKind::Game24h => GameEvent::game_reminder_24h(game_id),
            ReminderKind::Game2h => GameEvent::game_reminder_2h(game_id),
            ReminderKind::Payment12h => GameEvent::payment_reminder_12h(game_id),
            ReminderKind::Payment24h => GameEvent::payment_reminder_24h(game_id),
        }
    }
}

/// Translates start times into delayed job submissions
///
/// Stateless and restart-safe: jobs already enqueued in the backend
/// survive a restart, nothing is recomputed here.
pub struct ReminderScheduler {
    backend: Arc<dyn JobBackend>,
}

impl ReminderScheduler {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Schedule one reminder. Silent no-op when its window has already
    /// passed.
    pub async fn schedule(&self, kind: ReminderKind, game_id: &str, starts_at: i64) {
        let fire_at = starts_at + kind.offset_millis();
        let delay = fire_at - now_millis();
        if delay <= 0 {
            tracing::debug!(game_id, kind = kind.kind_name(), "reminder window passed, skipped");
            return;
        }

        let payload = serde_json::json!({ "eventId": game_id });
        if let Err(e) = self
            .backend
            .submit(
                REMINDER_QUEUE,
                kind.kind_name(),
                payload,
                Duration::from_millis(delay as u64),
            )
            .await
        {
            // Scheduling is a reaction; it must never fail the operation
            // that triggered it
            tracing::warn!(game_id, kind = kind.kind_name(), error = %e, "failed to submit reminder job");
        }
    }

    /// Schedule all four reminders for a game
    pub async fn schedule_all(&self, game_id: &str, starts_at: i64) {
        for kind in ReminderKind::ALL {
            self.schedule(kind, game_id, starts_at).await;
        }
    }
}

/// Fires when a reminder job becomes due: re-publishes the matching
/// domain event and nothing else
pub struct ReminderJobHandler {
    bus: Arc<EventBus>,
}

impl ReminderJobHandler {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl JobHandler for ReminderJobHandler {
    fn queue(&self) -> &str {
        REMINDER_QUEUE
    }

    async fn handle(&self, kind: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        let kind = ReminderKind::from_kind_name(kind)
            .ok_or_else(|| anyhow::anyhow!("unknown reminder kind: {kind}"))?;
        let game_id = payload["eventId"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("reminder payload missing eventId"))?;

        self.bus.publish(&kind.event(game_id)).await;
        Ok(())
    }
}

/// Bus subscriber that schedules reminders when a game is created
pub struct ReminderReactor {
    scheduler: Arc<ReminderScheduler>,
}

impl ReminderReactor {
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl EventHandler for ReminderReactor {
    fn name(&self) -> &str {
        "reminder-reactor"
    }

    async fn handle(&self, event: &GameEvent) -> anyhow::Result<()> {
        if let EventPayload::EventCreated {
            game_id, starts_at, ..
        } = &event.payload
        {
            self.scheduler.schedule_all(game_id, *starts_at).await;
        }
        Ok(())
    }
}
