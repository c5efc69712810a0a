use std::sync::Arc;
use std::time::Duration;

use shared::GameEventType;

use crate::bus::EventBus;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::Config;
use crate::db::{GameStore, LoggedRepository, RedbRepository};
use crate::registration::RegistrationEngine;
use crate::scheduler::{JobQueue, ReminderJobHandler, ReminderReactor, ReminderScheduler};

/// 组合根装配出的引擎类型
pub type Engine = RegistrationEngine<LoggedRepository<RedbRepository>>;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 组合根：所有依赖在这里一次性装配成一张单向依赖图——
/// Bus 不依赖任何人；Scheduler 依赖 Bus 和任务后端；
/// Engine 依赖 Bus 和 Repository。没有全局单例，没有环。
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | engine | 注册引擎（Game/Registration 的唯一写入者） |
/// | bus | 进程内事件总线 |
/// | jobs | 持久化延迟任务队列 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 注册引擎
    pub engine: Arc<Engine>,
    /// 事件总线
    pub bus: Arc<EventBus>,
    /// 延迟任务队列
    pub jobs: Arc<JobQueue>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序装配：
    /// 1. 工作目录
    /// 2. 存储 (work_dir/games.redb) → 带日志装饰的仓储
    /// 3. 事件总线 → 注册引擎
    /// 4. 任务队列 (work_dir/jobs.redb) → 提醒调度器
    /// 5. 订阅接线：EventCreated → ReminderReactor；reminders 队列 →
    ///    ReminderJobHandler
    ///
    /// 接线发生在任何领域事件可能产生之前。
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let store = GameStore::open(config.games_db_path())?;
        let repo = Arc::new(LoggedRepository::new(RedbRepository::new(store)));
        let bus = Arc::new(EventBus::new());
        let engine = Arc::new(RegistrationEngine::new(repo, bus.clone()));

        let jobs = Arc::new(JobQueue::open(
            config.jobs_db_path(),
            config.job_max_attempts,
            config.job_retry_delay_ms,
        )?);
        jobs.register_handler(Arc::new(ReminderJobHandler::new(bus.clone())));

        let scheduler = Arc::new(ReminderScheduler::new(
            jobs.clone() as Arc<dyn crate::scheduler::JobBackend>
        ));
        bus.subscribe(
            GameEventType::EventCreated,
            Arc::new(ReminderReactor::new(scheduler)),
        );

        tracing::info!(work_dir = %config.work_dir, "server state initialized");

        Ok(Self {
            config: config.clone(),
            engine,
            bus,
            jobs,
        })
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let jobs = self.jobs.clone();
        let poll_interval = Duration::from_millis(self.config.job_poll_interval_ms);
        let shutdown = tasks.shutdown_token();
        tasks.spawn("job_worker", TaskKind::Worker, async move {
            jobs.run(poll_interval, shutdown).await;
        });
    }
}
