//! Rally Server - 排球局报名与提醒服务
//!
//! # 架构概述
//!
//! 本模块是 Rally Server 的主入口，提供以下核心功能：
//!
//! - **报名引擎** (`registration`): 容量限制 + FIFO 候补的报名状态机
//! - **数据库** (`db`): 嵌入式 redb 存储与事务仓库
//! - **事件总线** (`bus`): 进程内领域事件分发
//! - **调度器** (`scheduler`): 延迟任务队列与赛事/付款提醒
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! rally-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── api/           # HTTP 路由和处理器
//! ├── bus/           # 事件总线
//! ├── db/            # 数据库层 (redb + 仓库抽象)
//! ├── registration/  # 报名引擎
//! ├── scheduler/     # 任务队列与提醒
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod bus;
pub mod core;
pub mod db;
pub mod registration;
pub mod scheduler;
pub mod utils;

// Re-export 公共类型
pub use bus::{EventBus, EventHandler};
pub use core::{Config, Engine, Server, ServerState};
pub use db::{GameRepository, GameStore, LoggedRepository, RedbRepository};
pub use registration::{EngineError, RegistrationEngine};
pub use scheduler::{JobQueue, ReminderKind, ReminderScheduler};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

pub fn print_banner() {
    println!(
        r#"
    ____        ____
   / __ \____ _/ / /_  __
  / /_/ / __ `/ / / / / /
 / _, _/ /_/ / / / /_/ /
/_/ |_|\__,_/_/_/\__, /
                /____/
    "#
    );
}
