//! 进程内事件总线
//!
//! 按事件类型注册订阅者，`publish` 并发调用所有匹配的处理器并等待全部
//! 完成。订阅在启动时完成（组合根），之后只读；没有持久化——无人订阅时
//! 发生的事件直接丢弃。
//!
//! 处理器失败只记录日志，绝不让触发它的领域操作失败或回滚。

use async_trait::async_trait;
use futures::future::join_all;
use shared::{GameEvent, GameEventType};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// 领域事件处理器
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name, for log attribution
    fn name(&self) -> &str;

    async fn handle(&self, event: &GameEvent) -> anyhow::Result<()>;
}

/// In-process pub/sub keyed by event type
pub struct EventBus {
    handlers: RwLock<HashMap<GameEventType, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// 注册一个处理器
    pub fn subscribe(&self, event_type: GameEventType, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(event_type).or_default().push(handler);
    }

    /// 为多个事件类型注册同一个处理器
    pub fn subscribe_many(&self, event_types: &[GameEventType], handler: Arc<dyn EventHandler>) {
        for event_type in event_types {
            self.subscribe(*event_type, Arc::clone(&handler));
        }
    }

    /// 发布事件：并发调用所有订阅者，等待全部完成后返回。
    ///
    /// 处理器之间没有顺序保证；单个处理器失败只记 warn 日志。
    pub async fn publish(&self, event: &GameEvent) {
        let matched: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            handlers
                .get(&event.event_type)
                .map(|list| list.to_vec())
                .unwrap_or_default()
        };

        if matched.is_empty() {
            tracing::trace!(event_type = ?event.event_type, "no subscribers, event dropped");
            return;
        }

        let futures = matched.iter().map(|handler| {
            let handler = Arc::clone(handler);
            async move {
                if let Err(e) = handler.handle(event).await {
                    tracing::warn!(
                        handler = handler.name(),
                        event_type = ?event.event_type,
                        event_id = %event.id,
                        error = %e,
                        "event handler failed"
                    );
                }
            }
        });
        join_all(futures).await;
    }

    /// 依次发布一批事件（同一操作产生的事件保持顺序）
    pub async fn publish_all(&self, events: &[GameEvent]) {
        for event in events {
            self.publish(event).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
