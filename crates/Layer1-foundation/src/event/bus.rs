//! Event Bus - 상태 이벤트 브로드캐스트
//!
//! 여러 태스크의 이벤트를 한 채널로 모아 SSE 구독자들에게 전달합니다.

use super::sink::StatusSink;
use super::types::{StatusEvent, StatusEventType};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

// ============================================================================
// EventFilter
// ============================================================================

/// 이벤트 필터
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// 태스크 ID 필터
    pub task_id: Option<String>,

    /// 이벤트 타입 필터
    pub event_types: Option<Vec<StatusEventType>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 특정 태스크만
    pub fn for_task(task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            event_types: None,
        }
    }

    pub fn with_event_types(mut self, types: Vec<StatusEventType>) -> Self {
        self.event_types = Some(types);
        self
    }

    /// 이벤트가 필터와 일치하는지
    pub fn matches(&self, event: &StatusEvent) -> bool {
        if let Some(ref task_id) = self.task_id {
            if &event.task_id != task_id {
                return false;
            }
        }

        if let Some(ref types) = self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            history_size: 256,
        }
    }
}

/// 이벤트 버스
///
/// ```ignore
/// let bus = EventBus::new();
/// let mut rx = bus.receiver();
/// bus.publish(StatusEvent::new("task-1", StatusEventType::Start));
/// ```
pub struct EventBus {
    config: EventBusConfig,

    /// 브로드캐스트 채널 송신자
    sender: broadcast::Sender<StatusEvent>,

    /// 최근 이벤트 히스토리
    history: RwLock<VecDeque<StatusEvent>>,

    /// 발행된 이벤트 수
    event_count: AtomicU64,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            config,
            sender,
            history: RwLock::new(VecDeque::new()),
            event_count: AtomicU64::new(0),
        }
    }

    /// 이벤트 발행
    pub fn publish(&self, event: StatusEvent) {
        let count = self.event_count.fetch_add(1, Ordering::SeqCst);

        trace!(
            task_id = %event.task_id,
            event_type = %event.event_type,
            "Publishing event #{}", count + 1
        );

        {
            let mut history = self.history.write();
            history.push_back(event.clone());
            while history.len() > self.config.history_size {
                history.pop_front();
            }
        }

        // 구독자가 없으면 send는 실패하지만 문제 없음
        let _ = self.sender.send(event);
    }

    /// 브로드캐스트 수신자 생성
    pub fn receiver(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// 필터에 맞는 최근 이벤트 (오래된 것부터)
    pub fn history(&self, filter: &EventFilter) -> Vec<StatusEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }

    /// 현재 구독자 수
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSink for EventBus {
    async fn emit(&self, event: StatusEvent) {
        self.publish(event);
    }
}

// ============================================================================
// 테스트
// ============================================================================
