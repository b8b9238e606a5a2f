//! Status sink - 에이전트가 이벤트를 내보내는 유일한 채널

use super::types::StatusEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 상태 이벤트 수신자
///
/// 에이전트 루프는 HTTP나 저장소를 모릅니다. 진행 상황은 이 trait로만 나갑니다.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// 이벤트 처리
    async fn emit(&self, event: StatusEvent);
}

/// 아무것도 하지 않는 sink
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl StatusSink for NullSink {
    async fn emit(&self, _event: StatusEvent) {}
}

/// mpsc 채널로 전달하는 sink
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<StatusEvent>) -> Self {
        Self { tx }
    }

    /// sink와 수신자 쌍 생성
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl StatusSink for ChannelSink {
    async fn emit(&self, event: StatusEvent) {
        // 수신자가 사라졌으면 버림
        let _ = self.tx.send(event);
    }
}

/// 이벤트를 메모리에 모으는 sink (테스트, 단발 실행용)
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<StatusEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 모인 이벤트 복사본
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl StatusSink for CollectingSink {
    async fn emit(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}
