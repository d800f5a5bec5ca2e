//! 入站消息路由器。
//! Inbound message router.
//!
//! Turns decoded envelopes reported by the transport into inbound-message
//! events. Envelopes for one consumer keep their arrival order and receive a
//! strictly increasing per-consumer delivery sequence.
//!
//! 将传输层报告的已解码信封转换为入站消息事件。同一消费者的信封保持到达顺序，
//! 并获得按消费者严格递增的投递序号。

use crate::{
    dispatch::DispatchBus,
    event::{ConnectionEvent, ConsumerId, InboundEnvelope},
};
use bytes::Bytes;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, trace, warn};

/// Routes envelopes for the consumers of one logical connection.
///
/// 为一个逻辑连接的消费者路由信封。
#[derive(Debug)]
pub struct InboundRouter {
    bus: DispatchBus,
    sequences: HashMap<ConsumerId, u64>,
    /// Consumers the peer closed. Bounded by the consumer ids the peer closes;
    /// kept through reconnects since a closed consumer is not recreated.
    /// 对端关闭的消费者。受对端关闭的消费者数量限制；重连后保留，因为已关闭的消费者不会被重建。
    closed_consumers: HashSet<ConsumerId>,
    routed: u64,
}

impl InboundRouter {
    pub fn new(bus: DispatchBus) -> Self {
        Self {
            bus,
            sequences: HashMap::new(),
            closed_consumers: HashSet::new(),
            routed: 0,
        }
    }

    /// Publishes an inbound-message event for the envelope. Returns `false` if
    /// the envelope was dropped because its consumer was closed by the peer or
    /// the bus is gone.
    ///
    /// 为信封发布入站消息事件。如果因消费者已被对端关闭或总线已不存在而丢弃，
    /// 则返回 `false`。
    pub fn route(
        &mut self,
        consumer_id: ConsumerId,
        destination: Option<Arc<str>>,
        payload: Bytes,
    ) -> bool {
        if self.closed_consumers.contains(&consumer_id) {
            debug!(consumer_id, "Dropping envelope for remotely closed consumer");
            return false;
        }

        let sequence = self.sequences.entry(consumer_id).or_insert(0);
        *sequence += 1;
        let envelope = InboundEnvelope {
            consumer_id,
            destination,
            delivery_sequence: *sequence,
            payload,
        };
        trace!(
            consumer_id,
            delivery_sequence = envelope.delivery_sequence,
            len = envelope.payload.len(),
            "Routing inbound envelope"
        );

        match self.bus.publish(ConnectionEvent::InboundMessage { envelope }) {
            Ok(()) => {
                self.routed += 1;
                true
            }
            Err(e) => {
                warn!(consumer_id, error = %e, "Inbound envelope lost: dispatch bus unavailable");
                false
            }
        }
    }

    /// Stops routing envelopes for a consumer the peer has closed.
    ///
    /// 停止为已被对端关闭的消费者路由信封。
    pub fn close_consumer(&mut self, consumer_id: ConsumerId) {
        self.closed_consumers.insert(consumer_id);
        self.sequences.remove(&consumer_id);
    }

    /// Total envelopes handed to the bus.
    /// 已交给总线的信封总数。
    pub fn routed(&self) -> u64 {
        self.routed
    }
}
