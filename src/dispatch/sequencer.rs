//! The single task that fixes the delivery order of published events.
//!
//! 确定已发布事件投递顺序的唯一任务。

use super::{command::BusCommand, worker::Delivery, DispatchCounters, Registry};
use crate::event::ConnectionEvent;
use std::sync::{atomic::Ordering, Arc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

pub(crate) struct Sequencer {
    registry: Arc<Registry>,
    counters: Arc<DispatchCounters>,
    command_rx: mpsc::UnboundedReceiver<BusCommand>,
}

impl Sequencer {
    pub(crate) fn new(
        registry: Arc<Registry>,
        counters: Arc<DispatchCounters>,
        command_rx: mpsc::UnboundedReceiver<BusCommand>,
    ) -> Self {
        Self {
            registry,
            counters,
            command_rx,
        }
    }

    /// Runs until shutdown or until every bus handle is dropped.
    ///
    /// 运行直到关闭或所有总线句柄被丢弃。
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            match command {
                BusCommand::Publish(event) => self.fan_out(event),
                BusCommand::Flush(done_tx) => self.flush(done_tx),
                BusCommand::Shutdown => break,
            }
        }

        // Dropping the slots closes each worker's queue; workers exit after
        // draining what was already handed to them.
        // 丢弃槽位会关闭每个投递任务的队列；投递任务在处理完已交付的内容后退出。
        self.registry.clear();
        debug!(
            published = self.counters.published.load(Ordering::Relaxed),
            "Dispatch sequencer stopped"
        );
    }

    fn fan_out(&self, event: ConnectionEvent) {
        let event = Arc::new(event);
        let mut recipients = 0usize;
        // No await while the registry is borrowed.
        for slot in self.registry.iter() {
            if slot.is_active() && slot.tx.send(Delivery::Event(event.clone())).is_ok() {
                recipients += 1;
            }
        }
        trace!(kind = event.kind_name(), recipients, "Event fanned out");
    }

    fn flush(&self, done_tx: oneshot::Sender<()>) {
        let markers: Vec<oneshot::Receiver<()>> = self
            .registry
            .iter()
            .filter_map(|slot| {
                let (marker_tx, marker_rx) = oneshot::channel();
                slot.tx.send(Delivery::Flush(marker_tx)).ok().map(|_| marker_rx)
            })
            .collect();

        // Waiting happens off the sequencer so a slow listener cannot stall
        // fan-out to the others.
        // 等待在定序任务之外进行，慢速监听器不会阻塞向其他监听器的扇出。
        tokio::spawn(async move {
            for marker in markers {
                // A worker that exited has nothing left to deliver.
                let _ = marker.await;
            }
            let _ = done_tx.send(());
        });
    }
}
