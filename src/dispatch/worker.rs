//! Per-listener delivery worker.
//!
//! 每个监听器的投递任务。

use super::{DispatchCounters, ListenerHandle};
use crate::{event::ConnectionEvent, listener::ConnectionListener};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace};

/// Work item handed from the sequencer to a worker.
/// 从定序任务交给投递任务的工作项。
#[derive(Debug)]
pub(crate) enum Delivery {
    Event(Arc<ConnectionEvent>),
    Flush(oneshot::Sender<()>),
}

/// Registry entry for one listener.
/// 单个监听器的注册表项。
#[derive(Debug)]
pub(crate) struct ListenerSlot {
    pub(crate) tx: mpsc::UnboundedSender<Delivery>,
    pub(crate) active: Arc<AtomicBool>,
}

impl ListenerSlot {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Invokes `listener` for each delivered event, in order, until the queue closes.
///
/// A panicking callback is an observer defect: it is logged and counted, and the
/// worker moves on to the next event.
///
/// 按顺序为每个投递的事件调用 `listener`，直到队列关闭。
/// 回调 panic 属于观察者缺陷：记录并计数后，投递任务继续处理下一个事件。
pub(crate) async fn delivery_worker(
    handle: ListenerHandle,
    listener: Arc<dyn ConnectionListener>,
    active: Arc<AtomicBool>,
    mut rx: mpsc::UnboundedReceiver<Delivery>,
    counters: Arc<DispatchCounters>,
) {
    while let Some(delivery) = rx.recv().await {
        match delivery {
            Delivery::Event(event) => {
                if !active.load(Ordering::Acquire) {
                    trace!(
                        listener = handle.id(),
                        kind = event.kind_name(),
                        "Skipping event for unregistered listener"
                    );
                    continue;
                }
                match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))) {
                    Ok(()) => {
                        counters.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(payload) => {
                        counters.defects.fetch_add(1, Ordering::Relaxed);
                        error!(
                            listener = handle.id(),
                            kind = event.kind_name(),
                            panic = panic_message(payload.as_ref()),
                            "Listener callback panicked; continuing delivery"
                        );
                    }
                }
            }
            Delivery::Flush(marker) => {
                let _ = marker.send(());
            }
        }
    }
    trace!(listener = handle.id(), "Delivery worker finished");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
