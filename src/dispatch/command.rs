//! Commands consumed by the dispatch sequencer.
//!
//! 分发定序任务消费的命令。

use crate::event::ConnectionEvent;
use tokio::sync::oneshot;

#[derive(Debug)]
pub(crate) enum BusCommand {
    /// Fan the event out to every registered listener.
    /// 将事件扇出到每个已注册的监听器。
    Publish(ConnectionEvent),
    /// Signal once every earlier event has been handed to its listeners.
    /// 在所有更早的事件都交给监听器之后发出信号。
    Flush(oneshot::Sender<()>),
    /// Stop the sequencer and release every delivery worker.
    /// 停止定序任务并释放所有投递任务。
    Shutdown,
}
