//! 事件分发总线。
//! The event dispatch bus.
//!
//! Producers call [`DispatchBus::publish`], which never blocks: the event is
//! queued for a sequencer task that fans it out, in publish order, to one
//! delivery worker per registered listener. Each worker invokes its listener
//! serially, so every listener observes the same relative order, each event at
//! most once, and a slow listener only delays itself.
//!
//! 生产者调用 [`DispatchBus::publish`]，该调用从不阻塞：事件进入定序任务的队列，
//! 由定序任务按发布顺序扇出到每个已注册监听器各自的投递任务。每个投递任务串行
//! 调用其监听器，因此所有监听器观察到相同的相对顺序，每个事件至多一次，
//! 慢速监听器只会拖慢它自己。

mod command;
mod sequencer;
mod worker;


use crate::{
    error::{Error, Result},
    event::ConnectionEvent,
    listener::{ConnectionListener, FnListener},
};
use command::BusCommand;
use dashmap::DashMap;
use sequencer::Sequencer;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};
use tracing::{debug, trace};
use worker::{delivery_worker, ListenerSlot};

/// Identifier returned by [`DispatchBus::register`], used to unregister.
///
/// [`DispatchBus::register`] 返回的标识，用于注销。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Snapshot of the bus's delivery counters.
///
/// 总线投递计数器的快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events accepted by `publish`.
    pub published: u64,
    /// Callback invocations that returned normally.
    pub delivered: u64,
    /// Callback invocations that panicked.
    pub defects: u64,
    /// Currently registered listeners.
    pub listeners: usize,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    pub(crate) published: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) defects: AtomicU64,
}

pub(crate) type Registry = DashMap<ListenerHandle, ListenerSlot>;

/// An explicit registry of listeners plus the machinery that delivers events
/// to them.
///
/// Cloning the bus yields another handle to the same registry. The sequencer
/// stops once every handle is dropped or [`DispatchBus::shutdown`] is called.
///
/// 监听器的显式注册表以及向其投递事件的机制。
///
/// 克隆总线会得到同一注册表的另一个句柄。当所有句柄被丢弃或调用
/// [`DispatchBus::shutdown`] 后，定序任务停止。
#[derive(Clone)]
pub struct DispatchBus {
    registry: Arc<Registry>,
    counters: Arc<DispatchCounters>,
    next_id: Arc<AtomicU64>,
    command_tx: mpsc::UnboundedSender<BusCommand>,
    runtime: Handle,
}

impl std::fmt::Debug for DispatchBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchBus")
            .field("listeners", &self.registry.len())
            .field("closed", &self.command_tx.is_closed())
            .finish()
    }
}

impl Default for DispatchBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchBus {
    /// Creates a bus whose tasks run on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime. Use
    /// [`DispatchBus::with_runtime`] to supply a handle explicitly.
    ///
    /// 创建一个在当前 Tokio 运行时上运行任务的总线。
    pub fn new() -> Self {
        Self::with_runtime(Handle::current())
    }

    /// Creates a bus whose sequencer and delivery workers are spawned on `runtime`.
    ///
    /// 创建一个在 `runtime` 上派生定序任务与投递任务的总线。
    pub fn with_runtime(runtime: Handle) -> Self {
        let registry = Arc::new(Registry::new());
        let counters = Arc::new(DispatchCounters::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let sequencer = Sequencer::new(registry.clone(), counters.clone(), command_rx);
        runtime.spawn(sequencer.run());
        debug!("Dispatch bus created");

        Self {
            registry,
            counters,
            next_id: Arc::new(AtomicU64::new(1)),
            command_tx,
            runtime,
        }
    }

    /// Registers a listener. It receives every event published after this call
    /// returns, and never the event currently being delivered to the caller.
    ///
    /// Safe to call from inside a listener callback.
    ///
    /// 注册一个监听器。它会接收此调用返回之后发布的每个事件，
    /// 但不会收到当前正在投递给调用者的事件。可以在监听器回调中安全调用。
    pub fn register(&self, listener: Arc<dyn ConnectionListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let active = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        self.runtime.spawn(delivery_worker(
            handle,
            listener,
            active.clone(),
            rx,
            self.counters.clone(),
        ));
        self.registry.insert(handle, ListenerSlot { tx, active });

        trace!(listener = handle.0, "Listener registered");
        handle
    }

    /// Registers a closure over the tagged event.
    ///
    /// 注册一个处理标签事件的闭包。
    pub fn register_fn<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.register(Arc::new(FnListener::new(callback)))
    }

    /// Unregisters a listener. Events not yet handed to it are discarded; an
    /// invocation already in progress completes. Returns `false` if the handle
    /// was not registered.
    ///
    /// 注销监听器。尚未交给它的事件会被丢弃；正在进行的调用会完成。
    /// 如果句柄未注册则返回 `false`。
    pub fn unregister(&self, handle: ListenerHandle) -> bool {
        match self.registry.remove(&handle) {
            Some((_, slot)) => {
                slot.active.store(false, Ordering::Release);
                trace!(listener = handle.0, "Listener unregistered");
                true
            }
            None => false,
        }
    }

    /// Queues an event for delivery to every registered listener.
    ///
    /// 将事件排队，等待投递给每个已注册的监听器。
    pub fn publish(&self, event: ConnectionEvent) -> Result<()> {
        trace!(kind = event.kind_name(), "Publishing event");
        self.command_tx
            .send(BusCommand::Publish(event))
            .map_err(|_| Error::ChannelClosed)?;
        self.counters.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Resolves once every event published before this call has been handed to
    /// each listener registered at that time, or skipped because the listener
    /// was unregistered.
    ///
    /// 在此调用之前发布的每个事件都已交给当时注册的每个监听器
    /// （或因监听器已注销而被跳过）之后完成。
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.command_tx
            .send(BusCommand::Flush(done_tx))
            .map_err(|_| Error::ChannelClosed)?;
        done_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Stops the sequencer. Events already fanned out are still delivered;
    /// later `publish` calls fail with [`Error::ChannelClosed`].
    ///
    /// 停止定序任务。已扇出的事件仍会投递；之后的 `publish` 调用将返回
    /// [`Error::ChannelClosed`]。
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(BusCommand::Shutdown);
    }

    /// The runtime the bus spawns its tasks on.
    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            published: self.counters.published.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            defects: self.counters.defects.load(Ordering::Relaxed),
            listeners: self.registry.len(),
        }
    }
}
