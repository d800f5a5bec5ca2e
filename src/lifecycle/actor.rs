//! The actor that owns the lifecycle manager and performs its side effects.
//!
//! 拥有生命周期管理器并执行其副作用的 actor。

use super::{
    command::{AttemptSignal, Directive, LifecycleCommand},
    manager::LifecycleManager,
};
use crate::{
    config::ReconnectConfig,
    error::Error,
    transport::{StampedEvent, Transport, TransportMonitor},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Serializes every input of the lifecycle manager: handle commands, transport
/// reports and the completions of its own timers and connect attempts.
///
/// 串行化生命周期管理器的所有输入：句柄命令、传输报告以及其自身定时器与
/// 连接尝试的完成通知。
pub(crate) struct LifecycleActor {
    manager: LifecycleManager,
    transport: Arc<dyn Transport>,
    config: ReconnectConfig,
    command_rx: mpsc::Receiver<LifecycleCommand>,
    /// Template sender cloned into each attempt's monitor.
    /// 克隆到每次尝试的监视器中的模板发送端。
    event_tx: mpsc::Sender<StampedEvent>,
    event_rx: mpsc::Receiver<StampedEvent>,
    signal_tx: mpsc::UnboundedSender<AttemptSignal>,
    signal_rx: mpsc::UnboundedReceiver<AttemptSignal>,
    /// Cancels the timer or connect call of the attempt in flight.
    /// 取消进行中尝试的定时器或连接调用。
    attempt: Option<CancellationToken>,
}

impl LifecycleActor {
    pub(crate) fn new(
        manager: LifecycleManager,
        transport: Arc<dyn Transport>,
        config: ReconnectConfig,
        command_rx: mpsc::Receiver<LifecycleCommand>,
        event_capacity: usize,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(event_capacity.max(1));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            manager,
            transport,
            config,
            command_rx,
            event_tx,
            event_rx,
            signal_tx,
            signal_rx,
            attempt: None,
        }
    }

    /// Runs the actor's main event loop until every `Connection` handle is gone.
    ///
    /// 运行 actor 的主事件循环，直到所有 `Connection` 句柄都被丢弃。
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                // 1. Timer and attempt completions first, so a finished attempt is
                //    never overtaken by reports from the link it created.
                // 1. 优先处理定时器与尝试完成通知，使完成的尝试不会被其创建的链路上的报告抢先。
                Some(signal) = self.signal_rx.recv() => {
                    let directives = match signal {
                        AttemptSignal::Due { generation } => {
                            self.manager.on_attempt_due(generation)
                        }
                        AttemptSignal::Finished { generation, remote_uri, result } => {
                            self.manager.on_attempt_finished(generation, remote_uri, result)
                        }
                    };
                    self.apply(directives).await;
                }
                // 2. Commands from the public handle, ahead of transport reports so
                //    a busy link cannot starve close or status.
                // 2. 来自公共句柄的命令，先于传输报告处理，繁忙的链路不会饿死关闭或状态查询。
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                // 3. Raw transport reports.
                // 3. 原始传输报告。
                Some(stamped) = self.event_rx.recv() => {
                    let directives = self.manager.on_transport_event(stamped);
                    self.apply(directives).await;
                }
            }
        }

        debug!(
            state = %self.manager.state(),
            generation = self.manager.generation(),
            "All connection handles dropped, shutting down lifecycle actor"
        );
        let directives = self.manager.request_close();
        self.apply(directives).await;
    }

    async fn handle_command(&mut self, command: LifecycleCommand) {
        match command {
            LifecycleCommand::Connect { response_tx } => {
                let result = match self.manager.request_connect() {
                    Ok(directives) => {
                        self.apply(directives).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let _ = response_tx.send(result);
            }
            LifecycleCommand::Close { response_tx } => {
                let directives = self.manager.request_close();
                self.apply(directives).await;
                let _ = response_tx.send(());
            }
            LifecycleCommand::Status { response_tx } => {
                let _ = response_tx.send(self.manager.status());
            }
            LifecycleCommand::Flush { response_tx } => {
                self.drain_queued_events().await;
                let _ = response_tx.send(());
            }
        }
    }

    /// Processes the transport reports queued at this moment. Reports arriving
    /// meanwhile wait for the main loop.
    /// 处理此刻已排队的传输报告。期间到达的报告留给主循环。
    async fn drain_queued_events(&mut self) {
        let queued = self.event_rx.len();
        for _ in 0..queued {
            let Ok(stamped) = self.event_rx.try_recv() else {
                break;
            };
            let directives = self.manager.on_transport_event(stamped);
            self.apply(directives).await;
        }
        trace!(queued, "Drained queued transport reports");
    }

    async fn apply(&mut self, directives: Vec<Directive>) {
        for directive in directives {
            trace!(?directive, "Applying directive");
            match directive {
                Directive::ScheduleAttempt { generation, delay } => {
                    let token = self.replace_attempt();
                    let signal_tx = self.signal_tx.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = token.cancelled() => {}
                            _ = tokio::time::sleep(delay) => {
                                let _ = signal_tx.send(AttemptSignal::Due { generation });
                            }
                        }
                    });
                }
                Directive::Connect {
                    generation,
                    remote_uri,
                } => {
                    let token = self
                        .attempt
                        .get_or_insert_with(CancellationToken::new)
                        .clone();
                    let monitor = TransportMonitor::new(generation, self.event_tx.clone());
                    let transport = self.transport.clone();
                    let signal_tx = self.signal_tx.clone();
                    let connect_timeout = self.config.connect_timeout;
                    tokio::spawn(async move {
                        let result = tokio::select! {
                            _ = token.cancelled() => {
                                trace!(generation, "Connect attempt cancelled");
                                return;
                            }
                            result = tokio::time::timeout(
                                connect_timeout,
                                transport.connect(&remote_uri, monitor),
                            ) => result.unwrap_or(Err(Error::ConnectTimeout)),
                        };
                        let _ = signal_tx.send(AttemptSignal::Finished {
                            generation,
                            remote_uri,
                            result,
                        });
                    });
                }
                Directive::CancelAttempt => {
                    if let Some(token) = self.attempt.take() {
                        token.cancel();
                    }
                }
                Directive::CloseTransport => {
                    info!("Closing physical link");
                    if tokio::time::timeout(self.config.connect_timeout, self.transport.close())
                        .await
                        .is_err()
                    {
                        warn!("Transport did not close within the connect timeout");
                    }
                }
            }
        }
    }

    /// Cancels the attempt in flight and installs a fresh token for the next one.
    /// 取消进行中的尝试，并为下一次尝试安装新的令牌。
    fn replace_attempt(&mut self) -> CancellationToken {
        if let Some(previous) = self.attempt.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.attempt = Some(token.clone());
        token
    }
}
