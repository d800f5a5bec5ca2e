//! 连接生命周期管理器 - 统一管理逻辑连接的完整生命周期
//! Connection Lifecycle Manager - Unified management of a logical connection's lifecycle
//!
//! The manager is a synchronous state machine. It receives connect/close
//! requests, attempt completions and raw transport events, decides the next
//! state and which notifications to publish, and returns [`Directive`]s for the
//! side effects (timers, transport calls) that the lifecycle actor performs.
//! Every input is processed by the single actor task, so decisions never see a
//! torn state.
//!
//! 管理器是一个同步状态机。它接收连接/关闭请求、尝试完成通知与原始传输事件，
//! 决定下一个状态与要发布的通知，并返回 [`Directive`]，由生命周期 actor 执行
//! 相应的副作用（定时器、传输调用）。所有输入都由唯一的 actor 任务处理，
//! 因此决策永远不会看到不一致的状态。

use super::{
    command::{ConnectionStatus, Directive},
    reconnect::{EndpointRotation, ReconnectBackoff},
    state::ConnectionState,
    transitions::StateTransitionExecutor,
    validation::StateValidator,
};
use crate::{
    closure::RemoteClosureTracker,
    config::ReconnectConfig,
    dispatch::DispatchBus,
    error::{Error, Result},
    event::{Cause, ConnectionEvent, RemoteUri, ResourceKind},
    router::InboundRouter,
    transport::{StampedEvent, TransportEvent},
};
use tracing::{debug, error, info, trace, warn};

/// 默认的生命周期管理器实现
/// Default lifecycle manager implementation
#[derive(Debug)]
pub(crate) struct LifecycleManager {
    state: ConnectionState,
    /// Generation of the current connect attempt. Transport events and attempt
    /// completions stamped with any other value are stale.
    /// 当前连接尝试的编号。带有其他编号的传输事件与尝试完成通知均已过期。
    generation: u64,
    established_once: bool,
    remote_uri: Option<RemoteUri>,
    closed: bool,
    endpoints: EndpointRotation,
    backoff: ReconnectBackoff,
    config: ReconnectConfig,
    executor: StateTransitionExecutor,
    router: InboundRouter,
    closures: RemoteClosureTracker,
    bus: DispatchBus,
}

impl LifecycleManager {
    pub(crate) fn new(
        endpoints: EndpointRotation,
        config: ReconnectConfig,
        bus: DispatchBus,
    ) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            generation: 0,
            established_once: false,
            remote_uri: None,
            closed: false,
            endpoints,
            backoff: ReconnectBackoff::new(),
            config,
            executor: StateTransitionExecutor::new(),
            router: InboundRouter::new(bus.clone()),
            closures: RemoteClosureTracker::new(bus.clone()),
            bus,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            remote_uri: self.remote_uri.clone(),
            closed: self.closed,
            generation: self.generation,
        }
    }

    /// 处理连接请求
    /// Handles a connect request
    pub(crate) fn request_connect(&mut self) -> Result<Vec<Directive>> {
        if self.closed || StateValidator::is_terminal(self.state) {
            return Err(Error::ConnectionClosed);
        }
        if self.state != ConnectionState::Disconnected {
            debug!(state = %self.state, "Connect requested while already active");
            return Ok(Vec::new());
        }

        self.transition(ConnectionState::Connecting);
        info!(
            endpoint = %self.endpoints.current(),
            endpoints = self.endpoints.endpoints().len(),
            "Connection lifecycle started"
        );
        Ok(vec![self.schedule_attempt()])
    }

    /// 处理本地显式关闭。不发布任何通知。
    /// Handles an explicit local close. Publishes no notification.
    pub(crate) fn request_close(&mut self) -> Vec<Directive> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;
        if StateValidator::is_terminal(self.state) {
            return Vec::new();
        }

        let was_active = StateValidator::is_active(self.state);
        self.transition(ConnectionState::Disconnected);
        // Anything the in-flight attempt still reports is now stale.
        // 进行中的尝试之后报告的任何内容都已过期。
        self.next_generation();
        self.remote_uri = None;
        info!(generation = self.generation, "Connection closed locally");

        if was_active {
            vec![Directive::CancelAttempt, Directive::CloseTransport]
        } else {
            Vec::new()
        }
    }

    /// 处理尝试延迟到期
    /// Handles the expiry of an attempt's delay
    pub(crate) fn on_attempt_due(&mut self, generation: u64) -> Vec<Directive> {
        if generation != self.generation || !StateValidator::can_begin_attempt(self.state) {
            trace!(generation, current = self.generation, "Ignoring stale attempt timer");
            return Vec::new();
        }

        self.transition(ConnectionState::Connecting);
        let remote_uri = self.endpoints.current().clone();
        debug!(
            generation,
            %remote_uri,
            attempt = self.backoff.attempts() + 1,
            "Starting connect attempt"
        );
        vec![Directive::Connect {
            generation,
            remote_uri,
        }]
    }

    /// 处理传输连接调用的结果
    /// Handles the result of a transport connect call
    pub(crate) fn on_attempt_finished(
        &mut self,
        generation: u64,
        remote_uri: RemoteUri,
        result: Result<()>,
    ) -> Vec<Directive> {
        if generation != self.generation {
            trace!(generation, current = self.generation, "Ignoring result of superseded attempt");
            return Vec::new();
        }
        match result {
            Ok(()) => self.on_link_up(remote_uri),
            Err(error) => {
                debug!(generation, %remote_uri, %error, "Connect attempt failed");
                self.on_attempt_failed(error)
            }
        }
    }

    /// 处理来自传输监视器的原始事件
    /// Handles a raw event from a transport monitor
    pub(crate) fn on_transport_event(&mut self, stamped: StampedEvent) -> Vec<Directive> {
        let StampedEvent { generation, event } = stamped;
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                kind = event.kind_name(),
                "Dropping transport event from superseded attempt"
            );
            return Vec::new();
        }
        if self.closed {
            trace!(kind = event.kind_name(), "Dropping transport event after close");
            return Vec::new();
        }

        match event {
            TransportEvent::LinkUp { remote_uri } => self.on_link_up(remote_uri),
            TransportEvent::LinkDown {
                recoverable: true,
                cause,
            } => self.on_link_down(cause),
            TransportEvent::LinkDown {
                recoverable: false,
                cause,
            }
            | TransportEvent::Fatal { cause } => self.fail(Error::Transport(cause)),
            TransportEvent::Envelope {
                consumer_id,
                destination,
                payload,
            } => {
                if StateValidator::can_route_traffic(self.state) {
                    self.router.route(consumer_id, destination, payload);
                } else {
                    debug!(
                        consumer_id,
                        state = %self.state,
                        "Dropping envelope outside an established link"
                    );
                }
                Vec::new()
            }
            TransportEvent::RemoteClose {
                kind,
                resource_id,
                cause,
            } => {
                if !StateValidator::can_route_traffic(self.state) {
                    debug!(
                        %kind,
                        resource_id,
                        state = %self.state,
                        "Dropping remote close outside an established link"
                    );
                } else if self.closures.record(kind, resource_id, cause).is_some()
                    && kind == ResourceKind::Consumer
                {
                    self.router.close_consumer(resource_id);
                }
                Vec::new()
            }
        }
    }

    fn on_link_up(&mut self, remote_uri: RemoteUri) -> Vec<Directive> {
        match self.state {
            ConnectionState::Connecting => {}
            ConnectionState::Connected => {
                trace!(%remote_uri, "Duplicate link up ignored");
                return Vec::new();
            }
            state => {
                debug!(%remote_uri, %state, "Link up ignored in current state");
                return Vec::new();
            }
        }

        self.transition(ConnectionState::Connected);
        self.endpoints.mark_connected(&remote_uri);
        self.backoff.reset();
        self.remote_uri = Some(remote_uri.clone());

        if self.established_once {
            info!(generation = self.generation, %remote_uri, "Connection restored");
            self.emit(ConnectionEvent::Restored { remote_uri });
        } else {
            self.established_once = true;
            info!(generation = self.generation, %remote_uri, "Connection established");
            self.emit(ConnectionEvent::Established { remote_uri });
        }
        Vec::new()
    }

    fn on_link_down(&mut self, cause: Cause) -> Vec<Directive> {
        match self.state {
            ConnectionState::Connected => {
                self.transition(ConnectionState::Interrupted);
                let lost = self
                    .remote_uri
                    .clone()
                    .unwrap_or_else(|| self.endpoints.current().clone());
                warn!(
                    generation = self.generation,
                    remote_uri = %lost,
                    %cause,
                    "Connection interrupted"
                );
                self.emit(ConnectionEvent::Interrupted { remote_uri: lost });
                self.endpoints.advance();
                vec![self.schedule_attempt()]
            }
            ConnectionState::Connecting => self.on_attempt_failed(Error::Transport(cause)),
            state => {
                debug!(%state, %cause, "Link down ignored in current state");
                Vec::new()
            }
        }
    }

    fn on_attempt_failed(&mut self, error: Error) -> Vec<Directive> {
        if self.state != ConnectionState::Connecting {
            return Vec::new();
        }

        let attempts = self.backoff.record_failure();
        let warn_every = self.config.warn_after_reconnect_attempts;
        if warn_every > 0 && attempts % warn_every == 0 {
            warn!(attempts, %error, "Still unable to connect");
        }

        if self
            .backoff
            .is_exhausted(self.config.attempt_limit(self.established_once))
        {
            return self.fail(Error::ReconnectExhausted {
                attempts,
                last_error: error.into_cause(),
            });
        }

        self.endpoints.advance();
        vec![self.schedule_attempt()]
    }

    /// 进入终止的失败状态。失败通知只会发布一次。
    /// Enters the terminal failed state. The failure is published exactly once.
    fn fail(&mut self, error: Error) -> Vec<Directive> {
        let cause = error.into_cause();
        if !StateValidator::is_active(self.state) {
            debug!(state = %self.state, %cause, "Failure ignored in current state");
            return Vec::new();
        }

        self.transition(ConnectionState::ClosedFailed);
        self.closed = true;
        self.next_generation();
        error!(%cause, "Connection failed");
        self.emit(ConnectionEvent::Failure { error: cause });
        vec![Directive::CancelAttempt, Directive::CloseTransport]
    }

    fn schedule_attempt(&mut self) -> Directive {
        let delay = self.backoff.next_delay(&self.config);
        let generation = self.next_generation();
        trace!(generation, ?delay, "Scheduling connect attempt");
        Directive::ScheduleAttempt { generation, delay }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn transition(&mut self, new_state: ConnectionState) -> bool {
        match self
            .executor
            .execute_transition(self.generation, self.state, new_state)
        {
            Ok(state) => {
                self.state = state;
                true
            }
            Err(_) => false,
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Err(e) = self.bus.publish(event) {
            warn!(error = %e, "Notification lost: dispatch bus unavailable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_tracing, RecordingListener};
    use bytes::Bytes;
    use std::{sync::Arc, time::Duration};

    fn manager_with(
        endpoints: &[&str],
        config: ReconnectConfig,
    ) -> (LifecycleManager, DispatchBus, Arc<RecordingListener>) {
        init_tracing();
        let bus = DispatchBus::new();
        let listener = Arc::new(RecordingListener::default());
        bus.register(listener.clone());
        let rotation =
            EndpointRotation::new(endpoints.iter().map(|e| RemoteUri::from(*e)).collect(), false)
                .unwrap();
        (LifecycleManager::new(rotation, config, bus.clone()), bus, listener)
    }

    fn stamped(generation: u64, event: TransportEvent) -> StampedEvent {
        StampedEvent { generation, event }
    }

    /// Drives the manager from Disconnected to the first Connect directive.
    fn start(manager: &mut LifecycleManager) -> u64 {
        let directives = manager.request_connect().unwrap();
        let generation = match directives.as_slice() {
            [Directive::ScheduleAttempt { generation, .. }] => *generation,
            other => panic!("unexpected directives {other:?}"),
        };
        let directives = manager.on_attempt_due(generation);
        assert!(matches!(directives.as_slice(), [Directive::Connect { .. }]));
        generation
    }

    #[tokio::test]
    async fn test_link_up_establishes_once() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1"], ReconnectConfig::default());
        let generation = start(&mut manager);

        manager.on_attempt_finished(generation, "amqp://host1".into(), Ok(()));
        manager.on_transport_event(stamped(
            generation,
            TransportEvent::LinkUp {
                remote_uri: "amqp://host1".into(),
            },
        ));
        bus.flush().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(
            listener.events(),
            vec![ConnectionEvent::Established {
                remote_uri: "amqp://host1".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_interrupt_then_restore() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1", "amqp://host2"], ReconnectConfig::default());
        let generation = start(&mut manager);
        manager.on_attempt_finished(generation, "amqp://host1".into(), Ok(()));

        let directives = manager.on_transport_event(stamped(
            generation,
            TransportEvent::LinkDown {
                recoverable: true,
                cause: Cause::new("reset"),
            },
        ));
        assert_eq!(manager.state(), ConnectionState::Interrupted);
        let next = match directives.as_slice() {
            [Directive::ScheduleAttempt { generation, delay }] => {
                assert_eq!(*delay, Duration::ZERO);
                *generation
            }
            other => panic!("unexpected directives {other:?}"),
        };

        let directives = manager.on_attempt_due(next);
        assert_eq!(
            directives,
            vec![Directive::Connect {
                generation: next,
                remote_uri: "amqp://host2".into()
            }]
        );
        manager.on_transport_event(stamped(
            next,
            TransportEvent::LinkUp {
                remote_uri: "amqp://host2".into(),
            },
        ));
        bus.flush().await.unwrap();

        assert_eq!(
            listener.events(),
            vec![
                ConnectionEvent::Established {
                    remote_uri: "amqp://host1".into()
                },
                ConnectionEvent::Interrupted {
                    remote_uri: "amqp://host1".into()
                },
                ConnectionEvent::Restored {
                    remote_uri: "amqp://host2".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_events_do_not_revert_state() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1"], ReconnectConfig::default());
        let first = start(&mut manager);
        manager.on_attempt_finished(first, "amqp://host1".into(), Ok(()));
        manager.on_transport_event(stamped(
            first,
            TransportEvent::LinkDown {
                recoverable: true,
                cause: Cause::new("reset"),
            },
        ));

        // The old link reports again after the manager moved on.
        manager.on_transport_event(stamped(
            first,
            TransportEvent::LinkUp {
                remote_uri: "amqp://host1".into(),
            },
        ));
        manager.on_transport_event(stamped(
            first,
            TransportEvent::Fatal {
                cause: Cause::new("late"),
            },
        ));
        assert!(manager.on_attempt_finished(first, "amqp://host1".into(), Ok(())).is_empty());
        bus.flush().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Interrupted);
        assert_eq!(listener.events().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_is_terminal() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1"], ReconnectConfig::default());
        let generation = start(&mut manager);
        let directives = manager.on_transport_event(stamped(
            generation,
            TransportEvent::Fatal {
                cause: Cause::new("boom"),
            },
        ));
        assert_eq!(
            directives,
            vec![Directive::CancelAttempt, Directive::CloseTransport]
        );
        let current = manager.generation();
        manager.on_transport_event(stamped(
            current,
            TransportEvent::LinkUp {
                remote_uri: "amqp://host1".into(),
            },
        ));
        bus.flush().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::ClosedFailed);
        assert_eq!(manager.request_connect(), Err(Error::ConnectionClosed));
        assert!(manager.request_close().is_empty());
        assert_eq!(
            listener.events(),
            vec![ConnectionEvent::Failure {
                error: Cause::new("boom")
            }]
        );
    }

    #[tokio::test]
    async fn test_startup_attempts_exhausted() {
        let config = ReconnectConfig {
            startup_max_reconnect_attempts: Some(2),
            ..Default::default()
        };
        let (mut manager, bus, listener) = manager_with(&["amqp://a", "amqp://b"], config);
        let generation = start(&mut manager);

        let directives =
            manager.on_attempt_finished(generation, "amqp://a".into(), Err(Error::ConnectTimeout));
        let retry = match directives.as_slice() {
            [Directive::ScheduleAttempt { generation, delay }] => {
                assert_eq!(*delay, Duration::from_millis(10));
                *generation
            }
            other => panic!("unexpected directives {other:?}"),
        };
        assert_eq!(
            manager.on_attempt_due(retry),
            vec![Directive::Connect {
                generation: retry,
                remote_uri: "amqp://b".into()
            }]
        );
        let directives =
            manager.on_attempt_finished(retry, "amqp://b".into(), Err(Error::ConnectTimeout));
        assert_eq!(
            directives,
            vec![Directive::CancelAttempt, Directive::CloseTransport]
        );
        bus.flush().await.unwrap();

        let events = listener.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ConnectionEvent::Failure { error } => {
                assert!(
                    error
                        .message()
                        .starts_with("Reconnect attempts exhausted after 2 attempts")
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_close_emits_nothing() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1"], ReconnectConfig::default());
        let generation = start(&mut manager);
        assert_eq!(
            manager.request_close(),
            vec![Directive::CancelAttempt, Directive::CloseTransport]
        );
        assert!(manager.request_close().is_empty());
        assert!(manager.on_attempt_finished(generation, "amqp://host1".into(), Ok(())).is_empty());
        bus.flush().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.status().closed);
        assert_eq!(manager.request_connect(), Err(Error::ConnectionClosed));
        assert!(listener.events().is_empty());
    }

    #[tokio::test]
    async fn test_traffic_routed_only_while_connected() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1"], ReconnectConfig::default());
        let generation = start(&mut manager);
        let envelope = |body: &'static str| TransportEvent::Envelope {
            consumer_id: 5,
            destination: None,
            payload: Bytes::from_static(body.as_bytes()),
        };

        manager.on_transport_event(stamped(generation, envelope("early")));
        manager.on_attempt_finished(generation, "amqp://host1".into(), Ok(()));
        manager.on_transport_event(stamped(generation, envelope("one")));
        manager.on_transport_event(stamped(
            generation,
            TransportEvent::RemoteClose {
                kind: ResourceKind::Consumer,
                resource_id: 5,
                cause: Cause::new("X"),
            },
        ));
        manager.on_transport_event(stamped(generation, envelope("after close")));
        bus.flush().await.unwrap();

        let kinds: Vec<_> = listener.events().iter().map(|e| e.kind_name()).collect();
        assert_eq!(kinds, vec!["Established", "InboundMessage", "ConsumerRemotelyClosed"]);
    }

    #[tokio::test]
    async fn test_reported_link_up_establishes_before_connect_returns() {
        let (mut manager, bus, listener) =
            manager_with(&["amqp://host1"], ReconnectConfig::default());
        let generation = start(&mut manager);

        let directives = manager.on_transport_event(stamped(
            generation,
            TransportEvent::LinkUp {
                remote_uri: "amqp://host1".into(),
            },
        ));
        assert!(directives.is_empty());
        assert_eq!(manager.state(), ConnectionState::Connected);

        // The connect call of the same attempt completes afterwards, either way.
        assert!(
            manager
                .on_attempt_finished(generation, "amqp://host1".into(), Ok(()))
                .is_empty()
        );
        let timed_out = Err(Error::ConnectTimeout);
        assert!(
            manager
                .on_attempt_finished(generation, "amqp://host1".into(), timed_out)
                .is_empty()
        );
        bus.flush().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.status().remote_uri, Some("amqp://host1".into()));
        assert_eq!(
            listener.events(),
            vec![ConnectionEvent::Established {
                remote_uri: "amqp://host1".into()
            }]
        );
    }
}
