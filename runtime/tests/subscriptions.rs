use std::convert::Infallible;
use std::time::Duration;

use arbor_core::config::TimelineConfig;
use arbor_core::timeline::TimelineEvent;
use arbor_runtime::prelude::*;
use arbor_std::prelude::*;
use futures_util::stream;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Counts timer ticks while running.
struct Ticker {
    period: Duration,
}

enum TickAction {
    Tick,
    Stop,
    Noop,
}

struct TickState {
    ticks: u32,
    running: bool,
}

struct TickScreen {
    ticks: u32,
    sink: Sink<TickAction>,
}

impl Workflow for Ticker {
    type State = TickState;
    type Action = TickAction;
    type Output = u32;
    type Rendering = TickScreen;

    fn initial_state(&self, _hints: &Hints) -> TickState {
        TickState {
            ticks: 0,
            running: true,
        }
    }

    fn render(&self, state: &TickState, ctx: &mut RenderContext<'_, Self>) -> TickScreen {
        if state.running {
            ctx.subscribe(Every::new(self.period), |_| TickAction::Tick);
        }
        TickScreen {
            ticks: state.ticks,
            sink: ctx.make_sink(),
        }
    }

    fn apply(&self, mut state: TickState, action: TickAction) -> Outcome<TickState, u32> {
        match action {
            TickAction::Tick => state.ticks += 1,
            TickAction::Stop => {
                state.running = false;
                let ticks = state.ticks;
                return Outcome::emit(state, ticks);
            }
            TickAction::Noop => {}
        }
        Outcome::next(state)
    }
}

fn timeline_config() -> RuntimeConfig {
    RuntimeConfig {
        timeline: TimelineConfig {
            enabled: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_timer_ticks_until_stopped() {
    let start = Instant::now();
    let mut host = WorkflowHost::new(
        Ticker {
            period: Duration::from_secs(1),
        },
        Hints::new(),
    );

    host.next_update().await.unwrap();
    host.next_update().await.unwrap();
    assert_eq!(host.rendering().ticks, 2);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(host.snapshot().subscription_count(), 1);

    host.rendering().sink.send(TickAction::Stop).unwrap();
    let update = host.next_update().await.unwrap();
    assert_eq!(update.output, Some(2));
    assert_eq!(host.snapshot().subscription_count(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(host.try_next_update().is_none());
    assert_eq!(host.rendering().ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn test_redeclared_subscription_keeps_running() {
    let start = Instant::now();
    let mut host = WorkflowHost::new(
        Ticker {
            period: Duration::from_secs(1),
        },
        Hints::new(),
    );

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(600)).await;
    host.rendering().sink.send(TickAction::Noop).unwrap();
    host.next_update().await.unwrap();

    host.next_update().await.unwrap();
    assert_eq!(host.rendering().ticks, 1);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_changed_configuration_restarts_subscription() {
    let mut host = WorkflowHost::with_config(
        Ticker {
            period: Duration::from_secs(1),
        },
        Hints::new(),
        &timeline_config(),
    );
    let before = host.snapshot().nodes[0].subscriptions.clone();

    host.update_workflow(Ticker {
        period: Duration::from_secs(3),
    });
    let after = host.snapshot().nodes[0].subscriptions.clone();

    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 1);
    assert_ne!(before, after);

    let timeline = host.timeline().unwrap();
    let started = timeline
        .iter()
        .filter(|e| matches!(e, TimelineEvent::SubscriptionStarted { .. }))
        .count();
    let cancelled = timeline
        .iter()
        .filter(|e| matches!(e, TimelineEvent::SubscriptionCancelled { .. }))
        .count();
    assert_eq!((started, cancelled), (2, 1));
}

/// Receives values published on a broadcast channel.
struct Feed {
    source: broadcast::Sender<u32>,
}

impl Workflow for Feed {
    type State = Vec<u32>;
    type Action = u32;
    type Output = Infallible;
    type Rendering = Vec<u32>;

    fn initial_state(&self, _hints: &Hints) -> Vec<u32> {
        Vec::new()
    }

    fn render(&self, state: &Vec<u32>, ctx: &mut RenderContext<'_, Self>) -> Vec<u32> {
        ctx.subscribe(FromBroadcast::subscribe("feed", &self.source), |value| value);
        state.clone()
    }

    fn apply(&self, mut state: Vec<u32>, action: u32) -> Outcome<Vec<u32>, Infallible> {
        state.push(action);
        Outcome::next(state)
    }
}

/// Wraps a feed one level down.
struct Panel {
    source: broadcast::Sender<u32>,
}

impl Workflow for Panel {
    type State = ();
    type Action = Infallible;
    type Output = Infallible;
    type Rendering = Vec<u32>;

    fn initial_state(&self, _hints: &Hints) {}

    fn render(&self, _state: &(), ctx: &mut RenderContext<'_, Self>) -> Vec<u32> {
        ctx.render_child(
            Feed {
                source: self.source.clone(),
            },
            |o| match o {},
        )
    }

    fn apply(&self, _state: (), action: Infallible) -> Outcome<(), Infallible> {
        match action {}
    }
}

/// Shows the panel only while `open`.
struct Screen {
    open: bool,
    source: broadcast::Sender<u32>,
}

impl Workflow for Screen {
    type State = ();
    type Action = Infallible;
    type Output = Infallible;
    type Rendering = Option<Vec<u32>>;

    fn initial_state(&self, _hints: &Hints) {}

    fn render(&self, _state: &(), ctx: &mut RenderContext<'_, Self>) -> Option<Vec<u32>> {
        self.open.then(|| {
            ctx.render_child(
                Panel {
                    source: self.source.clone(),
                },
                |o| match o {},
            )
        })
    }

    fn apply(&self, _state: (), action: Infallible) -> Outcome<(), Infallible> {
        match action {}
    }
}

#[tokio::test]
async fn test_events_reach_nested_subscriber() {
    let (tx, _) = broadcast::channel(16);
    let mut host = WorkflowHost::new(
        Screen {
            open: true,
            source: tx.clone(),
        },
        Hints::new(),
    );

    while tx.receiver_count() == 0 {
        tokio::task::yield_now().await;
    }
    tx.send(1).unwrap();
    tx.send(2).unwrap();
    host.next_update().await.unwrap();
    host.next_update().await.unwrap();

    assert_eq!(host.rendering().as_deref(), Some(&[1, 2][..]));
}

#[tokio::test]
async fn test_unmount_cancels_subtree_subscriptions() {
    let (tx, _) = broadcast::channel(16);
    let mut host = WorkflowHost::with_config(
        Screen {
            open: true,
            source: tx.clone(),
        },
        Hints::new(),
        &timeline_config(),
    );
    assert_eq!(host.snapshot().subscription_count(), 1);

    host.update_workflow(Screen {
        open: false,
        source: tx.clone(),
    });

    let snapshot = host.snapshot();
    assert_eq!(snapshot.nodes.len(), 1);
    assert_eq!(snapshot.subscription_count(), 0);
    assert_eq!(snapshot.find_by_workflow("Feed").count(), 0);

    let _ = tx.send(3);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(host.process_pending().iter().all(|u| !u.applied));
    assert_eq!(*host.rendering(), None);

    let timeline = host.timeline().unwrap();
    let unmounted: Vec<_> = timeline
        .iter()
        .filter_map(|e| match e {
            TimelineEvent::NodeUnmounted { workflow, .. } => Some(workflow.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unmounted, vec!["Panel", "Feed"]);
    assert!(
        timeline
            .iter()
            .any(|e| matches!(e, TimelineEvent::SubscriptionCancelled { .. }))
    );
}

#[tokio::test]
async fn test_shutdown_stops_subscriptions() {
    let (tx, _) = broadcast::channel::<u32>(16);
    let host = WorkflowHost::new(
        Screen {
            open: true,
            source: tx.clone(),
        },
        Hints::new(),
    );
    while tx.receiver_count() == 0 {
        tokio::task::yield_now().await;
    }

    host.shutdown();

    for _ in 0..100 {
        if tx.receiver_count() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(tx.receiver_count(), 0);
}

/// Collects a finite stream of readings; `batch` names the stream.
struct Readings {
    batch: &'static str,
    values: Vec<u32>,
}

impl Workflow for Readings {
    type State = Vec<u32>;
    type Action = u32;
    type Output = Infallible;
    type Rendering = Vec<u32>;

    fn initial_state(&self, _hints: &Hints) -> Vec<u32> {
        Vec::new()
    }

    fn render(&self, state: &Vec<u32>, ctx: &mut RenderContext<'_, Self>) -> Vec<u32> {
        ctx.subscribe(
            FromStream::new(self.batch, stream::iter(self.values.clone())),
            |value| value,
        );
        state.clone()
    }

    fn apply(&self, mut state: Vec<u32>, action: u32) -> Outcome<Vec<u32>, Infallible> {
        state.push(action);
        Outcome::next(state)
    }
}

#[tokio::test]
async fn test_stream_delivers_each_item_once() {
    let mut host = WorkflowHost::new(
        Readings {
            batch: "first",
            values: vec![4, 5, 6],
        },
        Hints::new(),
    );

    for _ in 0..3 {
        host.next_update().await.unwrap();
    }
    assert_eq!(*host.rendering(), vec![4, 5, 6]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(host.try_next_update().is_none());

    host.update_workflow(Readings {
        batch: "second",
        values: vec![7],
    });
    host.next_update().await.unwrap();
    assert_eq!(*host.rendering(), vec![4, 5, 6, 7]);
}
