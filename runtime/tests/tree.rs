use std::convert::Infallible;

use arbor_runtime::prelude::*;

hint_key! {
    Prefix: String = String::new();
}

/// Counts steps; reports `"{label}:{count}"` when finished.
#[derive(Clone)]
struct Stepper {
    label: &'static str,
}

#[derive(Debug)]
enum StepAction {
    Step,
    Finish,
}

#[derive(Clone)]
struct StepScreen {
    title: String,
    count: u32,
    replaced: u32,
    sink: Sink<StepAction>,
}

struct StepState {
    count: u32,
    replaced: u32,
}

impl Workflow for Stepper {
    type State = StepState;
    type Action = StepAction;
    type Output = String;
    type Rendering = StepScreen;

    fn initial_state(&self, _hints: &Hints) -> StepState {
        StepState {
            count: 0,
            replaced: 0,
        }
    }

    fn render(&self, state: &StepState, ctx: &mut RenderContext<'_, Self>) -> StepScreen {
        StepScreen {
            title: format!("{}{}", ctx.hints().get::<Prefix>(), self.label),
            count: state.count,
            replaced: state.replaced,
            sink: ctx.make_sink(),
        }
    }

    fn apply(&self, mut state: StepState, action: StepAction) -> Outcome<StepState, String> {
        match action {
            StepAction::Step => {
                state.count += 1;
                Outcome::next(state)
            }
            StepAction::Finish => {
                let output = format!("{}:{}", self.label, state.count);
                Outcome::emit(state, output)
            }
        }
    }

    fn on_instance_replaced(&self, _previous: &Self, state: &mut StepState) {
        state.replaced += 1;
    }
}

/// Renders stepper "a" and, optionally, stepper "b" with a hint override.
#[derive(Clone)]
struct Pair {
    show_second: bool,
}

enum PairAction {
    Finished(String),
    Touch,
}

struct PairScreen {
    first: StepScreen,
    second: Option<StepScreen>,
    finished: Vec<String>,
    sink: Sink<PairAction>,
}

impl Workflow for Pair {
    type State = Vec<String>;
    type Action = PairAction;
    type Output = Vec<String>;
    type Rendering = PairScreen;

    fn initial_state(&self, _hints: &Hints) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, state: &Vec<String>, ctx: &mut RenderContext<'_, Self>) -> PairScreen {
        let first = ctx.render_child_keyed(Stepper { label: "a" }, "a", PairAction::Finished);
        let second = self.show_second.then(|| {
            ctx.render_child_with(
                Child::new(Stepper { label: "b" })
                    .key("b")
                    .hints(Hints::new().with::<Prefix>("second ".to_string())),
                PairAction::Finished,
            )
        });
        PairScreen {
            first,
            second,
            finished: state.clone(),
            sink: ctx.make_sink(),
        }
    }

    fn apply(
        &self,
        mut state: Vec<String>,
        action: PairAction,
    ) -> Outcome<Vec<String>, Vec<String>> {
        match action {
            PairAction::Finished(report) => {
                state.push(report);
                if state.len() == 2 {
                    let output = state.clone();
                    Outcome::emit(state, output)
                } else {
                    Outcome::next(state)
                }
            }
            PairAction::Touch => Outcome::next(state),
        }
    }
}

fn host() -> WorkflowHost<Pair> {
    WorkflowHost::new(Pair { show_second: true }, Hints::new())
}

#[test]
fn test_initial_render_mounts_whole_tree() {
    let host = host();
    let snapshot = host.snapshot();

    assert_eq!(host.render_passes(), 1);
    assert_eq!(host.node_count(), 3);
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(snapshot.root().map(|n| n.workflow.as_str()), Some("Pair"));
    assert_eq!(snapshot.find_by_workflow("Stepper").count(), 2);
}

#[test]
fn test_child_state_survives_parent_render() {
    let mut host = host();
    let child = host.rendering().first.sink.clone();
    child.send(StepAction::Step).unwrap();
    child.send(StepAction::Step).unwrap();
    host.rendering().sink.send(PairAction::Touch).unwrap();
    host.process_pending();

    assert_eq!(host.rendering().first.count, 2);
    assert_eq!(host.render_passes(), 4);
}

#[test]
fn test_keyed_siblings_are_independent() {
    let mut host = host();
    host.rendering().first.sink.send(StepAction::Step).unwrap();
    host.process_pending();

    let screen = host.rendering();
    assert_eq!(screen.first.count, 1);
    assert_eq!(screen.second.as_ref().map(|s| s.count), Some(0));
    assert_ne!(screen.first.sink.node_id(), screen.second.as_ref().unwrap().sink.node_id());
}

#[test]
fn test_child_output_reaches_parent_in_one_pass() {
    let mut host = host();
    host.rendering().first.sink.send(StepAction::Step).unwrap();
    host.process_pending();
    let passes = host.render_passes();

    host.rendering().first.sink.send(StepAction::Finish).unwrap();
    let updates = host.process_pending();

    assert_eq!(updates.len(), 1);
    assert!(updates[0].applied);
    assert_eq!(updates[0].output, None);
    assert_eq!(host.render_passes(), passes + 1);
    assert_eq!(host.rendering().finished, vec!["a:1".to_string()]);
}

#[test]
fn test_root_output_returned_to_host() {
    let mut host = host();
    host.rendering().first.sink.send(StepAction::Finish).unwrap();
    let second = host.rendering().second.clone().unwrap();
    second.sink.send(StepAction::Finish).unwrap();

    let outputs: Vec<_> = host
        .process_pending()
        .into_iter()
        .filter_map(|u| u.output)
        .collect();

    assert_eq!(outputs, vec![vec!["a:0".to_string(), "b:0".to_string()]]);
}

#[test]
fn test_hints_flow_down_with_overrides() {
    let mut host = WorkflowHost::new(
        Pair { show_second: true },
        Hints::new().with::<Prefix>("root ".to_string()),
    );

    assert_eq!(host.rendering().first.title, "root a");
    assert_eq!(host.rendering().second.as_ref().unwrap().title, "second b");

    assert!(host.update_hints(Hints::new().with::<Prefix>("next ".to_string())));
    assert_eq!(host.rendering().first.title, "next a");
}

#[test]
fn test_equal_hints_skip_render() {
    let mut host = WorkflowHost::new(
        Pair { show_second: false },
        Hints::new().with::<Prefix>("same ".to_string()),
    );

    assert!(!host.update_hints(Hints::new().with::<Prefix>("same ".to_string())));
    assert_eq!(host.render_passes(), 1);
}

#[test]
fn test_removed_child_is_unmounted() {
    let mut host = host();
    let second = host.rendering().second.clone().unwrap();

    host.update_workflow(Pair { show_second: false });

    assert!(host.rendering().second.is_none());
    assert!(!second.sink.is_live());
    assert_eq!(
        second.sink.send(StepAction::Step),
        Err(SinkError::Stale {
            node: second.sink.node_id()
        })
    );
    assert_eq!(host.node_count(), 2);
}

#[test]
fn test_readded_child_starts_fresh() {
    let mut host = host();
    host.rendering().second.as_ref().unwrap().sink.send(StepAction::Step).unwrap();
    host.process_pending();

    host.update_workflow(Pair { show_second: false });
    host.update_workflow(Pair { show_second: true });

    let second = host.rendering().second.as_ref().unwrap();
    assert_eq!(second.count, 0);
    assert_eq!(second.replaced, 0);
}

#[test]
fn test_rerender_replaces_child_instance() {
    let mut host = host();
    host.rendering().sink.send(PairAction::Touch).unwrap();
    host.rendering().sink.send(PairAction::Touch).unwrap();
    host.process_pending();

    assert_eq!(host.rendering().first.replaced, 2);
}

/// Remembers every name it was rendered with.
struct Greeter {
    name: String,
}

impl Workflow for Greeter {
    type State = Vec<String>;
    type Action = Infallible;
    type Output = Infallible;
    type Rendering = String;

    fn initial_state(&self, _hints: &Hints) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, state: &Vec<String>, _ctx: &mut RenderContext<'_, Self>) -> String {
        format!("Hello, {}! (was {})", self.name, state.join(", "))
    }

    fn apply(&self, _state: Vec<String>, action: Infallible) -> Outcome<Vec<String>, Infallible> {
        match action {}
    }

    fn on_instance_replaced(&self, previous: &Self, state: &mut Vec<String>) {
        state.push(previous.name.clone());
    }
}

#[test]
fn test_update_workflow_runs_replacement_hook() {
    let mut host = WorkflowHost::new(
        Greeter {
            name: "Ada".to_string(),
        },
        Hints::new(),
    );
    host.update_workflow(Greeter {
        name: "Grace".to_string(),
    });

    assert_eq!(host.rendering(), "Hello, Grace! (was Ada)");
    assert_eq!(host.render_passes(), 2);
}
