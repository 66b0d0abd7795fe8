//! Integration tests for SimulationRunner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use archflow_config::{ApiConfig, Edge, HttpMethod, Node, TransformationType};
use archflow_engine::{
  ChannelObserver, SimulationConfig, SimulationError, SimulationEvent, SimulationObserver,
  SimulationOutcome, SimulationRunner, SimulationState, SimulationStep, StateObserver,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Observer that records every callback and can stop itself.
#[derive(Default)]
struct Recorder {
  events: Mutex<Vec<String>>,
  steps: Mutex<Vec<SimulationStep>>,
  stopped: AtomicBool,
  stop_on_enter: Option<String>,
  stop_after_steps: Option<usize>,
}

impl Recorder {
  fn events(&self) -> Vec<String> {
    self.events.lock().unwrap().clone()
  }

  fn steps(&self) -> Vec<SimulationStep> {
    self.steps.lock().unwrap().clone()
  }

  fn processed_ids(&self) -> Vec<String> {
    self.steps().into_iter().map(|s| s.node_id).collect()
  }

  fn entered_ids(&self) -> Vec<String> {
    self
      .events()
      .into_iter()
      .filter_map(|e| e.strip_prefix("enter:").map(str::to_string))
      .collect()
  }

  fn completed(&self) -> bool {
    self.events().iter().any(|e| e == "complete")
  }
}

impl SimulationObserver for Recorder {
  fn on_node_enter(&self, node_id: &str) {
    self.events.lock().unwrap().push(format!("enter:{node_id}"));
    if self.stop_on_enter.as_deref() == Some(node_id) {
      self.stopped.store(true, Ordering::SeqCst);
    }
  }

  fn on_node_process(&self, step: &SimulationStep) {
    self.events.lock().unwrap().push(format!("process:{}", step.node_id));
    let mut steps = self.steps.lock().unwrap();
    steps.push(step.clone());
    if self.stop_after_steps.is_some_and(|n| steps.len() >= n) {
      self.stopped.store(true, Ordering::SeqCst);
    }
  }

  fn on_complete(&self) {
    self.events.lock().unwrap().push("complete".to_string());
  }

  fn is_stopped(&self) -> bool {
    self.stopped.load(Ordering::SeqCst)
  }
}

fn node(id: &str) -> Node {
  Node::new(id, id.to_uppercase())
}

fn edge(source: &str, target: &str) -> Edge {
  Edge::new(format!("{source}->{target}"), source, target)
}

fn runner(nodes: Vec<Node>, edges: Vec<Edge>, observer: Arc<dyn SimulationObserver>) -> SimulationRunner {
  SimulationRunner::new(nodes, edges, 0, observer)
}

#[tokio::test]
async fn test_single_node_scenario() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("n1").with_dummy_data(r#"{"x":5}"#)];

  let outcome = runner(nodes, vec![], recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Completed { steps: 1 });
  assert_eq!(recorder.events(), vec!["enter:n1", "process:n1", "complete"]);

  let step = &recorder.steps()[0];
  assert_eq!(step.node_id, "n1");
  assert_eq!(step.node_name, "N1");
  assert_eq!(step.input_data, json!({"x": 5}));
  assert_eq!(step.output_data, json!({"x": 5}));
  assert!(step.timestamp > 0);
}

#[tokio::test]
async fn test_diamond_is_depth_first_without_merging() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![
    node("a").with_dummy_data(r#"{"v":1}"#),
    node("b").with_transformation(TransformationType::Transform),
    node("c").with_transformation(TransformationType::Aggregate),
    node("d"),
  ];
  let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Completed { steps: 5 });
  assert_eq!(recorder.processed_ids(), vec!["a", "b", "d", "c", "d"]);
  assert_eq!(
    recorder.events(),
    vec![
      "enter:a", "process:a", "enter:b", "process:b", "enter:d", "process:d", "enter:c",
      "process:c", "enter:d", "process:d", "complete"
    ]
  );

  let steps = recorder.steps();
  // Each D visit carries its own parent's output.
  assert_eq!(steps[2].input_data, steps[1].output_data);
  assert_eq!(steps[4].input_data, steps[3].output_data);
  assert_eq!(steps[2].input_data["transformed"], true);
  assert_eq!(steps[4].input_data["aggregated"], true);
}

#[tokio::test]
async fn test_edge_order_decides_sibling_order() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("a"), node("b"), node("c")];
  let edges = vec![edge("a", "c"), edge("a", "b")];

  runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(recorder.processed_ids(), vec!["a", "c", "b"]);
}

#[tokio::test]
async fn test_start_nodes_run_sequentially_in_list_order() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("x"), node("z"), node("y")];
  let edges = vec![edge("x", "z"), edge("y", "z")];

  runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(recorder.processed_ids(), vec!["x", "z", "y", "z"]);
}

#[tokio::test]
async fn test_parallel_edges_each_fire() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("a"), node("b")];
  let edges = vec![edge("a", "b"), edge("a", "b")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome.steps(), 3);
  assert_eq!(recorder.processed_ids(), vec!["a", "b", "b"]);
}

#[tokio::test]
async fn test_dangling_edge_is_skipped() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("a"), node("b")];
  let edges = vec![edge("a", "ghost"), edge("a", "b")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Completed { steps: 2 });
  assert_eq!(recorder.processed_ids(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_all_cyclic_graph_completes_with_no_steps() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("a"), node("b")];
  let edges = vec![edge("a", "b"), edge("b", "a")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Completed { steps: 0 });
  assert_eq!(recorder.events(), vec!["complete"]);
}

#[tokio::test]
async fn test_empty_diagram_completes() {
  let recorder = Arc::new(Recorder::default());
  let outcome = runner(vec![], vec![], recorder.clone()).run().await.unwrap();
  assert_eq!(outcome, SimulationOutcome::Completed { steps: 0 });
  assert!(recorder.completed());
}

#[tokio::test]
async fn test_reachable_cycle_runs_until_stopped() {
  let recorder = Arc::new(Recorder {
    stop_after_steps: Some(10),
    ..Recorder::default()
  });
  let nodes = vec![node("s"), node("a"), node("b")];
  let edges = vec![edge("s", "a"), edge("a", "b"), edge("b", "a")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Stopped { steps: 10 });
  assert_eq!(
    recorder.processed_ids(),
    vec!["s", "a", "b", "a", "b", "a", "b", "a", "b", "a"]
  );
  assert!(!recorder.completed());
}

#[tokio::test]
async fn test_is_stopped_after_first_enter_halts_traversal() {
  let recorder = Arc::new(Recorder {
    stop_on_enter: Some("a".to_string()),
    ..Recorder::default()
  });
  let nodes = vec![node("a"), node("b"), node("c")];
  let edges = vec![edge("a", "b"), edge("b", "c")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Stopped { steps: 0 });
  assert_eq!(recorder.events(), vec!["enter:a"]);
}

#[tokio::test]
async fn test_stop_halts_remaining_start_nodes() {
  let recorder = Arc::new(Recorder {
    stop_on_enter: Some("b".to_string()),
    ..Recorder::default()
  });
  let nodes = vec![node("a"), node("b"), node("c")];

  let outcome = runner(nodes, vec![], recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Stopped { steps: 1 });
  assert_eq!(recorder.entered_ids(), vec!["a", "b"]);
  assert!(!recorder.completed());
}

#[tokio::test]
async fn test_runner_stop_during_delay() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let nodes = vec![node("a"), node("b"), node("c")];
  let edges = vec![edge("a", "b"), edge("b", "c")];
  let runner = Arc::new(SimulationRunner::new(
    nodes,
    edges,
    10_000,
    Arc::new(ChannelObserver::new(tx)),
  ));

  let handle = tokio::spawn({
    let runner = runner.clone();
    async move { runner.run().await }
  });

  let first = rx.recv().await.unwrap();
  assert_eq!(
    first,
    SimulationEvent::NodeEntered {
      node_id: "a".to_string()
    }
  );
  runner.stop();

  let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
    .await
    .expect("stop should interrupt the pacing delay")
    .unwrap()
    .unwrap();

  assert_eq!(outcome, SimulationOutcome::Stopped { steps: 0 });
  assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_stop_handle_from_another_task() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("s"), node("a"), node("b")];
  let edges = vec![edge("s", "a"), edge("a", "b"), edge("b", "a")];

  let runner = SimulationRunner::new(nodes, edges, 0, recorder.clone());
  let stop = runner.stop_handle();

  let stopper = tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.stop();
  });

  let outcome = runner.run().await.unwrap();
  stopper.await.unwrap();

  assert!(matches!(outcome, SimulationOutcome::Stopped { .. }));
  assert!(!recorder.completed());
}

#[tokio::test]
async fn test_run_twice_is_rejected() {
  let runner = runner(vec![node("a")], vec![], Arc::new(Recorder::default()));
  runner.run().await.unwrap();
  assert!(matches!(runner.run().await, Err(SimulationError::AlreadyRun)));
}

#[tokio::test]
async fn test_seed_fallbacks() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![
    node("empty"),
    node("raw").with_dummy_data("not json"),
    node("child").with_dummy_data(r#"{"ignored":true}"#),
  ];
  let edges = vec![edge("raw", "child")];

  runner(nodes, edges, recorder.clone()).run().await.unwrap();

  let steps = recorder.steps();
  assert_eq!(steps[0].input_data, json!({"_empty": true}));
  assert_eq!(steps[1].input_data, json!({"raw": "not json"}));
  assert_eq!(steps[2].node_id, "child");
  assert_eq!(steps[2].input_data, json!({"raw": "not json"}));
}

#[tokio::test]
async fn test_pipeline_of_transformations() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![
    node("src").with_dummy_data(r#"{"name":"Ada","email":"","age":null,"active":false}"#),
    node("clean").with_transformation(TransformationType::Filter),
    node("stamp").with_transformation(TransformationType::AddTimestamp),
    node("batch").with_transformation(TransformationType::Aggregate),
  ];
  let edges = vec![edge("src", "clean"), edge("clean", "stamp"), edge("stamp", "batch")];

  runner(nodes, edges, recorder.clone()).run().await.unwrap();

  let steps = recorder.steps();
  assert_eq!(steps[1].output_data, json!({"name": "Ada", "active": false}));
  assert!(steps[2].output_data["timestamp"].is_string());
  assert_eq!(steps[3].output_data["count"], 1);
  assert_eq!(steps[3].output_data["data"][0]["name"], "Ada");
}

#[tokio::test(start_paused = true)]
async fn test_speed_paces_each_node() {
  let recorder = Arc::new(Recorder::default());
  let nodes = vec![node("a"), node("b"), node("c")];
  let edges = vec![edge("a", "b"), edge("b", "c")];
  let runner = SimulationRunner::new(nodes, edges, 250, recorder.clone());

  let started = tokio::time::Instant::now();
  runner.run().await.unwrap();

  assert!(started.elapsed() >= Duration::from_millis(750));
  let steps = recorder.steps();
  assert!(steps.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_pause_holds_until_resume() {
  let observer = Arc::new(StateObserver::new(SimulationState::new(0)));
  observer.pause();

  let nodes = vec![node("a").with_dummy_data("1"), node("b")];
  let edges = vec![edge("a", "b")];
  let runner = SimulationRunner::new(nodes, edges, 0, observer.clone())
    .with_config(SimulationConfig::from_speed_ms(0).with_poll_interval(Duration::from_millis(10)));

  let handle = tokio::spawn(async move { runner.run().await });

  tokio::time::sleep(Duration::from_millis(100)).await;
  let state = observer.snapshot();
  assert!(state.steps.is_empty());
  assert_eq!(state.current_node_id.as_deref(), Some("a"));

  observer.resume();
  let outcome = handle.await.unwrap().unwrap();

  assert_eq!(outcome, SimulationOutcome::Completed { steps: 2 });
  let state = observer.snapshot();
  assert!(!state.is_running);
  assert_eq!(state.steps.len(), 2);
  assert_eq!(state.steps[1].input_data, json!(1));
}

#[tokio::test]
async fn test_stop_while_paused_exits() {
  let observer = Arc::new(StateObserver::new(SimulationState::new(0)));
  observer.pause();

  let runner = SimulationRunner::new(vec![node("a")], vec![], 0, observer.clone())
    .with_config(SimulationConfig::from_speed_ms(0).with_poll_interval(Duration::from_millis(10)));
  let handle = tokio::spawn(async move { runner.run().await });

  tokio::time::sleep(Duration::from_millis(50)).await;
  observer.stop();

  let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
    .await
    .expect("stop should end a paused run")
    .unwrap()
    .unwrap();

  assert_eq!(outcome, SimulationOutcome::Stopped { steps: 0 });
  assert!(observer.snapshot().steps.is_empty());
}

#[tokio::test]
async fn test_api_error_flows_downstream() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/orders"))
    .respond_with(ResponseTemplate::new(500))
    .expect(1)
    .mount(&server)
    .await;

  let recorder = Arc::new(Recorder::default());
  let api = ApiConfig {
    enabled: true,
    method: HttpMethod::Post,
    url: format!("{}/orders", server.uri()),
    ..ApiConfig::default()
  };
  let nodes = vec![
    node("client").with_dummy_data(r#"{"sku":"A1"}"#),
    node("api")
      .with_transformation(TransformationType::ApiCall)
      .with_api_config(api),
    node("log"),
  ];
  let edges = vec![edge("client", "api"), edge("api", "log")];

  let outcome = runner(nodes, edges, recorder.clone()).run().await.unwrap();

  assert_eq!(outcome, SimulationOutcome::Completed { steps: 3 });
  let steps = recorder.steps();
  assert!(steps[1].is_error());
  assert_eq!(steps[1].output_data["_status"], 500);
  assert_eq!(steps[1].output_data["_input"], json!({"sku": "A1"}));
  assert_eq!(steps[2].input_data, steps[1].output_data);
}

#[tokio::test]
async fn test_api_call_uses_seed_in_url() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/users/42"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42, "name": "Ada"})))
    .expect(1)
    .mount(&server)
    .await;

  let observer = Arc::new(StateObserver::new(SimulationState::new(0)));
  let api = ApiConfig {
    enabled: true,
    url: format!("{}/users/{{{{$input.id}}}}", server.uri()),
    body: Some("{}".to_string()),
    ..ApiConfig::default()
  };
  let nodes = vec![
    node("seed").with_dummy_data(r#"{"id":42}"#),
    node("fetch")
      .with_transformation(TransformationType::ApiCall)
      .with_api_config(api),
  ];
  let edges = vec![edge("seed", "fetch")];

  SimulationRunner::new(nodes, edges, 0, observer.clone())
    .run()
    .await
    .unwrap();

  let state = observer.snapshot();
  assert_eq!(state.steps[1].output_data, json!({"id": 42, "name": "Ada"}));
  assert_eq!(state.error_steps().count(), 0);
}
