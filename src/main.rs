use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use archflow_config::Diagram;
use archflow_engine::{
  ChannelObserver, SimulationConfig, SimulationControl, SimulationEvent, SimulationOutcome,
  SimulationRunner, SimulationStep,
};
use archflow_workflow::Graph;

/// Archflow - simulate data flowing through an architecture diagram
#[derive(Parser)]
#[command(name = "archflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Log filter directive (default: $RUST_LOG, then "warn")
  #[arg(long, global = true)]
  log_filter: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a simulation and print each step as it happens
  Simulate {
    /// Path to the diagram export (JSON)
    diagram_file: PathBuf,

    /// Delay before each node, in milliseconds
    #[arg(long, default_value_t = 500)]
    speed: u64,

    /// How often pause/stop are re-checked while waiting, in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval: u64,

    /// Print steps as JSON lines instead of text
    #[arg(long)]
    json: bool,
  },

  /// Show start nodes, join points and dangling edges
  Inspect {
    /// Path to the diagram export (JSON)
    diagram_file: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_filter.as_deref());

  match cli.command {
    Some(Commands::Simulate {
      diagram_file,
      speed,
      poll_interval,
      json,
    }) => {
      let config = SimulationConfig::from_speed_ms(speed)
        .with_poll_interval(std::time::Duration::from_millis(poll_interval));
      let rt = tokio::runtime::Runtime::new()?;
      let result = rt.block_on(async { simulate(diagram_file, config, json).await });
      // The stdin reader may still be blocked on a read
      rt.shutdown_background();
      result?;
    }
    Some(Commands::Inspect { diagram_file }) => {
      inspect(diagram_file)?;
    }
    None => {
      println!("archflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(filter: Option<&str>) {
  let filter = match filter {
    Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn")),
    None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn load_diagram(diagram_file: &Path) -> Result<Diagram> {
  Diagram::from_path(diagram_file)
    .with_context(|| format!("failed to load diagram: {}", diagram_file.display()))
}

async fn simulate(diagram_file: PathBuf, config: SimulationConfig, json: bool) -> Result<()> {
  let diagram = load_diagram(&diagram_file)?;
  eprintln!(
    "Loaded diagram: {} nodes, {} edges",
    diagram.nodes.len(),
    diagram.edges.len()
  );

  let labels: HashMap<String, String> = diagram
    .nodes
    .iter()
    .map(|n| (n.id.clone(), n.label().to_string()))
    .collect();

  let (sender, mut events) = mpsc::unbounded_channel();
  let control = SimulationControl::new();
  let observer = ChannelObserver::new(sender).with_control(control.clone());

  let runner = Arc::new(
    SimulationRunner::new(
      diagram.nodes,
      diagram.edges,
      config.speed.as_millis() as u64,
      Arc::new(observer),
    )
    .with_config(config),
  );

  // Ctrl-C stops the run
  let stop = runner.stop_handle();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Stopping...");
      stop.stop();
    }
  });

  // "pause" / "resume" / "stop" on stdin
  tokio::spawn(read_commands(control));

  let mut run = tokio::spawn({
    let runner = runner.clone();
    async move { runner.run().await }
  });

  let mut step_count = 0;
  let outcome = loop {
    tokio::select! {
      biased;
      Some(event) = events.recv() => print_event(&event, &labels, &mut step_count, json)?,
      result = &mut run => {
        while let Ok(event) = events.try_recv() {
          print_event(&event, &labels, &mut step_count, json)?;
        }
        break result.context("simulation task failed")??;
      }
    }
  };

  match outcome {
    SimulationOutcome::Completed { steps: 0 } => {
      eprintln!("Simulation finished with no steps (no node without incoming edges)");
    }
    SimulationOutcome::Completed { steps } => {
      eprintln!("Simulation completed: {} steps", steps);
    }
    SimulationOutcome::Stopped { steps } => {
      eprintln!("Simulation stopped after {} steps", steps);
    }
  }

  Ok(())
}

async fn read_commands(control: SimulationControl) {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Ok(Some(line)) = lines.next_line().await {
    match line.trim() {
      "pause" | "p" => {
        control.pause();
        eprintln!("Paused");
      }
      "resume" | "r" => {
        control.resume();
        eprintln!("Resumed");
      }
      "stop" | "s" => {
        control.stop();
        eprintln!("Stopping...");
        break;
      }
      "" => {}
      other => eprintln!("unknown command '{}' (pause, resume, stop)", other),
    }
  }
}

fn print_event(
  event: &SimulationEvent,
  labels: &HashMap<String, String>,
  step_count: &mut usize,
  json: bool,
) -> Result<()> {
  match event {
    SimulationEvent::NodeEntered { node_id } if !json => {
      let label = labels.get(node_id).map(String::as_str).unwrap_or(node_id);
      println!("→ {} ({})", label, node_id);
    }
    SimulationEvent::NodeProcessed(step) => {
      *step_count += 1;
      if json {
        println!("{}", serde_json::to_string(step)?);
      } else {
        print_step(*step_count, step);
      }
    }
    SimulationEvent::Completed if !json => println!("Simulation complete"),
    _ => {}
  }
  Ok(())
}

fn print_step(index: usize, step: &SimulationStep) {
  let marker = if step.is_error() { "✗" } else { "✓" };
  println!("{} [{}] {}", marker, index, step.node_name);
  println!("    in:  {}", step.input_data);
  println!("    out: {}", step.output_data);
}

fn inspect(diagram_file: PathBuf) -> Result<()> {
  let diagram = load_diagram(&diagram_file)?;
  let graph = Graph::new(&diagram.nodes, &diagram.edges);

  println!("Nodes: {}", diagram.nodes.len());
  println!("Edges: {}", diagram.edges.len());

  println!("Start nodes:");
  if graph.start_nodes().is_empty() {
    println!("  (none - every node has an incoming edge)");
  }
  for node in graph.start_nodes() {
    println!("  {} ({}) [{}]", node.label(), node.id, node.data.transformation_type);
  }

  let mut joins: Vec<&str> = graph.join_points().iter().copied().collect();
  joins.sort_unstable();
  if !joins.is_empty() {
    println!("Join points (visited once per incoming edge):");
    for id in joins {
      println!("  {}", id);
    }
  }

  if !graph.dangling_edges().is_empty() {
    println!("Dangling edges (skipped during simulation):");
    for edge in graph.dangling_edges() {
      println!("  {}: {} -> {}", edge.id, edge.source, edge.target);
    }
  }

  println!("Flow:");
  for node in &diagram.nodes {
    let targets: Vec<&str> = graph
      .outgoing(&node.id)
      .iter()
      .map(|e| e.target.as_str())
      .collect();
    if !targets.is_empty() {
      println!("  {} -> {}", node.id, targets.join(", "));
    }
  }

  Ok(())
}
