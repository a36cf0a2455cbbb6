use crate::{
    cli::args::{DotArgs, ExecutionsArgs, RunArgs, ValidateArgs},
    core::{
        config::WeftConfig,
        workflow::{
            dot, validator, EchoExecutor, Engine, ExecutionStatus, FileExecutionStore, NodeStatus,
            WorkflowExecution, WorkflowGraph,
        },
    },
    Result,
};
use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub async fn validate(args: ValidateArgs) -> Result<()> {
    let graph = WorkflowGraph::load_from_file(&args.file)
        .with_context(|| format!("failed to load workflow from {}", args.file.display()))?;
    let result = validator::validate(&graph);

    if result.is_valid {
        println!(
            "OK: workflow '{}' ({} nodes, {} edges)",
            graph.name,
            graph.nodes.len(),
            graph.edges.len()
        );
        return Ok(());
    }

    eprintln!(
        "workflow '{}' failed validation with {} error(s):",
        graph.name,
        result.errors.len()
    );
    for error in &result.errors {
        eprintln!("  - {}", error);
    }
    bail!("workflow validation failed");
}

pub async fn run(args: RunArgs) -> Result<()> {
    let graph = WorkflowGraph::load_from_file(&args.file)
        .with_context(|| format!("failed to load workflow from {}", args.file.display()))?;

    let input = match args.input.as_deref() {
        Some(raw) => serde_json::from_str::<Value>(raw).context("--input is not valid JSON")?,
        None => Value::Object(serde_json::Map::new()),
    };

    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let config = WeftConfig::load(&cwd)?;
    let state_dir = args.state_dir.clone().unwrap_or(config.state_dir);
    let store = Arc::new(FileExecutionStore::new(&state_dir));

    let engine = Engine::builder()
        .executors(EchoExecutor::registry())
        .store(store)
        .build();

    let mut execution = engine
        .start(&graph, input)
        .await
        .map_err(|err| anyhow!("{}", err))?;

    while execution.status == ExecutionStatus::Running {
        let node_id = match execution.current_node_id.clone() {
            Some(id) => id,
            None => break,
        };
        if execution.node_status(&node_id) != NodeStatus::Waiting {
            break;
        }

        let node_name = execution
            .snapshot
            .node(&node_id)
            .map(|node| node.display_name().to_string())
            .unwrap_or_else(|| node_id.clone());

        let payload = if args.yes {
            Value::Object(serde_json::Map::new())
        } else {
            prompt_human_task(&node_name)?
        };

        engine
            .submit_human_task(&mut execution, &node_id, payload)
            .await
            .map_err(|err| anyhow!("{}", err))?;
    }

    report_execution(&execution);

    if execution.status == ExecutionStatus::Failed {
        bail!("execution {} failed", execution.id);
    }
    Ok(())
}

pub async fn dot(args: DotArgs) -> Result<()> {
    let graph = WorkflowGraph::load_from_file(&args.file)
        .with_context(|| format!("failed to load workflow from {}", args.file.display()))?;
    println!("{}", dot::graph_to_dot(&graph));
    Ok(())
}

pub async fn executions(args: ExecutionsArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let config = WeftConfig::load(&cwd)?;
    let state_dir = args.state_dir.clone().unwrap_or(config.state_dir);
    let store = FileExecutionStore::new(&state_dir);

    let summaries = store.list().map_err(|err| anyhow!("{}", err))?;
    if summaries.is_empty() {
        println!("no executions found under {}", state_dir.display());
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:<20}  {}",
        "EXECUTION", "STATUS", "STARTED", "WORKFLOW"
    );
    for summary in summaries {
        println!(
            "{:<36}  {:<10}  {:<20}  {}",
            summary.execution_id,
            summary.status,
            summary.started_at.format("%Y-%m-%d %H:%M:%S"),
            summary.workflow_id
        );
    }
    Ok(())
}

/// Read one line of JSON from stdin for a waiting human task. An empty
/// line submits an empty payload.
fn prompt_human_task(node_name: &str) -> Result<Value> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        write!(stdout, "[{}] response JSON (empty for {{}}): ", node_name)?;
        stdout.flush()?;
        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line)?;
        if read == 0 {
            // stdin closed; behave like --yes for the remaining tasks
            return Ok(Value::Object(serde_json::Map::new()));
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => return Ok(value),
            Err(err) => eprintln!("invalid JSON ({}), try again", err),
        }
    }
}

fn report_execution(execution: &WorkflowExecution) {
    println!();
    println!("execution {}", execution.id);
    println!("  workflow: {}", execution.workflow_name);
    println!("  status:   {}", execution.status);
    if let Some(completed_at) = execution.completed_at {
        println!(
            "  finished: {}",
            completed_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
        );
    }
    if let Some(failure) = &execution.failure {
        println!(
            "  failure:  [{}] {}{}",
            failure.code,
            failure.message,
            failure
                .node_id
                .as_deref()
                .map(|id| format!(" (node {})", id))
                .unwrap_or_default()
        );
    }

    if !execution.node_results.is_empty() {
        println!("  results:");
        let mut node_ids: Vec<&String> = execution.node_results.keys().collect();
        node_ids.sort();
        for node_id in node_ids {
            let rendered = serde_json::to_string(&execution.node_results[node_id])
                .unwrap_or_else(|_| "<unserializable>".to_string());
            println!("    {}: {}", node_id, rendered);
        }
    }

    println!("  log:");
    for entry in &execution.log {
        let node = entry
            .node_id
            .as_deref()
            .map(|id| format!(" {}", id))
            .unwrap_or_default();
        println!(
            "    {}{} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            node,
            entry.message
        );
    }
}
