use stacked_errors::{Result, StackableErr};
use tokio::task::{self, JoinHandle};
use tracing::debug;

use crate::Command;

/// The per-container operations that can be fanned out over a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerOp {
    Start,
    Stop,
    Remove,
}

impl DockerOp {
    /// The `docker` subcommand this op dispatches
    pub fn as_subcommand(&self) -> &'static str {
        match self {
            DockerOp::Start => "start",
            DockerOp::Stop => "stop",
            DockerOp::Remove => "rm",
        }
    }
}

/// The result of one fanned-out operation, independent of its siblings
#[derive(Debug)]
#[must_use]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<()>,
}

/// Concurrently runs `docker <op> <name>` for every name, one unbounded task
/// per container, with no per-item timeout and no coordination beyond the
/// final join. Each task prints its own report the moment it completes: the
/// container name on success, the error on failure. Returns one outcome per
/// dispatched name, in dispatch order; a failed item never disturbs its
/// siblings.
pub async fn dispatch_batch(
    op: DockerOp,
    names: Vec<String>,
    debug_forward: bool,
) -> Result<Vec<BatchOutcome>> {
    dispatch_with_program("docker", op.as_subcommand(), names, debug_forward).await
}

async fn dispatch_with_program(
    program: &str,
    subcommand: &str,
    names: Vec<String>,
    debug_forward: bool,
) -> Result<Vec<BatchOutcome>> {
    debug!(
        "dispatching `{program} {subcommand}` over {} containers",
        names.len()
    );
    let mut handles: Vec<JoinHandle<BatchOutcome>> = vec![];
    for name in names {
        let command = Command::new(program)
            .arg(subcommand)
            .arg(&name)
            .debug(debug_forward);
        handles.push(task::spawn(async move {
            let result = run_one(command).await;
            match &result {
                Ok(()) => println!("{name}"),
                Err(e) => eprintln!("{e:?}"),
            }
            BatchOutcome { name, result }
        }));
    }
    let mut outcomes = vec![];
    for handle in handles {
        outcomes.push(
            handle
                .await
                .stack_err("dispatch_batch -> a batch task panicked")?,
        );
    }
    Ok(outcomes)
}

async fn run_one(command: Command) -> Result<()> {
    let comres = command.run_to_completion().await.stack()?;
    comres.assert_success().stack()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("container_{i}")).collect()
    }

    #[tokio::test]
    async fn one_outcome_per_dispatched_name() {
        let outcomes = dispatch_with_program("true", "start", names(5), false)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        // join order is dispatch order even though completions race
        let reported: Vec<String> = outcomes.into_iter().map(|o| o.name).collect();
        assert_eq!(reported, names(5));
    }

    #[tokio::test]
    async fn failures_are_contained_per_item() {
        let outcomes = dispatch_with_program("false", "stop", names(3), false)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.result.is_err()));
    }

    #[tokio::test]
    async fn empty_selection_dispatches_nothing() {
        let outcomes = dispatch_with_program("true", "rm", vec![], false)
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }
}
