//! Best-effort OWS catalogue refresh.
//!
//! After an ingestion run publishes new datasets, the long-running OWS
//! container has to re-read its layer configuration: update the
//! materialized views, update the main catalogue, then restart the
//! container. All three steps are fire-and-forget — each failure is
//! logged and the next step is still attempted, and nothing here ever
//! changes the batch run's exit status.

use std::process::Command;

use tracing::{error, info};

/// Default name of the OWS container in the deployment's compose stack.
pub const DEFAULT_OWS_CONTAINER: &str = "drought-drought_ows-1";

/// One refresh step: a command to run and a label for the log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwsStep {
    /// Log label, e.g. "datacube-ows-update --views".
    pub label: String,
    /// Program to execute.
    pub program: String,
    /// Arguments to the program.
    pub args: Vec<String>,
}

/// Trigger for the external map-service catalogue reload.
#[derive(Debug, Clone)]
pub struct OwsRefresh {
    container: String,
}

impl OwsRefresh {
    /// Refresh trigger against `container`.
    pub fn new(container: impl Into<String>) -> Self {
        OwsRefresh {
            container: container.into(),
        }
    }

    /// The three refresh steps, in issue order.
    pub fn steps(&self) -> Vec<OwsStep> {
        let exec = |update_cmd: &str| {
            vec![
                "exec".to_string(),
                self.container.clone(),
                "bash".to_string(),
                "-lc".to_string(),
                update_cmd.to_string(),
            ]
        };
        vec![
            OwsStep {
                label: "datacube-ows-update --views".to_string(),
                program: "docker".to_string(),
                args: exec("datacube-ows-update --views"),
            },
            OwsStep {
                label: "datacube-ows-update".to_string(),
                program: "docker".to_string(),
                args: exec("datacube-ows-update"),
            },
            OwsStep {
                label: "restart ows container".to_string(),
                program: "docker".to_string(),
                args: vec!["restart".to_string(), self.container.clone()],
            },
        ]
    }

    /// Issue all refresh steps sequentially, logging failures only.
    pub fn trigger(&self) {
        info!("Triggering OWS update");
        let mut all_ok = true;
        for step in self.steps() {
            match Command::new(&step.program).args(&step.args).status() {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    all_ok = false;
                    error!("{} failed ({status})", step.label);
                }
                Err(err) => {
                    all_ok = false;
                    error!("{} could not be launched: {err}", step.label);
                }
            }
        }
        if all_ok {
            info!("OWS update completed successfully");
        }
    }
}

impl Default for OwsRefresh {
    fn default() -> Self {
        OwsRefresh::new(DEFAULT_OWS_CONTAINER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_target_the_configured_container() {
        let refresh = OwsRefresh::new("ows-test-1");
        let steps = refresh.steps();
        assert_eq!(steps.len(), 3);

        assert_eq!(steps[0].program, "docker");
        assert_eq!(
            steps[0].args,
            vec!["exec", "ows-test-1", "bash", "-lc", "datacube-ows-update --views"]
        );
        assert_eq!(
            steps[1].args,
            vec!["exec", "ows-test-1", "bash", "-lc", "datacube-ows-update"]
        );
        assert_eq!(steps[2].args, vec!["restart", "ows-test-1"]);
    }

    #[test]
    fn views_update_comes_before_main_update() {
        let steps = OwsRefresh::default().steps();
        assert!(steps[0].label.contains("--views"));
        assert!(!steps[1].label.contains("--views"));
    }
}
