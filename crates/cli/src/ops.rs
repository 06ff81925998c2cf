//! Subcommand implementations. Each returns the text to print.

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use emr_core::{Cohort, CoreConfig, EntityUuid, Program, ProgramWorkflow, ProgramWorkflowState};
use emr_wire::{CohortDefinition, EnrollmentRecord, ProgramDefinition};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CohortOperation {
    Union,
    Intersect,
    Subtract,
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(input: &str) -> anyhow::Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid date: {input}"))?;
        return Ok(midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(input)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid date '{input}', expected YYYY-MM-DD or RFC 3339"))
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_program(path: &Path) -> anyhow::Result<Arc<Program>> {
    let program = ProgramDefinition::parse(&read(path)?)
        .with_context(|| format!("failed to load programme from {}", path.display()))?;
    Ok(Arc::new(program))
}

fn find_workflow<'a>(
    program: &'a Program,
    key: &str,
    config: &CoreConfig,
) -> anyhow::Result<&'a ProgramWorkflow> {
    let found = match EntityUuid::parse(key) {
        Ok(uuid) => program.workflow(uuid),
        Err(_) => program.workflow_by_name(key, config.locale()),
    };
    found.ok_or_else(|| anyhow!("programme {} has no workflow '{key}'", program.name))
}

fn find_state(
    program: &Program,
    key: &str,
    config: &CoreConfig,
) -> anyhow::Result<Arc<ProgramWorkflowState>> {
    let mut matches: Vec<&Arc<ProgramWorkflowState>> = match EntityUuid::parse(key) {
        Ok(uuid) => program
            .all_workflows()
            .iter()
            .filter_map(|wf| wf.state_by_uuid(uuid))
            .collect(),
        Err(_) => program
            .workflows()
            .filter_map(|wf| wf.state_by_name(key, config.locale()))
            .collect(),
    };

    match matches.len() {
        0 => bail!("programme {} has no state '{key}'", program.name),
        1 => Ok(Arc::clone(matches.remove(0))),
        n => bail!("state name '{key}' is ambiguous ({n} workflows have it), use the UUID"),
    }
}

fn describe_state(state: &ProgramWorkflowState, config: &CoreConfig) -> String {
    let mut line = format!("{}\t{}", state.uuid, state.name(config.locale()));
    if state.initial {
        line.push_str(" [initial]");
    }
    if state.terminal {
        line.push_str(" [terminal]");
    }
    line
}

/// One line per state the enrollment may legally move to next in `workflow`.
pub fn next_states(
    program_path: &Path,
    enrollment_path: &Path,
    workflow: &str,
    config: &CoreConfig,
) -> anyhow::Result<String> {
    let program = load_program(program_path)?;
    let enrollment = EnrollmentRecord::parse(&read(enrollment_path)?, &program)
        .with_context(|| format!("failed to load enrollment from {}", enrollment_path.display()))?;
    let workflow = find_workflow(&program, workflow, config)?;

    let mut out = String::new();
    for state in workflow.possible_next_states(&enrollment, config.locale()) {
        writeln!(out, "{}", describe_state(&state, config))?;
    }
    Ok(out)
}

/// Applies one transition. With `write` the enrollment file is overwritten and a summary is
/// returned; otherwise the updated record is returned as YAML.
pub fn transition(
    program_path: &Path,
    enrollment_path: &Path,
    state: &str,
    on: Option<DateTime<Utc>>,
    write: bool,
    config: &CoreConfig,
) -> anyhow::Result<String> {
    let program = load_program(program_path)?;
    let mut enrollment = EnrollmentRecord::parse(&read(enrollment_path)?, &program)
        .with_context(|| format!("failed to load enrollment from {}", enrollment_path.display()))?;
    let target = find_state(&program, state, config)?;

    let on = on.unwrap_or_else(Utc::now);
    enrollment
        .transition_to_state(&target, Some(on))
        .with_context(|| format!("cannot move to {}", target.name(config.locale())))?;
    tracing::info!(enrollment = %enrollment.uuid, state = %target.uuid, "transition applied");

    let rendered = EnrollmentRecord::render(&enrollment)?;
    if !write {
        return Ok(rendered);
    }

    fs::write(enrollment_path, rendered)
        .with_context(|| format!("failed to write {}", enrollment_path.display()))?;
    let mut out = format!("{}\n", describe_state(&target, config));
    if let Some(completed) = enrollment.date_completed() {
        writeln!(out, "enrollment completed on {}", completed.to_rfc3339())?;
    }
    Ok(out)
}

pub fn combine_cohorts(op: CohortOperation, a_path: &Path, b_path: &Path) -> anyhow::Result<String> {
    let a = CohortDefinition::parse(&read(a_path)?)
        .with_context(|| format!("failed to load cohort from {}", a_path.display()))?;
    let b = CohortDefinition::parse(&read(b_path)?)
        .with_context(|| format!("failed to load cohort from {}", b_path.display()))?;

    let result = match op {
        CohortOperation::Union => Cohort::union(Some(&a), Some(&b)),
        CohortOperation::Intersect => Cohort::intersect(Some(&a), Some(&b)),
        CohortOperation::Subtract => Cohort::subtract(Some(&a), Some(&b)),
    };
    Ok(CohortDefinition::render(&result)?)
}
