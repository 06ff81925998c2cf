//! Programme catalogue wire model.
//!
//! One YAML document describes one programme with its workflows and their states:
//!
//! ```yaml
//! uuid: 5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51
//! name: TB treatment
//! concept: { uuid: ..., names: [{ name: TB, locale: en, preferred: true }] }
//! workflows:
//!   - uuid: ...
//!     concept: { ... }
//!     states:
//!       - uuid: ...
//!         concept: { ... }
//!         initial: true
//! ```
//!
//! State and workflow UUIDs must be unique within the document.

use crate::common::{
    from_yaml, optional_text, parse_text, parse_uuid, to_yaml, ConceptWire, RetireWire,
};
use crate::{WireError, WireResult};
use emr_core::{Program, ProgramWorkflow, ProgramWorkflowState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Programme catalogue operations.
///
/// This is a zero-sized type used for namespacing programme-related operations.
pub struct ProgramDefinition;

impl ProgramDefinition {
    /// Parse a programme catalogue from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if:
    /// - the YAML does not match the wire schema (unknown keys included),
    /// - a UUID is malformed or repeated,
    /// - a name or reason is blank, or a locale is malformed.
    pub fn parse(yaml_text: &str) -> WireResult<Program> {
        let wire: ProgramWire = from_yaml(yaml_text, "Programme")?;
        wire_to_domain(wire)
    }

    /// Render a programme, including retired workflows and states, as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if serialization fails.
    pub fn render(program: &Program) -> WireResult<String> {
        to_yaml(&domain_to_wire(program), "programme")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ProgramWire {
    pub uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub concept: ConceptWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes_concept: Option<ConceptWire>,
    #[serde(default)]
    pub workflows: Vec<WorkflowWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired: Option<RetireWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct WorkflowWire {
    pub uuid: String,
    pub concept: ConceptWire,
    #[serde(default)]
    pub states: Vec<StateWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired: Option<RetireWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct StateWire {
    pub uuid: String,
    pub concept: ConceptWire,
    #[serde(default)]
    pub initial: bool,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired: Option<RetireWire>,
}

fn wire_to_domain(wire: ProgramWire) -> WireResult<Program> {
    let uuid = parse_uuid(&wire.uuid, "uuid")?;
    let name = parse_text(&wire.name, "name")?;
    let concept = wire.concept.to_domain("concept")?;

    let mut program = Program::with_uuid(uuid, name, concept);
    program.description = optional_text(wire.description.as_deref(), "description")?;
    program.outcomes_concept = wire
        .outcomes_concept
        .as_ref()
        .map(|c| c.to_domain("outcomes_concept"))
        .transpose()?;
    if let Some(retired) = &wire.retired {
        retired.apply(&mut program.retire, "retired")?;
    }

    let mut seen = HashSet::new();
    for (i, wf_wire) in wire.workflows.iter().enumerate() {
        let field = format!("workflows[{i}]");
        let workflow = workflow_to_domain(wf_wire, &field, &mut seen)?;
        program.add_workflow(workflow);
    }

    Ok(program)
}

fn workflow_to_domain(
    wire: &WorkflowWire,
    field: &str,
    seen: &mut HashSet<emr_uuid::EntityUuid>,
) -> WireResult<ProgramWorkflow> {
    let uuid = parse_uuid(&wire.uuid, &format!("{field}.uuid"))?;
    if !seen.insert(uuid) {
        return Err(WireError::InvalidInput(format!(
            "{field}.uuid: duplicate UUID {uuid}"
        )));
    }

    let mut workflow = ProgramWorkflow::with_uuid(uuid, wire.concept.to_domain(&format!("{field}.concept"))?);
    if let Some(retired) = &wire.retired {
        retired.apply(&mut workflow.retire, &format!("{field}.retired"))?;
    }

    for (j, state_wire) in wire.states.iter().enumerate() {
        let field = format!("{field}.states[{j}]");
        let state_uuid = parse_uuid(&state_wire.uuid, &format!("{field}.uuid"))?;
        if !seen.insert(state_uuid) {
            return Err(WireError::InvalidInput(format!(
                "{field}.uuid: duplicate UUID {state_uuid}"
            )));
        }

        let mut state = ProgramWorkflowState::with_uuid(
            state_uuid,
            state_wire.concept.to_domain(&format!("{field}.concept"))?,
            state_wire.initial,
            state_wire.terminal,
        );
        if let Some(retired) = &state_wire.retired {
            retired.apply(&mut state.retire, &format!("{field}.retired"))?;
        }
        workflow.add_state(state);
    }

    Ok(workflow)
}

fn domain_to_wire(program: &Program) -> ProgramWire {
    ProgramWire {
        uuid: program.uuid.to_string(),
        name: program.name.to_string(),
        description: program.description.as_ref().map(|d| d.to_string()),
        concept: ConceptWire::from_domain(&program.concept),
        outcomes_concept: program.outcomes_concept.as_ref().map(ConceptWire::from_domain),
        workflows: program
            .all_workflows()
            .iter()
            .map(|wf| WorkflowWire {
                uuid: wf.uuid.to_string(),
                concept: ConceptWire::from_domain(&wf.concept),
                states: wf
                    .all_states()
                    .iter()
                    .map(|s| StateWire {
                        uuid: s.uuid.to_string(),
                        concept: ConceptWire::from_domain(&s.concept),
                        initial: s.initial,
                        terminal: s.terminal,
                        retired: RetireWire::from_domain(&s.retire),
                    })
                    .collect(),
                retired: RetireWire::from_domain(&wf.retire),
            })
            .collect(),
        retired: RetireWire::from_domain(&program.retire),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_core::{Locale, Retireable};

    const SAMPLE: &str = r#"uuid: "5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51"
name: TB treatment
concept:
  uuid: "0b7e3a52-1c4d-4e8f-9a6b-7c2d1e0f3a94"
  names:
    - name: Tuberculosis
      locale: en
      preferred: true
workflows:
  - uuid: "9d2a4c6e-8f1b-4a3c-b5d7-e9f0a1b2c3d4"
    concept:
      uuid: "1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d"
      names:
        - name: Treatment status
          locale: en
    states:
      - uuid: "aaaaaaaa-1111-4111-8111-111111111111"
        concept:
          uuid: "bbbbbbbb-1111-4111-8111-111111111111"
          names:
            - name: On treatment
              locale: en
        initial: true
      - uuid: "aaaaaaaa-2222-4222-8222-222222222222"
        concept:
          uuid: "bbbbbbbb-2222-4222-8222-222222222222"
          names:
            - name: Cured
              locale: en
            - name: Guéri
              locale: fr
        terminal: true
"#;

    #[test]
    fn parses_sample_catalogue() {
        let program = ProgramDefinition::parse(SAMPLE).expect("parse yaml");
        assert_eq!(program.name.as_str(), "TB treatment");
        assert_eq!(program.all_workflows().len(), 1);

        let wf = &program.all_workflows()[0];
        assert_eq!(wf.program(), Some(program.uuid));
        assert_eq!(wf.all_states().len(), 2);

        let cured = wf.state_by_name("cured", &Locale::default()).expect("cured state");
        assert!(cured.terminal);
        assert!(!cured.initial);
        assert_eq!(cured.workflow(), Some(wf.uuid));
        assert_eq!(cured.name(&Locale::parse("fr").unwrap()), "Guéri");
    }

    #[test]
    fn render_then_parse_keeps_catalogue() {
        let program = ProgramDefinition::parse(SAMPLE).expect("parse yaml");
        let output = ProgramDefinition::render(&program).expect("render");
        let reparsed = ProgramDefinition::parse(&output).expect("reparse");

        assert_eq!(reparsed.uuid, program.uuid);
        let states: Vec<_> = reparsed.all_workflows()[0]
            .all_states()
            .iter()
            .map(|s| (s.uuid, s.initial, s.terminal))
            .collect();
        let expected: Vec<_> = program.all_workflows()[0]
            .all_states()
            .iter()
            .map(|s| (s.uuid, s.initial, s.terminal))
            .collect();
        assert_eq!(states, expected);
    }

    #[test]
    fn retired_state_survives_render() {
        let input = SAMPLE.replace(
            "        terminal: true\n",
            "        terminal: true\n        retired:\n          date: \"2024-01-01T00:00:00Z\"\n          reason: merged\n",
        );
        let program = ProgramDefinition::parse(&input).expect("parse retired state");
        let wf = &program.all_workflows()[0];
        assert_eq!(wf.states(false).count(), 1);

        let output = ProgramDefinition::render(&program).expect("render");
        assert!(output.contains("reason: merged"));
        let reparsed = ProgramDefinition::parse(&output).expect("reparse");
        assert!(reparsed.all_workflows()[0].all_states()[1].is_retired());
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = SAMPLE.replace("        initial: true\n", "        initial: true\n        colour: red\n");
        let err = ProgramDefinition::parse(&input).expect_err("should reject unknown key");
        match err {
            WireError::Translation(msg) => {
                assert!(msg.contains("colour"));
                assert!(msg.contains("workflows[0].states[0]"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_wrong_types() {
        let input = SAMPLE.replace("initial: true", "initial: \"yes please\"");
        let err = ProgramDefinition::parse(&input).expect_err("should reject wrong type");
        match err {
            WireError::Translation(msg) => assert!(msg.contains("initial")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_state_uuid() {
        let input = SAMPLE.replace(
            "aaaaaaaa-2222-4222-8222-222222222222",
            "aaaaaaaa-1111-4111-8111-111111111111",
        );
        let err = ProgramDefinition::parse(&input).expect_err("duplicate uuid");
        match err {
            WireError::InvalidInput(msg) => assert!(msg.contains("duplicate")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_uuid() {
        let input = SAMPLE.replace("5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51", "not-a-uuid");
        let err = ProgramDefinition::parse(&input).expect_err("invalid uuid");
        match err {
            WireError::InvalidUuid(msg) => assert!(msg.contains("uuid")),
            other => panic!("expected InvalidUuid error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_concept_without_names() {
        let input = r#"uuid: "5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51"
name: Empty
concept:
  uuid: "0b7e3a52-1c4d-4e8f-9a6b-7c2d1e0f3a94"
  names: []
"#;
        let err = ProgramDefinition::parse(input).expect_err("nameless concept");
        assert!(matches!(err, WireError::InvalidInput(_)));
    }
}
