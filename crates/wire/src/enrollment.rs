//! Enrollment record wire model.
//!
//! An enrollment file refers to its programme by UUID and to workflow states by UUID. It is
//! always parsed against an already-loaded programme catalogue, and the state handles of the
//! resulting enrollment point into that catalogue.

use crate::common::{from_yaml, parse_uuid, to_yaml, VoidWire};
use crate::{WireError, WireResult};
use chrono::{DateTime, Utc};
use emr_core::{PatientId, PatientProgram, PatientState, Program, ProgramWorkflowState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Enrollment record operations.
///
/// This is a zero-sized type used for namespacing enrollment-related operations.
pub struct EnrollmentRecord;

impl EnrollmentRecord {
    /// Parse an enrollment record from YAML text, resolving its states in `program`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if:
    /// - the YAML does not match the wire schema,
    /// - the record names a different programme,
    /// - a state UUID is not part of `program`,
    /// - a workflow ends up with more than one open state.
    pub fn parse(yaml_text: &str, program: &Arc<Program>) -> WireResult<PatientProgram> {
        let wire: EnrollmentWire = from_yaml(yaml_text, "Enrollment")?;
        wire_to_domain(wire, program)
    }

    /// Render an enrollment record, voided states included, as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if serialization fails.
    pub fn render(enrollment: &PatientProgram) -> WireResult<String> {
        to_yaml(&domain_to_wire(enrollment), "enrollment")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct EnrollmentWire {
    pub uuid: String,
    pub patient_id: PatientId,
    pub program: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_enrolled: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub states: Vec<PatientStateWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voided: Option<VoidWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PatientStateWire {
    pub uuid: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voided: Option<VoidWire>,
}

fn find_state(program: &Program, uuid: emr_uuid::EntityUuid) -> Option<Arc<ProgramWorkflowState>> {
    program
        .all_workflows()
        .iter()
        .find_map(|wf| wf.state_by_uuid(uuid))
        .cloned()
}

fn wire_to_domain(wire: EnrollmentWire, program: &Arc<Program>) -> WireResult<PatientProgram> {
    let uuid = parse_uuid(&wire.uuid, "uuid")?;
    let program_uuid = parse_uuid(&wire.program, "program")?;
    if program_uuid != program.uuid {
        return Err(WireError::InvalidInput(format!(
            "enrollment {uuid} belongs to programme {program_uuid}, not {}",
            program.uuid
        )));
    }

    let mut states = Vec::with_capacity(wire.states.len());
    for (i, ps_wire) in wire.states.iter().enumerate() {
        let field = format!("states[{i}]");
        let state_uuid = parse_uuid(&ps_wire.state, &format!("{field}.state"))?;
        let state = find_state(program, state_uuid).ok_or_else(|| {
            WireError::InvalidInput(format!(
                "{field}.state: {state_uuid} is not a state of programme {}",
                program.uuid
            ))
        })?;

        let mut ps = PatientState::new(state, ps_wire.start_date);
        ps.uuid = parse_uuid(&ps_wire.uuid, &format!("{field}.uuid"))?;
        ps.end_date = ps_wire.end_date;
        if let Some(voided) = &ps_wire.voided {
            voided.apply(&mut ps.void, &format!("{field}.voided"))?;
        }
        states.push(ps);
    }

    let mut enrollment = PatientProgram::restore(
        uuid,
        wire.patient_id,
        Arc::clone(program),
        wire.date_enrolled,
        wire.date_completed,
        states,
    )?;
    enrollment.location = wire
        .location
        .as_deref()
        .map(|l| parse_uuid(l, "location"))
        .transpose()?;
    if let Some(voided) = &wire.voided {
        voided.apply(&mut enrollment.void, "voided")?;
    }

    Ok(enrollment)
}

fn domain_to_wire(enrollment: &PatientProgram) -> EnrollmentWire {
    EnrollmentWire {
        uuid: enrollment.uuid.to_string(),
        patient_id: enrollment.patient_id,
        program: enrollment.program().uuid.to_string(),
        date_enrolled: enrollment.date_enrolled,
        date_completed: enrollment.date_completed(),
        location: enrollment.location.map(|l| l.to_string()),
        states: enrollment
            .states(true)
            .map(|ps| PatientStateWire {
                uuid: ps.uuid.to_string(),
                state: ps.state.uuid.to_string(),
                start_date: ps.start_date,
                end_date: ps.end_date,
                voided: VoidWire::from_domain(&ps.void),
            })
            .collect(),
        voided: VoidWire::from_domain(&enrollment.void),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProgramDefinition;
    use chrono::TimeZone;
    use emr_core::{EmrError, Voidable};

    const PROGRAM: &str = r#"uuid: "5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51"
name: TB treatment
concept:
  uuid: "0b7e3a52-1c4d-4e8f-9a6b-7c2d1e0f3a94"
  names:
    - name: Tuberculosis
      locale: en
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
        terminal: true
"#;

    const ENROLLMENT: &str = r#"uuid: "e0e0e0e0-0000-4000-8000-000000000001"
patient_id: 42
program: "5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51"
date_enrolled: "2024-01-01T00:00:00Z"
states:
  - uuid: "f0f0f0f0-0000-4000-8000-000000000001"
    state: "aaaaaaaa-1111-4111-8111-111111111111"
    start_date: "2024-01-01T00:00:00Z"
"#;

    fn program() -> Arc<Program> {
        Arc::new(ProgramDefinition::parse(PROGRAM).expect("parse programme"))
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_enrollment_against_catalogue() {
        let program = program();
        let enrollment = EnrollmentRecord::parse(ENROLLMENT, &program).expect("parse enrollment");
        assert_eq!(enrollment.patient_id, PatientId(42));

        let wf = &program.all_workflows()[0];
        let current = enrollment
            .current_state_as_of(wf, date(2024, 2, 1))
            .expect("current state");
        assert_eq!(current.state.name(&Default::default()), "On treatment");
        assert!(Arc::ptr_eq(&current.state, &wf.all_states()[0]));
    }

    #[test]
    fn transition_then_render_keeps_history() {
        let program = program();
        let mut enrollment = EnrollmentRecord::parse(ENROLLMENT, &program).expect("parse enrollment");
        let cured = Arc::clone(&program.all_workflows()[0].all_states()[1]);
        enrollment
            .transition_to_state(&cured, Some(date(2024, 6, 1)))
            .expect("legal transition");

        let output = EnrollmentRecord::render(&enrollment).expect("render");
        let reparsed = EnrollmentRecord::parse(&output, &program).expect("reparse");
        assert_eq!(reparsed.date_completed(), Some(date(2024, 6, 1)));
        assert_eq!(reparsed.states(true).count(), 2);
        assert_eq!(reparsed.uuid, enrollment.uuid);
    }

    #[test]
    fn voided_state_survives_render() {
        let input = format!(
            "{ENROLLMENT}    voided:\n      date: \"2024-02-01T00:00:00Z\"\n      reason: wrong patient\n"
        );
        let enrollment = EnrollmentRecord::parse(&input, &program()).expect("parse voided state");
        let ps = enrollment.states(true).next().expect("one state");
        assert!(ps.is_voided());
        assert_eq!(enrollment.states(false).count(), 0);

        let output = EnrollmentRecord::render(&enrollment).expect("render");
        assert!(output.contains("wrong patient"));
    }

    #[test]
    fn rejects_other_programme() {
        let input = ENROLLMENT.replace(
            "program: \"5c1d7b1e-8a2f-4a57-9a1d-2f6b0c3e4d51\"",
            "program: \"5c1d7b1e-8a2f-4a57-9a1d-000000000000\"",
        );
        let err = EnrollmentRecord::parse(&input, &program()).expect_err("wrong programme");
        match err {
            WireError::InvalidInput(msg) => assert!(msg.contains("belongs to programme")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_state() {
        let input = ENROLLMENT.replace(
            "aaaaaaaa-1111-4111-8111-111111111111",
            "aaaaaaaa-9999-4999-8999-999999999999",
        );
        let err = EnrollmentRecord::parse(&input, &program()).expect_err("unknown state");
        match err {
            WireError::InvalidInput(msg) => assert!(msg.contains("states[0].state")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_two_open_states_in_one_workflow() {
        let input = format!(
            "{ENROLLMENT}  - uuid: \"f0f0f0f0-0000-4000-8000-000000000002\"\n    state: \"aaaaaaaa-2222-4222-8222-222222222222\"\n    start_date: \"2024-03-01T00:00:00Z\"\n"
        );
        let err = EnrollmentRecord::parse(&input, &program()).expect_err("two open states");
        match err {
            WireError::Domain(EmrError::InvalidInput(msg)) => assert!(msg.contains("open state")),
            other => panic!("expected Domain(InvalidInput) error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = format!("{ENROLLMENT}ward: 7\n");
        let err = EnrollmentRecord::parse(&input, &program()).expect_err("unknown key");
        match err {
            WireError::Translation(msg) => assert!(msg.contains("ward")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }
}
