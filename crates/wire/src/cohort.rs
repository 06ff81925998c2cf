//! Cohort definition wire model.
//!
//! Memberships with identical content (patient, start, end) in one file collapse into one.

use crate::common::{from_yaml, optional_text, parse_text, parse_uuid, to_yaml, VoidWire};
use crate::WireResult;
use chrono::{DateTime, Utc};
use emr_core::{membership_order, Cohort, CohortMembership, PatientId};
use serde::{Deserialize, Serialize};

/// Cohort definition operations.
///
/// This is a zero-sized type used for namespacing cohort-related operations.
pub struct CohortDefinition;

impl CohortDefinition {
    /// Parse a cohort from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WireError`] if the YAML does not match the wire schema, a UUID is
    /// malformed, or the name is blank.
    pub fn parse(yaml_text: &str) -> WireResult<Cohort> {
        let wire: CohortWire = from_yaml(yaml_text, "Cohort")?;
        wire_to_domain(wire)
    }

    /// Render a cohort as YAML text, memberships in display order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WireError`] if serialization fails.
    pub fn render(cohort: &Cohort) -> WireResult<String> {
        to_yaml(&domain_to_wire(cohort), "cohort")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct CohortWire {
    pub uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<MembershipWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voided: Option<VoidWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct MembershipWire {
    /// Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub patient_id: PatientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voided: Option<VoidWire>,
}

fn wire_to_domain(wire: CohortWire) -> WireResult<Cohort> {
    let mut cohort = Cohort::new(parse_text(&wire.name, "name")?);
    cohort.uuid = parse_uuid(&wire.uuid, "uuid")?;
    cohort.description = optional_text(wire.description.as_deref(), "description")?;
    if let Some(voided) = &wire.voided {
        voided.apply(&mut cohort.void, "voided")?;
    }

    for (i, m_wire) in wire.members.iter().enumerate() {
        let field = format!("members[{i}]");
        let mut membership =
            CohortMembership::new(m_wire.patient_id, m_wire.start_date).with_end_date(m_wire.end_date);
        if let Some(uuid) = &m_wire.uuid {
            membership.uuid = parse_uuid(uuid, &format!("{field}.uuid"))?;
        }
        if let Some(voided) = &m_wire.voided {
            voided.apply(&mut membership.void, &format!("{field}.voided"))?;
        }
        cohort.add_membership(membership);
    }

    Ok(cohort)
}

fn domain_to_wire(cohort: &Cohort) -> CohortWire {
    let mut memberships: Vec<_> = cohort.memberships().iter().collect();
    memberships.sort_by(|a, b| membership_order(a, b));

    CohortWire {
        uuid: cohort.uuid.to_string(),
        name: cohort.name().to_string(),
        description: cohort.description.as_ref().map(|d| d.to_string()),
        members: memberships
            .into_iter()
            .map(|m| MembershipWire {
                uuid: Some(m.uuid.to_string()),
                patient_id: m.patient_id,
                start_date: m.start_date,
                end_date: m.end_date,
                voided: VoidWire::from_domain(&m.void),
            })
            .collect(),
        voided: VoidWire::from_domain(&cohort.void),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireError;

    const SAMPLE: &str = r#"uuid: "c0c0c0c0-0000-4000-8000-000000000001"
name: Diabetics
description: Patients on the diabetes register
members:
  - patient_id: 1
    start_date: "2024-01-01T00:00:00Z"
  - patient_id: 2
    start_date: "2024-03-01T00:00:00Z"
    end_date: "2024-06-01T00:00:00Z"
  - patient_id: 1
    start_date: "2024-01-01T00:00:00Z"
"#;

    #[test]
    fn parses_and_collapses_duplicate_memberships() {
        let cohort = CohortDefinition::parse(SAMPLE).expect("parse cohort");
        assert_eq!(cohort.name(), "Diabetics");
        assert_eq!(cohort.memberships().len(), 2);
        assert!(cohort.contains(PatientId(1)));
        assert!(cohort.contains(PatientId(2)));
    }

    #[test]
    fn render_keeps_membership_identity() {
        let cohort = CohortDefinition::parse(SAMPLE).expect("parse cohort");
        let output = CohortDefinition::render(&cohort).expect("render");
        let reparsed = CohortDefinition::parse(&output).expect("reparse");

        assert_eq!(reparsed.uuid, cohort.uuid);
        let mut before: Vec<_> = cohort.memberships().iter().map(|m| m.uuid).collect();
        let mut after: Vec<_> = reparsed.memberships().iter().map(|m| m.uuid).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn renders_algebra_result_names() {
        let a = CohortDefinition::parse(SAMPLE).expect("parse cohort");
        let union = Cohort::union(Some(&a), None);
        let output = CohortDefinition::render(&union).expect("render");
        assert!(output.contains("(Diabetics + NULL)"));
        CohortDefinition::parse(&output).expect("synthesised name parses");
    }

    #[test]
    fn rejects_blank_name() {
        let input = SAMPLE.replace("name: Diabetics", "name: \"  \"");
        let err = CohortDefinition::parse(&input).expect_err("blank name");
        assert!(matches!(err, WireError::InvalidInput(_)));
    }

    #[test]
    fn strict_validation_rejects_wrong_types() {
        let input = SAMPLE.replace("patient_id: 2", "patient_id: two");
        let err = CohortDefinition::parse(&input).expect_err("wrong type");
        match err {
            WireError::Translation(msg) => assert!(msg.contains("members[1]")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }
}
