//! Clinical programmes.

use crate::audit::{AuditInfo, RetireInfo, Retireable};
use crate::concept::Concept;
use crate::workflow::{ProgramWorkflow, ProgramWorkflowState};
use emr_types::{Locale, NonEmptyText};
use emr_uuid::EntityUuid;

/// A named clinical programme (for example "TB treatment") that patients can be enrolled in.
///
/// The programme exclusively owns its workflows. Build the programme completely before
/// sharing it with enrollments; enrollments hold it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Program {
    pub uuid: EntityUuid,
    pub name: NonEmptyText,
    pub description: Option<NonEmptyText>,
    pub concept: Concept,
    /// Concept whose answers are the possible outcomes of the programme.
    pub outcomes_concept: Option<Concept>,
    workflows: Vec<ProgramWorkflow>,
    pub audit: AuditInfo,
    pub retire: RetireInfo,
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Program {}

impl Program {
    pub fn new(name: NonEmptyText, concept: Concept) -> Self {
        Self::with_uuid(EntityUuid::new(), name, concept)
    }

    pub fn with_uuid(uuid: EntityUuid, name: NonEmptyText, concept: Concept) -> Self {
        Self {
            uuid,
            name,
            description: None,
            concept,
            outcomes_concept: None,
            workflows: Vec::new(),
            audit: AuditInfo::default(),
            retire: RetireInfo::default(),
        }
    }

    /// Adds a workflow, making this programme its owner.
    ///
    /// A workflow with the same UUID as an existing one replaces it.
    pub fn add_workflow(&mut self, mut workflow: ProgramWorkflow) -> &mut ProgramWorkflow {
        workflow.set_program(self.uuid);
        tracing::debug!(program = %self.uuid, workflow = %workflow.uuid, "adding workflow");

        let index = match self.workflows.iter().position(|w| w.uuid == workflow.uuid) {
            Some(index) => {
                self.workflows[index] = workflow;
                index
            }
            None => {
                self.workflows.push(workflow);
                self.workflows.len() - 1
            }
        };
        &mut self.workflows[index]
    }

    pub fn remove_workflow(&mut self, uuid: EntityUuid) -> Option<ProgramWorkflow> {
        let index = self.workflows.iter().position(|w| w.uuid == uuid)?;
        Some(self.workflows.remove(index))
    }

    /// Non-retired workflows.
    pub fn workflows(&self) -> impl Iterator<Item = &ProgramWorkflow> {
        self.workflows.iter().filter(|w| !w.is_retired())
    }

    /// Every workflow, including retired ones.
    pub fn all_workflows(&self) -> &[ProgramWorkflow] {
        &self.workflows
    }

    pub fn workflow(&self, uuid: EntityUuid) -> Option<&ProgramWorkflow> {
        self.workflows.iter().find(|w| w.uuid == uuid)
    }

    pub fn workflow_mut(&mut self, uuid: EntityUuid) -> Option<&mut ProgramWorkflow> {
        self.workflows.iter_mut().find(|w| w.uuid == uuid)
    }

    /// Finds a non-retired workflow by its concept name in `locale`, ignoring case.
    pub fn workflow_by_name(&self, name: &str, locale: &Locale) -> Option<&ProgramWorkflow> {
        let wanted = name.trim().to_lowercase();
        self.workflows()
            .find(|w| w.name(locale).to_lowercase() == wanted)
    }

    /// The workflow of this programme that owns `state`, if any.
    pub fn workflow_for_state(&self, state: &ProgramWorkflowState) -> Option<&ProgramWorkflow> {
        let owner = state.workflow()?;
        self.workflow(owner)
            .filter(|w| w.state_by_uuid(state.uuid).is_some())
    }
}

impl Retireable for Program {
    fn retire_info(&self) -> &RetireInfo {
        &self.retire
    }

    fn retire_info_mut(&mut self) -> &mut RetireInfo {
        &mut self.retire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn en() -> Locale {
        Locale::parse("en").unwrap()
    }

    fn concept(name: &str) -> Concept {
        Concept::named(NonEmptyText::new(name).unwrap(), en())
    }

    #[test]
    fn test_add_workflow_sets_owner() {
        let mut program = Program::new(NonEmptyText::new("HIV care").unwrap(), concept("HIV"));
        let wf_uuid = program
            .add_workflow(ProgramWorkflow::new(concept("Treatment status")))
            .uuid;

        let wf = program.workflow(wf_uuid).expect("workflow present");
        assert_eq!(wf.program(), Some(program.uuid));
    }

    #[test]
    fn test_workflow_moves_to_new_program_when_added() {
        let mut first = Program::new(NonEmptyText::new("A").unwrap(), concept("A"));
        let mut second = Program::new(NonEmptyText::new("B").unwrap(), concept("B"));

        let wf = first.add_workflow(ProgramWorkflow::new(concept("Stage"))).clone();
        let second_uuid = second.uuid;
        let wf = second.add_workflow(wf);
        assert_eq!(wf.program(), Some(second_uuid));
    }

    #[test]
    fn test_workflow_by_name_skips_retired() {
        let mut program = Program::new(NonEmptyText::new("TB").unwrap(), concept("TB"));
        let wf_uuid = program
            .add_workflow(ProgramWorkflow::new(concept("Treatment status")))
            .uuid;
        assert!(program.workflow_by_name("treatment STATUS", &en()).is_some());

        program
            .workflow_mut(wf_uuid)
            .expect("present")
            .retire(None, Utc::now(), NonEmptyText::new("replaced").unwrap());

        assert!(program.workflow_by_name("Treatment status", &en()).is_none());
        assert_eq!(program.workflows().count(), 0);
        assert_eq!(program.all_workflows().len(), 1);
    }

    #[test]
    fn test_workflow_for_state() {
        let mut program = Program::new(NonEmptyText::new("TB").unwrap(), concept("TB"));
        let wf = program.add_workflow(ProgramWorkflow::new(concept("Status")));
        let state = wf.add_state(ProgramWorkflowState::new(concept("Started"), true, false));
        let wf_uuid = wf.uuid;

        assert_eq!(program.workflow_for_state(&state).map(|w| w.uuid), Some(wf_uuid));

        let orphan = ProgramWorkflowState::new(concept("Orphan"), true, false);
        assert!(program.workflow_for_state(&orphan).is_none());
    }

    #[test]
    fn test_remove_workflow() {
        let mut program = Program::new(NonEmptyText::new("TB").unwrap(), concept("TB"));
        let wf_uuid = program.add_workflow(ProgramWorkflow::new(concept("Status"))).uuid;
        assert!(program.remove_workflow(wf_uuid).is_some());
        assert!(program.workflow(wf_uuid).is_none());
    }
}
