//! Programme workflows and their states.
//!
//! A workflow is one dimension of progress within a programme (for example "treatment
//! status"). It owns its states and decides which transitions between them are legal.
//!
//! The legality rule is a gate, not a graph:
//! - entering a workflow for the first time requires an `initial` state;
//! - once in a state, any *other* state may follow.
//!
//! Callers needing a richer transition graph layer it on top of [`ProgramWorkflow::is_legal_transition`].

use crate::audit::{AuditInfo, RetireInfo, Retireable};
use crate::concept::Concept;
use crate::ordering::natural_order;
use crate::patient_program::PatientProgram;
use crate::{EmrError, EmrResult};
use chrono::{DateTime, Utc};
use emr_types::{Locale, NonEmptyText};
use emr_uuid::EntityUuid;
use std::sync::Arc;

/// One state a workflow can hold.
///
/// Two states are equal when their UUIDs are equal.
#[derive(Clone, Debug)]
pub struct ProgramWorkflowState {
    pub uuid: EntityUuid,
    workflow: Option<EntityUuid>,
    pub concept: Concept,
    /// A patient may enter the workflow through this state.
    pub initial: bool,
    /// Entering this state completes the enrollment.
    pub terminal: bool,
    pub audit: AuditInfo,
    pub retire: RetireInfo,
}

impl PartialEq for ProgramWorkflowState {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for ProgramWorkflowState {}

impl ProgramWorkflowState {
    pub fn new(concept: Concept, initial: bool, terminal: bool) -> Self {
        Self::with_uuid(EntityUuid::new(), concept, initial, terminal)
    }

    pub fn with_uuid(uuid: EntityUuid, concept: Concept, initial: bool, terminal: bool) -> Self {
        Self {
            uuid,
            workflow: None,
            concept,
            initial,
            terminal,
            audit: AuditInfo::default(),
            retire: RetireInfo::default(),
        }
    }

    /// UUID of the owning workflow, once the state has been added to one.
    pub fn workflow(&self) -> Option<EntityUuid> {
        self.workflow
    }

    pub fn name(&self, locale: &Locale) -> &str {
        self.concept.display_name(locale)
    }
}

impl Retireable for ProgramWorkflowState {
    fn retire_info(&self) -> &RetireInfo {
        &self.retire
    }

    fn retire_info_mut(&mut self) -> &mut RetireInfo {
        &mut self.retire
    }
}

/// One dimension of progress within a programme.
///
/// States are held behind `Arc` so that patient states can refer to them without owning
/// them.
#[derive(Clone, Debug)]
pub struct ProgramWorkflow {
    pub uuid: EntityUuid,
    program: Option<EntityUuid>,
    pub concept: Concept,
    states: Vec<Arc<ProgramWorkflowState>>,
    pub audit: AuditInfo,
    pub retire: RetireInfo,
}

impl PartialEq for ProgramWorkflow {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for ProgramWorkflow {}

impl ProgramWorkflow {
    pub fn new(concept: Concept) -> Self {
        Self::with_uuid(EntityUuid::new(), concept)
    }

    pub fn with_uuid(uuid: EntityUuid, concept: Concept) -> Self {
        Self {
            uuid,
            program: None,
            concept,
            states: Vec::new(),
            audit: AuditInfo::default(),
            retire: RetireInfo::default(),
        }
    }

    /// UUID of the owning programme, once the workflow has been added to one.
    pub fn program(&self) -> Option<EntityUuid> {
        self.program
    }

    pub(crate) fn set_program(&mut self, program: EntityUuid) {
        self.program = Some(program);
    }

    pub fn name(&self, locale: &Locale) -> &str {
        self.concept.display_name(locale)
    }

    /// Adds a state to this workflow and returns the shared handle to it.
    ///
    /// A state with the same UUID as an existing one replaces it.
    pub fn add_state(&mut self, mut state: ProgramWorkflowState) -> Arc<ProgramWorkflowState> {
        state.workflow = Some(self.uuid);
        let state = Arc::new(state);

        match self.states.iter_mut().find(|s| s.uuid == state.uuid) {
            Some(existing) => *existing = Arc::clone(&state),
            None => self.states.push(Arc::clone(&state)),
        }
        state
    }

    pub fn remove_state(&mut self, uuid: EntityUuid) -> Option<Arc<ProgramWorkflowState>> {
        let index = self.states.iter().position(|s| s.uuid == uuid)?;
        Some(self.states.remove(index))
    }

    /// Retires a state in place. Patient states already pointing at the previous handle keep
    /// seeing the unretired copy.
    pub fn retire_state(
        &mut self,
        uuid: EntityUuid,
        by: Option<EntityUuid>,
        at: DateTime<Utc>,
        reason: NonEmptyText,
    ) -> EmrResult<()> {
        let state = self
            .states
            .iter_mut()
            .find(|s| s.uuid == uuid)
            .ok_or_else(|| {
                EmrError::InvalidInput(format!("state {uuid} is not part of workflow {}", self.uuid))
            })?;
        Arc::make_mut(state).retire(by, at, reason);
        Ok(())
    }

    /// Every state, including retired ones.
    pub fn all_states(&self) -> &[Arc<ProgramWorkflowState>] {
        &self.states
    }

    pub fn states(&self, include_retired: bool) -> impl Iterator<Item = &Arc<ProgramWorkflowState>> {
        self.states
            .iter()
            .filter(move |s| include_retired || !s.is_retired())
    }

    pub fn state_by_uuid(&self, uuid: EntityUuid) -> Option<&Arc<ProgramWorkflowState>> {
        self.states.iter().find(|s| s.uuid == uuid)
    }

    pub fn state_by_concept(&self, concept: &Concept) -> Option<&Arc<ProgramWorkflowState>> {
        self.states.iter().find(|s| &s.concept == concept)
    }

    /// Finds a state by its concept name in `locale`, ignoring case.
    pub fn state_by_name(&self, name: &str, locale: &Locale) -> Option<&Arc<ProgramWorkflowState>> {
        let wanted = name.trim().to_lowercase();
        self.states
            .iter()
            .find(|s| s.name(locale).to_lowercase() == wanted)
    }

    /// Non-retired states in natural order of their name in `locale`.
    pub fn sorted_states(&self, locale: &Locale) -> Vec<Arc<ProgramWorkflowState>> {
        let mut sorted: Vec<_> = self.states(false).cloned().collect();
        sorted.sort_by(|a, b| {
            natural_order(a.name(locale), b.name(locale)).then_with(|| a.uuid.cmp(&b.uuid))
        });
        sorted
    }

    /// Whether a patient may move from `from` to `to` in this workflow.
    ///
    /// With no current state only an initial state may be entered. Otherwise any state other
    /// than the current one is allowed.
    pub fn is_legal_transition(
        &self,
        from: Option<&ProgramWorkflowState>,
        to: &ProgramWorkflowState,
    ) -> bool {
        match from {
            None => to.initial,
            Some(from) => from != to,
        }
    }

    /// Every non-retired state the enrollment could legally move to next, sorted by name.
    pub fn possible_next_states(
        &self,
        enrollment: &PatientProgram,
        locale: &Locale,
    ) -> Vec<Arc<ProgramWorkflowState>> {
        let current = enrollment.current_state(self).map(|ps| Arc::clone(&ps.state));

        self.sorted_states(locale)
            .into_iter()
            .filter(|candidate| self.is_legal_transition(current.as_deref(), candidate))
            .collect()
    }
}

impl Retireable for ProgramWorkflow {
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
    use crate::concept::Concept;

    fn en() -> Locale {
        Locale::parse("en").unwrap()
    }

    fn concept(name: &str) -> Concept {
        Concept::named(NonEmptyText::new(name).unwrap(), en())
    }

    fn workflow() -> (
        ProgramWorkflow,
        Arc<ProgramWorkflowState>,
        Arc<ProgramWorkflowState>,
        Arc<ProgramWorkflowState>,
    ) {
        let mut wf = ProgramWorkflow::new(concept("Treatment status"));
        let s1 = wf.add_state(ProgramWorkflowState::new(concept("On treatment"), true, false));
        let s2 = wf.add_state(ProgramWorkflowState::new(concept("Defaulted"), false, false));
        let s3 = wf.add_state(ProgramWorkflowState::new(concept("Cured"), false, true));
        (wf, s1, s2, s3)
    }

    #[test]
    fn test_first_state_must_be_initial() {
        let (wf, s1, s2, s3) = workflow();
        assert!(wf.is_legal_transition(None, &s1));
        assert!(!wf.is_legal_transition(None, &s2));
        assert!(!wf.is_legal_transition(None, &s3));
    }

    #[test]
    fn test_self_transition_is_never_legal() {
        let (wf, s1, s2, s3) = workflow();
        for s in [&s1, &s2, &s3] {
            assert!(!wf.is_legal_transition(Some(&**s), s));
        }
    }

    #[test]
    fn test_any_other_state_may_follow() {
        let (wf, s1, s2, s3) = workflow();
        assert!(wf.is_legal_transition(Some(&*s1), &s3));
        assert!(wf.is_legal_transition(Some(&*s3), &s1));
        assert!(wf.is_legal_transition(Some(&*s2), &s1));
    }

    #[test]
    fn test_add_state_sets_back_reference() {
        let (wf, s1, _, _) = workflow();
        assert_eq!(s1.workflow(), Some(wf.uuid));
        assert_eq!(wf.all_states().len(), 3);
    }

    #[test]
    fn test_add_state_with_same_uuid_replaces() {
        let (mut wf, s1, _, _) = workflow();
        let replacement = ProgramWorkflowState::with_uuid(s1.uuid, concept("Started"), true, false);
        wf.add_state(replacement);

        assert_eq!(wf.all_states().len(), 3);
        assert_eq!(wf.state_by_uuid(s1.uuid).map(|s| s.name(&en())), Some("Started"));
    }

    #[test]
    fn test_lookup_by_name_and_concept() {
        let (wf, _, s2, _) = workflow();
        assert_eq!(wf.state_by_name("defaulted", &en()), Some(&s2));
        assert_eq!(wf.state_by_concept(&s2.concept), Some(&s2));
        assert!(wf.state_by_name("missing", &en()).is_none());
    }

    #[test]
    fn test_sorted_states_use_natural_order_and_skip_retired() {
        let mut wf = ProgramWorkflow::new(concept("Stage"));
        let stage10 = wf.add_state(ProgramWorkflowState::new(concept("Stage 10"), false, false));
        let stage2 = wf.add_state(ProgramWorkflowState::new(concept("Stage 2"), true, false));
        let stage1 = wf.add_state(ProgramWorkflowState::new(concept("Stage 1"), true, false));

        let names: Vec<_> = wf
            .sorted_states(&en())
            .iter()
            .map(|s| s.name(&en()).to_string())
            .collect();
        assert_eq!(names, vec!["Stage 1", "Stage 2", "Stage 10"]);

        let at = Utc::now();
        wf.retire_state(stage2.uuid, None, at, NonEmptyText::new("merged").unwrap())
            .expect("state exists");
        let sorted = wf.sorted_states(&en());
        assert_eq!(sorted, vec![stage1, stage10]);
        assert_eq!(wf.states(true).count(), 3);
    }

    #[test]
    fn test_retire_unknown_state_fails() {
        let (mut wf, _, _, _) = workflow();
        let err = wf
            .retire_state(EntityUuid::new(), None, Utc::now(), NonEmptyText::new("x").unwrap())
            .expect_err("unknown state");
        assert!(matches!(err, EmrError::InvalidInput(_)));
    }

    #[test]
    fn test_remove_state() {
        let (mut wf, _, s2, _) = workflow();
        assert_eq!(wf.remove_state(s2.uuid), Some(s2.clone()));
        assert!(wf.state_by_uuid(s2.uuid).is_none());
        assert!(wf.remove_state(s2.uuid).is_none());
    }
}
