//! Patient enrollments and their workflow state history.
//!
//! A [`PatientProgram`] is one patient's enrollment in one [`Program`]. For every workflow of
//! the programme it keeps a time-ordered history of [`PatientState`]s. At most one of them per
//! workflow is open (no end date) at a time.
//!
//! State intervals are half-open: a state is active at `t` when `start <= t < end`, with a
//! missing start meaning "since forever" and a missing end meaning "until further notice".

use crate::audit::{AuditInfo, VoidInfo, Voidable};
use crate::concept::Concept;
use crate::ordering::{compare_none_earliest, compare_none_latest};
use crate::program::Program;
use crate::workflow::{ProgramWorkflow, ProgramWorkflowState};
use crate::{EmrError, EmrResult};
use chrono::{DateTime, Utc};
use emr_types::{NonEmptyText, PatientId};
use emr_uuid::EntityUuid;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// One interval during which an enrollment occupied one workflow state.
#[derive(Clone, Debug)]
pub struct PatientState {
    pub uuid: EntityUuid,
    /// Shared handle into the workflow's state catalogue.
    pub state: Arc<ProgramWorkflowState>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Encounter during which the change was recorded.
    pub encounter: Option<EntityUuid>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl PartialEq for PatientState {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for PatientState {}

impl PatientState {
    pub fn new(state: Arc<ProgramWorkflowState>, start_date: Option<DateTime<Utc>>) -> Self {
        Self {
            uuid: EntityUuid::new(),
            state,
            start_date,
            end_date: None,
            encounter: None,
            audit: AuditInfo::default(),
            void: VoidInfo::default(),
        }
    }

    /// UUID of the workflow this state belongs to.
    pub fn workflow(&self) -> Option<EntityUuid> {
        self.state.workflow()
    }

    /// Not voided and `start <= on < end`.
    pub fn is_active(&self, on: DateTime<Utc>) -> bool {
        !self.is_voided()
            && compare_none_earliest(self.start_date.as_ref(), Some(&on)) != Ordering::Greater
            && compare_none_latest(self.end_date.as_ref(), Some(&on)) == Ordering::Greater
    }
}

impl Voidable for PatientState {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}

/// Orders patient states by start date (missing first), then end date (missing last), then
/// UUID.
///
/// Not consistent with `PatientState` equality, which only looks at the UUID: two distinct
/// states with identical dates still order by UUID, and voiding does not affect the order.
pub fn chronological_order(a: &PatientState, b: &PatientState) -> Ordering {
    compare_none_earliest(a.start_date.as_ref(), b.start_date.as_ref())
        .then_with(|| compare_none_latest(a.end_date.as_ref(), b.end_date.as_ref()))
        .then_with(|| a.uuid.cmp(&b.uuid))
}

/// One patient's enrollment in a programme.
#[derive(Clone, Debug)]
pub struct PatientProgram {
    pub uuid: EntityUuid,
    pub patient_id: PatientId,
    program: Arc<Program>,
    pub date_enrolled: Option<DateTime<Utc>>,
    date_completed: Option<DateTime<Utc>>,
    pub location: Option<EntityUuid>,
    pub outcome: Option<Concept>,
    states: Vec<PatientState>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl PartialEq for PatientProgram {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for PatientProgram {}

impl PatientProgram {
    pub fn new(
        patient_id: PatientId,
        program: Arc<Program>,
        date_enrolled: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            uuid: EntityUuid::new(),
            patient_id,
            program,
            date_enrolled,
            date_completed: None,
            location: None,
            outcome: None,
            states: Vec::new(),
            audit: AuditInfo::default(),
            void: VoidInfo::default(),
        }
    }

    /// Rebuilds an enrollment from previously stored values.
    ///
    /// # Errors
    ///
    /// - [`EmrError::UnknownWorkflow`] if a state does not belong to a workflow of `program`.
    /// - [`EmrError::InvalidInput`] if a workflow has more than one open, non-voided state.
    pub fn restore(
        uuid: EntityUuid,
        patient_id: PatientId,
        program: Arc<Program>,
        date_enrolled: Option<DateTime<Utc>>,
        date_completed: Option<DateTime<Utc>>,
        states: Vec<PatientState>,
    ) -> EmrResult<Self> {
        let mut open_per_workflow: HashMap<EntityUuid, usize> = HashMap::new();

        for ps in &states {
            let workflow = program.workflow_for_state(&ps.state).ok_or_else(|| {
                EmrError::UnknownWorkflow {
                    state: ps.state.uuid,
                    program: program.uuid,
                }
            })?;

            if ps.end_date.is_none() && !ps.is_voided() {
                let open = open_per_workflow.entry(workflow.uuid).or_default();
                *open += 1;
                if *open > 1 {
                    return Err(EmrError::InvalidInput(format!(
                        "workflow {} has more than one open state",
                        workflow.uuid
                    )));
                }
            }
        }

        Ok(Self {
            uuid,
            date_completed,
            states,
            ..Self::new(patient_id, program, date_enrolled)
        })
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Set when a terminal state is entered.
    pub fn date_completed(&self) -> Option<DateTime<Utc>> {
        self.date_completed
    }

    /// Not voided, enrolled on or before `on`, and not completed on or before `on`.
    pub fn is_active(&self, on: DateTime<Utc>) -> bool {
        !self.is_voided()
            && compare_none_earliest(self.date_enrolled.as_ref(), Some(&on)) != Ordering::Greater
            && compare_none_latest(self.date_completed.as_ref(), Some(&on)) == Ordering::Greater
    }

    pub fn states(&self, include_voided: bool) -> impl Iterator<Item = &PatientState> {
        self.states
            .iter()
            .filter(move |ps| include_voided || !ps.is_voided())
    }

    /// States of one workflow in [`chronological_order`].
    pub fn states_in_workflow(
        &self,
        workflow: &ProgramWorkflow,
        include_voided: bool,
    ) -> Vec<&PatientState> {
        self.sorted_indices(workflow.uuid, include_voided)
            .into_iter()
            .map(|i| &self.states[i])
            .collect()
    }

    /// The state of `workflow` active right now, if any.
    pub fn current_state(&self, workflow: &ProgramWorkflow) -> Option<&PatientState> {
        self.current_state_as_of(workflow, Utc::now())
    }

    /// The latest-ordered state of `workflow` that is active at `at`.
    pub fn current_state_as_of(
        &self,
        workflow: &ProgramWorkflow,
        at: DateTime<Utc>,
    ) -> Option<&PatientState> {
        if self.program.workflow(workflow.uuid).is_none() {
            tracing::warn!(
                enrollment = %self.uuid,
                workflow = %workflow.uuid,
                "workflow is not part of the enrolled programme"
            );
            return None;
        }
        self.current_index(workflow.uuid, at).map(|i| &self.states[i])
    }

    /// Current state of every workflow of the programme that has one.
    pub fn current_states(&self) -> Vec<&PatientState> {
        let now = Utc::now();
        self.program
            .all_workflows()
            .iter()
            .filter_map(|w| self.current_state_as_of(w, now))
            .collect()
    }

    /// Chronologically last non-voided state of `workflow`, active or not.
    pub fn most_recent_state_in_workflow(
        &self,
        workflow: &ProgramWorkflow,
    ) -> Option<&PatientState> {
        self.sorted_indices(workflow.uuid, false)
            .last()
            .map(|&i| &self.states[i])
    }

    /// Moves the enrollment into `new_state` on `on_date`.
    ///
    /// The current state of the workflow (if any) is closed at `on_date` and a new state
    /// starting at `on_date` is appended. Entering a terminal state completes the enrollment
    /// and closes the new state at the same instant.
    ///
    /// # Errors
    ///
    /// - [`EmrError::UnknownWorkflow`] if `new_state` is not part of this programme.
    /// - [`EmrError::MissingTransitionDate`] if there is a current state and no `on_date`.
    /// - [`EmrError::CurrentStateAlreadyEnded`] if the current state already has an end date.
    /// - [`EmrError::TransitionBeforeCurrentStart`] if `on_date` precedes the current start.
    /// - [`EmrError::IllegalTransition`] if the workflow rejects the move.
    pub fn transition_to_state(
        &mut self,
        new_state: &ProgramWorkflowState,
        on_date: Option<DateTime<Utc>>,
    ) -> EmrResult<()> {
        let program = Arc::clone(&self.program);
        let workflow =
            program
                .workflow_for_state(new_state)
                .ok_or_else(|| EmrError::UnknownWorkflow {
                    state: new_state.uuid,
                    program: program.uuid,
                })?;

        // A future-dated open state is not active yet but still occupies the workflow.
        let current = self
            .current_index(workflow.uuid, Utc::now())
            .or_else(|| self.open_index(workflow.uuid));

        if let Some(i) = current {
            let last = &self.states[i];
            let on = on_date.ok_or(EmrError::MissingTransitionDate {
                current: last.state.uuid,
            })?;
            if let Some(end_date) = last.end_date {
                return Err(EmrError::CurrentStateAlreadyEnded {
                    current: last.state.uuid,
                    end_date,
                });
            }
            if let Some(start_date) = last.start_date {
                if start_date > on {
                    return Err(EmrError::TransitionBeforeCurrentStart {
                        current: last.state.uuid,
                        start_date,
                        on_date: on,
                    });
                }
            }
        }

        let from = current.map(|i| self.states[i].state.as_ref());
        if !workflow.is_legal_transition(from, new_state) {
            return Err(EmrError::IllegalTransition {
                from: from.map(|s| s.uuid),
                to: new_state.uuid,
            });
        }

        if let Some(i) = current {
            self.states[i].end_date = on_date;
        }

        // workflow_for_state guarantees the catalogue holds this state
        let catalogue_state = workflow
            .state_by_uuid(new_state.uuid)
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::new(new_state.clone()));

        let mut entered = PatientState::new(catalogue_state, on_date);
        if new_state.terminal {
            self.date_completed = on_date;
            entered.end_date = on_date;
        }

        tracing::debug!(
            enrollment = %self.uuid,
            workflow = %workflow.uuid,
            to = %new_state.uuid,
            terminal = new_state.terminal,
            "patient state transition"
        );
        self.states.push(entered);
        Ok(())
    }

    /// Voids the chronologically last state of `workflow` and reopens the one before it.
    ///
    /// The reopened state gets no end date, or the completion date if the enrollment is
    /// completed. A missing `void_date` means now.
    pub fn void_last_state(
        &mut self,
        workflow: &ProgramWorkflow,
        void_by: Option<EntityUuid>,
        void_date: Option<DateTime<Utc>>,
        void_reason: NonEmptyText,
    ) {
        let void_date = void_date.unwrap_or_else(Utc::now);
        let indices = self.sorted_indices(workflow.uuid, false);

        let Some((&last, rest)) = indices.split_last() else {
            tracing::debug!(enrollment = %self.uuid, workflow = %workflow.uuid, "no state to void");
            return;
        };

        self.states[last].void(void_by, void_date, void_reason);

        if let Some(&penultimate) = rest.last() {
            let date_completed = self.date_completed;
            let reopened = &mut self.states[penultimate];
            if reopened.end_date.is_some() {
                reopened.end_date = date_completed;
                reopened.audit.record_change(void_by, void_date);
            }
        }

        tracing::debug!(
            enrollment = %self.uuid,
            workflow = %workflow.uuid,
            voided = %self.states[last].uuid,
            "voided last patient state"
        );
    }

    /// Indices into `self.states` for `workflow`, in chronological order.
    fn sorted_indices(&self, workflow: EntityUuid, include_voided: bool) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, ps)| ps.workflow() == Some(workflow))
            .filter(|(_, ps)| include_voided || !ps.is_voided())
            .map(|(i, _)| i)
            .collect();
        indices.sort_by(|&a, &b| chronological_order(&self.states[a], &self.states[b]));
        indices
    }

    /// The chronologically last non-voided state of `workflow` with no end date.
    fn open_index(&self, workflow: EntityUuid) -> Option<usize> {
        self.sorted_indices(workflow, false)
            .into_iter()
            .rev()
            .find(|&i| self.states[i].end_date.is_none())
    }

    fn current_index(&self, workflow: EntityUuid, at: DateTime<Utc>) -> Option<usize> {
        self.sorted_indices(workflow, true)
            .into_iter()
            .rev()
            .find(|&i| self.states[i].is_active(at))
    }
}

impl Voidable for PatientProgram {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}
