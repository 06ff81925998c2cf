//! Cohorts: named collections of patient memberships with set algebra.
//!
//! Memberships are compared by content (patient, start date, end date). The same patient
//! with different dates is a *different* membership, so intersecting two cohorts that hold
//! the same patient over different intervals yields nothing. The algebra is set algebra over
//! membership records, not interval arithmetic.

use crate::audit::{AuditInfo, VoidInfo, Voidable};
use crate::constants::NULL_COHORT_NAME;
use crate::ordering::compare_none_earliest;
use chrono::{DateTime, Utc};
use emr_types::{NonEmptyText, PatientId};
use emr_uuid::EntityUuid;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// One patient's membership interval in a cohort.
///
/// Equality and hashing use the content only: patient, start date and end date. The UUID,
/// audit fields and void status are ignored.
#[derive(Clone, Debug)]
pub struct CohortMembership {
    pub uuid: EntityUuid,
    pub patient_id: PatientId,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl CohortMembership {
    pub fn new(patient_id: PatientId, start_date: Option<DateTime<Utc>>) -> Self {
        Self {
            uuid: EntityUuid::new(),
            patient_id,
            start_date,
            end_date: None,
            audit: AuditInfo::default(),
            void: VoidInfo::default(),
        }
    }

    pub fn with_end_date(mut self, end_date: Option<DateTime<Utc>>) -> Self {
        self.end_date = end_date;
        self
    }

    /// Not voided and `start <= as_of <= end`, both bounds inclusive and optional.
    pub fn is_active(&self, as_of: DateTime<Utc>) -> bool {
        !self.is_voided()
            && self.start_date.map_or(true, |start| start <= as_of)
            && self.end_date.map_or(true, |end| as_of <= end)
    }

    pub fn same_content(&self, other: &CohortMembership) -> bool {
        self.patient_id == other.patient_id
            && self.start_date == other.start_date
            && self.end_date == other.end_date
    }
}

impl PartialEq for CohortMembership {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

impl Eq for CohortMembership {}

impl Hash for CohortMembership {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.patient_id.hash(state);
        self.start_date.hash(state);
        self.end_date.hash(state);
    }
}

impl Voidable for CohortMembership {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}

/// Orders memberships: non-voided first, then latest start first (missing start last), then
/// patient. Not consistent with membership equality.
pub fn membership_order(a: &CohortMembership, b: &CohortMembership) -> Ordering {
    a.is_voided()
        .cmp(&b.is_voided())
        .then_with(|| compare_none_earliest(b.start_date.as_ref(), a.start_date.as_ref()))
        .then_with(|| a.patient_id.cmp(&b.patient_id))
}

/// A named collection of patient memberships.
#[derive(Clone, Debug)]
pub struct Cohort {
    pub uuid: EntityUuid,
    name: String,
    pub description: Option<NonEmptyText>,
    memberships: Vec<CohortMembership>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl Cohort {
    pub fn new(name: NonEmptyText) -> Self {
        Self::with_raw_name(name.to_string())
    }

    fn with_raw_name(name: String) -> Self {
        Self {
            uuid: EntityUuid::new(),
            name,
            description: None,
            memberships: Vec::new(),
            audit: AuditInfo::default(),
            void: VoidInfo::default(),
        }
    }

    /// A cohort holding one open-ended membership per patient, starting at `start_date`.
    pub fn from_patient_ids(
        name: NonEmptyText,
        patient_ids: impl IntoIterator<Item = PatientId>,
        start_date: Option<DateTime<Utc>>,
    ) -> Self {
        let mut cohort = Self::new(name);
        for patient_id in patient_ids {
            cohort.add_membership(CohortMembership::new(patient_id, start_date));
        }
        cohort
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: NonEmptyText) {
        self.name = name.to_string();
    }

    /// Every membership, voided or not, in no particular order.
    pub fn memberships(&self) -> &[CohortMembership] {
        &self.memberships
    }

    /// Adds a membership. Returns `false` (and changes nothing) if a membership with the same
    /// content is already present.
    pub fn add_membership(&mut self, membership: CohortMembership) -> bool {
        if self.memberships.contains(&membership) {
            return false;
        }
        self.memberships.push(membership);
        true
    }

    /// Adds an open-ended membership for `patient_id` starting at `start_date`.
    pub fn add_member(&mut self, patient_id: PatientId, start_date: Option<DateTime<Utc>>) -> bool {
        self.add_membership(CohortMembership::new(patient_id, start_date))
    }

    /// Removes the membership with the same content. Returns `false` if there was none.
    pub fn remove_membership(&mut self, membership: &CohortMembership) -> bool {
        let before = self.memberships.len();
        self.memberships.retain(|m| m != membership);
        self.memberships.len() != before
    }

    pub fn active_memberships(&self, as_of: DateTime<Utc>) -> Vec<&CohortMembership> {
        self.memberships
            .iter()
            .filter(|m| m.is_active(as_of))
            .collect()
    }

    /// The active membership of `patient_id` at `as_of` with the latest start.
    pub fn active_membership(
        &self,
        patient_id: PatientId,
        as_of: DateTime<Utc>,
    ) -> Option<&CohortMembership> {
        self.memberships
            .iter()
            .filter(|m| m.patient_id == patient_id && m.is_active(as_of))
            .min_by(|a, b| membership_order(a, b))
    }

    /// True if `patient_id` has a membership active right now.
    pub fn has_active_membership(&self, patient_id: PatientId) -> bool {
        self.active_membership(patient_id, Utc::now()).is_some()
    }

    /// True if `patient_id` has any non-voided membership, active or not.
    pub fn contains(&self, patient_id: PatientId) -> bool {
        self.memberships
            .iter()
            .any(|m| m.patient_id == patient_id && !m.is_voided())
    }

    /// Patients with a membership active right now.
    pub fn member_ids(&self) -> BTreeSet<PatientId> {
        self.active_memberships(Utc::now())
            .into_iter()
            .map(|m| m.patient_id)
            .collect()
    }

    /// Number of patients with a membership active right now.
    pub fn size(&self) -> usize {
        self.member_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Ends the patient's active membership at `end_date`.
    ///
    /// Returns `false` if the patient had no membership active at `end_date`. If ending it
    /// makes it identical to another membership, the two collapse into one.
    pub fn end_membership(&mut self, patient_id: PatientId, end_date: DateTime<Utc>) -> bool {
        let Some(index) = self
            .memberships
            .iter()
            .position(|m| m.patient_id == patient_id && m.is_active(end_date))
        else {
            return false;
        };

        let mut ended = self.memberships.remove(index);
        ended.end_date = Some(end_date);
        self.add_membership(ended);
        true
    }

    /// Memberships of either cohort. A missing cohort counts as empty.
    pub fn union(a: Option<&Cohort>, b: Option<&Cohort>) -> Cohort {
        let mut ret = Self::with_raw_name(combined_name(a, '+', b));
        for m in a.into_iter().chain(b).flat_map(|c| c.memberships.iter()) {
            ret.add_membership(m.clone());
        }
        tracing::debug!(name = %ret.name, size = ret.memberships.len(), "cohort union");
        ret
    }

    /// Memberships present in both cohorts (by content). Empty if either is missing.
    pub fn intersect(a: Option<&Cohort>, b: Option<&Cohort>) -> Cohort {
        let mut ret = Self::with_raw_name(combined_name(a, '*', b));
        if let (Some(a), Some(b)) = (a, b) {
            for m in a.memberships.iter().filter(|m| b.memberships.contains(m)) {
                ret.add_membership(m.clone());
            }
        }
        tracing::debug!(name = %ret.name, size = ret.memberships.len(), "cohort intersect");
        ret
    }

    /// Memberships of `a` not present in `b` (by content).
    pub fn subtract(a: Option<&Cohort>, b: Option<&Cohort>) -> Cohort {
        let mut ret = Self::with_raw_name(combined_name(a, '-', b));
        if let Some(a) = a {
            let removed = b.map(|b| b.memberships.as_slice()).unwrap_or_default();
            for m in a.memberships.iter().filter(|m| !removed.contains(m)) {
                ret.add_membership(m.clone());
            }
        }
        tracing::debug!(name = %ret.name, size = ret.memberships.len(), "cohort subtract");
        ret
    }
}

impl Voidable for Cohort {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}

fn combined_name(a: Option<&Cohort>, op: char, b: Option<&Cohort>) -> String {
    let label = |c: Option<&Cohort>| c.map_or(NULL_COHORT_NAME, |c| c.name.as_str()).to_string();
    format!("({} {} {})", label(a), op, label(b))
}
