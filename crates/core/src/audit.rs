//! Audit-trail value structs shared by every entity.
//!
//! Entities embed these by value rather than inheriting them:
//! - [`AuditInfo`]: who created / last changed the record and when.
//! - [`VoidInfo`]: soft deletion of patient data (states, enrollments, memberships).
//! - [`RetireInfo`]: soft deletion of metadata (programmes, workflows, concepts).
//!
//! The [`Voidable`] and [`Retireable`] traits expose the shared mutations so callers can
//! void or retire any entity the same way.

use chrono::{DateTime, Utc};
use emr_types::NonEmptyText;
use emr_uuid::EntityUuid;

/// Creation and change stamps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditInfo {
    pub creator: Option<EntityUuid>,
    pub date_created: Option<DateTime<Utc>>,
    pub changed_by: Option<EntityUuid>,
    pub date_changed: Option<DateTime<Utc>>,
}

impl AuditInfo {
    /// Stamp a freshly created record.
    pub fn created(creator: Option<EntityUuid>, at: DateTime<Utc>) -> Self {
        Self {
            creator,
            date_created: Some(at),
            changed_by: None,
            date_changed: None,
        }
    }

    pub fn record_change(&mut self, by: Option<EntityUuid>, at: DateTime<Utc>) {
        self.changed_by = by;
        self.date_changed = Some(at);
    }
}

/// Soft-deletion fields for patient data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoidInfo {
    voided: bool,
    voided_by: Option<EntityUuid>,
    date_voided: Option<DateTime<Utc>>,
    void_reason: Option<NonEmptyText>,
}

impl VoidInfo {
    pub fn is_voided(&self) -> bool {
        self.voided
    }

    pub fn voided_by(&self) -> Option<EntityUuid> {
        self.voided_by
    }

    pub fn date_voided(&self) -> Option<DateTime<Utc>> {
        self.date_voided
    }

    pub fn void_reason(&self) -> Option<&NonEmptyText> {
        self.void_reason.as_ref()
    }

    pub fn void(&mut self, by: Option<EntityUuid>, at: DateTime<Utc>, reason: NonEmptyText) {
        self.voided = true;
        self.voided_by = by;
        self.date_voided = Some(at);
        self.void_reason = Some(reason);
    }

    /// Clears every void field.
    pub fn unvoid(&mut self) {
        *self = Self::default();
    }
}

/// Soft-deletion fields for metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetireInfo {
    retired: bool,
    retired_by: Option<EntityUuid>,
    date_retired: Option<DateTime<Utc>>,
    retire_reason: Option<NonEmptyText>,
}

impl RetireInfo {
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn retired_by(&self) -> Option<EntityUuid> {
        self.retired_by
    }

    pub fn date_retired(&self) -> Option<DateTime<Utc>> {
        self.date_retired
    }

    pub fn retire_reason(&self) -> Option<&NonEmptyText> {
        self.retire_reason.as_ref()
    }

    pub fn retire(&mut self, by: Option<EntityUuid>, at: DateTime<Utc>, reason: NonEmptyText) {
        self.retired = true;
        self.retired_by = by;
        self.date_retired = Some(at);
        self.retire_reason = Some(reason);
    }

    pub fn unretire(&mut self) {
        *self = Self::default();
    }
}

/// Patient data that can be voided.
pub trait Voidable {
    fn void_info(&self) -> &VoidInfo;
    fn void_info_mut(&mut self) -> &mut VoidInfo;

    fn is_voided(&self) -> bool {
        self.void_info().is_voided()
    }

    fn void(&mut self, by: Option<EntityUuid>, at: DateTime<Utc>, reason: NonEmptyText) {
        self.void_info_mut().void(by, at, reason);
    }

    fn unvoid(&mut self) {
        self.void_info_mut().unvoid();
    }
}

/// Metadata that can be retired.
pub trait Retireable {
    fn retire_info(&self) -> &RetireInfo;
    fn retire_info_mut(&mut self) -> &mut RetireInfo;

    fn is_retired(&self) -> bool {
        self.retire_info().is_retired()
    }

    fn retire(&mut self, by: Option<EntityUuid>, at: DateTime<Utc>, reason: NonEmptyText) {
        self.retire_info_mut().retire(by, at, reason);
    }

    fn unretire(&mut self) {
        self.retire_info_mut().unretire();
    }
}
