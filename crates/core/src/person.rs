//! Person names and addresses.
//!
//! Both carry a `preferred` flag and are voidable. Content comparison is explicit and
//! field by field; the orderings here sort records for display and do not agree with
//! content equality.

use crate::audit::{AuditInfo, VoidInfo, Voidable};
use crate::config::NameFormat;
use crate::ordering::compare_none_latest;
use chrono::{DateTime, Utc};
use emr_types::{NonEmptyText, PatientId};
use emr_uuid::EntityUuid;
use std::cmp::Ordering;

#[derive(Clone, Debug, Default)]
pub struct PersonName {
    pub uuid: EntityUuid,
    pub person_id: Option<PatientId>,
    pub preferred: bool,
    pub prefix: Option<NonEmptyText>,
    pub given_name: Option<NonEmptyText>,
    pub middle_name: Option<NonEmptyText>,
    pub family_name_prefix: Option<NonEmptyText>,
    pub family_name: Option<NonEmptyText>,
    pub family_name2: Option<NonEmptyText>,
    pub family_name_suffix: Option<NonEmptyText>,
    pub degree: Option<NonEmptyText>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl PersonName {
    /// A name with just the given and family parts set.
    pub fn new(given_name: Option<NonEmptyText>, family_name: Option<NonEmptyText>) -> Self {
        Self {
            uuid: EntityUuid::new(),
            given_name,
            family_name,
            ..Self::default()
        }
    }

    /// True when every name part matches. Audit data, uuid and `preferred` are ignored.
    pub fn equals_content(&self, other: &PersonName) -> bool {
        self.prefix == other.prefix
            && self.given_name == other.given_name
            && self.middle_name == other.middle_name
            && self.family_name_prefix == other.family_name_prefix
            && self.family_name == other.family_name
            && self.family_name2 == other.family_name2
            && self.family_name_suffix == other.family_name_suffix
            && self.degree == other.degree
    }

    /// The name parts selected by `format`, joined by single spaces.
    pub fn full_name(&self, format: NameFormat) -> String {
        let parts: Vec<&Option<NonEmptyText>> = match format {
            NameFormat::Short => vec![
                &self.given_name,
                &self.middle_name,
                &self.family_name,
                &self.family_name2,
            ],
            NameFormat::Long => vec![
                &self.prefix,
                &self.given_name,
                &self.middle_name,
                &self.family_name_prefix,
                &self.family_name,
                &self.family_name2,
                &self.family_name_suffix,
                &self.degree,
            ],
        };

        parts
            .into_iter()
            .flatten()
            .map(NonEmptyText::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Voidable for PersonName {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}

fn voided_last(a: bool, b: bool) -> Ordering {
    a.cmp(&b)
}

fn preferred_first(a: bool, b: bool) -> Ordering {
    b.cmp(&a)
}

/// Display ordering for names.
///
/// Non-voided before voided, preferred before not, then family name, second family name,
/// given, middle, family prefix and family suffix (missing parts last), then creation date
/// (missing last) and uuid. Two names with equal content can still order differently.
pub fn name_order(a: &PersonName, b: &PersonName) -> Ordering {
    voided_last(a.is_voided(), b.is_voided())
        .then_with(|| preferred_first(a.preferred, b.preferred))
        .then_with(|| compare_none_latest(a.family_name.as_ref(), b.family_name.as_ref()))
        .then_with(|| compare_none_latest(a.family_name2.as_ref(), b.family_name2.as_ref()))
        .then_with(|| compare_none_latest(a.given_name.as_ref(), b.given_name.as_ref()))
        .then_with(|| compare_none_latest(a.middle_name.as_ref(), b.middle_name.as_ref()))
        .then_with(|| {
            compare_none_latest(a.family_name_prefix.as_ref(), b.family_name_prefix.as_ref())
        })
        .then_with(|| {
            compare_none_latest(a.family_name_suffix.as_ref(), b.family_name_suffix.as_ref())
        })
        .then_with(|| compare_none_latest(a.audit.date_created.as_ref(), b.audit.date_created.as_ref()))
        .then_with(|| a.uuid.cmp(&b.uuid))
}

#[derive(Clone, Debug, Default)]
pub struct PersonAddress {
    pub uuid: EntityUuid,
    pub person_id: Option<PatientId>,
    pub preferred: bool,
    pub address1: Option<NonEmptyText>,
    pub address2: Option<NonEmptyText>,
    pub address3: Option<NonEmptyText>,
    pub address4: Option<NonEmptyText>,
    pub address5: Option<NonEmptyText>,
    pub address6: Option<NonEmptyText>,
    pub city_village: Option<NonEmptyText>,
    pub county_district: Option<NonEmptyText>,
    pub state_province: Option<NonEmptyText>,
    pub country: Option<NonEmptyText>,
    pub postal_code: Option<NonEmptyText>,
    pub latitude: Option<NonEmptyText>,
    pub longitude: Option<NonEmptyText>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl PersonAddress {
    pub fn new() -> Self {
        Self {
            uuid: EntityUuid::new(),
            ..Self::default()
        }
    }

    fn text_fields(&self) -> [&Option<NonEmptyText>; 13] {
        [
            &self.address1,
            &self.address2,
            &self.address3,
            &self.address4,
            &self.address5,
            &self.address6,
            &self.city_village,
            &self.county_district,
            &self.state_province,
            &self.country,
            &self.postal_code,
            &self.latitude,
            &self.longitude,
        ]
    }

    /// True when every address field and the validity dates match.
    ///
    /// Blank text cannot be stored, so an absent field only matches another absent field.
    pub fn equals_content(&self, other: &PersonAddress) -> bool {
        self.text_fields() == other.text_fields()
            && self.start_date == other.start_date
            && self.end_date == other.end_date
    }

    /// Active when `on` falls inside `[start_date, end_date]`; missing bounds are open.
    pub fn is_active(&self, on: DateTime<Utc>) -> bool {
        !self.is_voided()
            && self.start_date.map_or(true, |start| start <= on)
            && self.end_date.map_or(true, |end| on <= end)
    }
}

impl Voidable for PersonAddress {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}

/// Display ordering for addresses: non-voided, preferred, creation date (missing last), uuid.
pub fn address_order(a: &PersonAddress, b: &PersonAddress) -> Ordering {
    voided_last(a.is_voided(), b.is_voided())
        .then_with(|| preferred_first(a.preferred, b.preferred))
        .then_with(|| compare_none_latest(a.audit.date_created.as_ref(), b.audit.date_created.as_ref()))
        .then_with(|| a.uuid.cmp(&b.uuid))
}
