//! Concepts and their localized names.
//!
//! Programmes, workflows, workflow states and allergens are all named through a concept.
//! Display code asks a concept for its name in the configured locale.

use crate::audit::{RetireInfo, Retireable};
use emr_types::{Locale, NonEmptyText};
use emr_uuid::EntityUuid;

/// One name of a concept in one locale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConceptName {
    pub name: NonEmptyText,
    pub locale: Locale,
    /// The preferred name among several names in the same locale.
    pub locale_preferred: bool,
}

impl ConceptName {
    pub fn new(name: NonEmptyText, locale: Locale) -> Self {
        Self {
            name,
            locale,
            locale_preferred: false,
        }
    }

    pub fn preferred(name: NonEmptyText, locale: Locale) -> Self {
        Self {
            name,
            locale,
            locale_preferred: true,
        }
    }
}

/// A coded concept. Always has at least one name.
///
/// Two concepts are equal when their UUIDs are equal.
#[derive(Clone, Debug)]
pub struct Concept {
    pub uuid: EntityUuid,
    names: Vec<ConceptName>,
    pub retire: RetireInfo,
}

impl PartialEq for Concept {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Concept {}

impl Concept {
    pub fn new(uuid: EntityUuid, name: ConceptName) -> Self {
        Self {
            uuid,
            names: vec![name],
            retire: RetireInfo::default(),
        }
    }

    /// Convenience constructor for a concept with a single preferred name.
    pub fn named(name: NonEmptyText, locale: Locale) -> Self {
        Self::new(EntityUuid::new(), ConceptName::preferred(name, locale))
    }

    /// Adds a name. A new locale-preferred name demotes any previous preferred name in
    /// the same locale.
    pub fn add_name(&mut self, name: ConceptName) {
        if name.locale_preferred {
            for existing in self.names.iter_mut().filter(|n| n.locale == name.locale) {
                existing.locale_preferred = false;
            }
        }
        self.names.push(name);
    }

    pub fn names(&self) -> &[ConceptName] {
        &self.names
    }

    /// The best name for `locale`.
    ///
    /// Preference order: the locale-preferred name in that exact locale, any name in that
    /// exact locale, any name sharing the language, then the first name recorded.
    pub fn name(&self, locale: &Locale) -> &ConceptName {
        let exact = || self.names.iter().filter(|n| &n.locale == locale);

        exact()
            .find(|n| n.locale_preferred)
            .or_else(|| exact().next())
            .or_else(|| self.names.iter().find(|n| n.locale.same_language(locale)))
            .unwrap_or(&self.names[0])
    }

    /// Shorthand for `self.name(locale).name.as_str()`.
    pub fn display_name(&self, locale: &Locale) -> &str {
        self.name(locale).name.as_str()
    }

    /// True if any name of this concept matches `name` ignoring case, in any locale.
    pub fn has_name(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        self.names
            .iter()
            .any(|n| n.name.as_str().to_lowercase() == wanted)
    }
}

impl Retireable for Concept {
    fn retire_info(&self) -> &RetireInfo {
        &self.retire
    }

    fn retire_info_mut(&mut self) -> &mut RetireInfo {
        &mut self.retire
    }
}
