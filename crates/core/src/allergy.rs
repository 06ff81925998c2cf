//! Patient allergies with duplicate-allergen protection.
//!
//! An allergen is either coded (a concept) or free text. Free-text allergens carry the
//! configured "other, non-coded" concept plus the text. Which concept plays that role comes
//! from [`CoreConfig::other_non_coded_allergen`].

use crate::audit::{AuditInfo, VoidInfo, Voidable};
use crate::concept::Concept;
use crate::config::CoreConfig;
use crate::{EmrError, EmrResult};
use emr_types::{Locale, NonEmptyText, PatientId};
use emr_uuid::EntityUuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllergenType {
    Drug,
    Food,
    Environment,
    Other,
}

/// What a patient is allergic to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allergen {
    pub allergen_type: AllergenType,
    pub coded_allergen: Option<Concept>,
    pub non_coded_allergen: Option<NonEmptyText>,
}

impl Allergen {
    pub fn coded(allergen_type: AllergenType, concept: Concept) -> Self {
        Self {
            allergen_type,
            coded_allergen: Some(concept),
            non_coded_allergen: None,
        }
    }

    /// A free-text allergen recorded against the "other, non-coded" concept.
    pub fn non_coded(
        allergen_type: AllergenType,
        other_concept: Option<Concept>,
        text: NonEmptyText,
    ) -> Self {
        Self {
            allergen_type,
            coded_allergen: other_concept,
            non_coded_allergen: Some(text),
        }
    }

    /// A concept is present and it is not the configured "other, non-coded" concept.
    pub fn is_coded(&self, config: &CoreConfig) -> bool {
        match &self.coded_allergen {
            None => false,
            Some(concept) => config.other_non_coded_allergen() != Some(concept.uuid),
        }
    }

    /// Same coded concept, or same free text ignoring case.
    pub fn is_same_allergen(&self, other: &Allergen, config: &CoreConfig) -> bool {
        match (self.is_coded(config), other.is_coded(config)) {
            (true, true) => match (&self.coded_allergen, &other.coded_allergen) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            (false, false) => match (&self.non_coded_allergen, &other.non_coded_allergen) {
                (Some(a), Some(b)) => a.eq_ignore_case(b),
                _ => false,
            },
            _ => false,
        }
    }

    pub fn display(&self, config: &CoreConfig) -> String {
        if !self.is_coded(config) {
            if let Some(text) = &self.non_coded_allergen {
                return text.to_string();
            }
        }
        self.coded_allergen
            .as_ref()
            .map(|c| c.display_name(config.locale()).to_string())
            .unwrap_or_default()
    }
}

/// One observed reaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllergyReaction {
    pub reaction: Concept,
    pub non_coded_reaction: Option<NonEmptyText>,
}

#[derive(Clone, Debug)]
pub struct Allergy {
    pub uuid: EntityUuid,
    pub patient_id: PatientId,
    pub allergen: Allergen,
    pub severity: Option<Concept>,
    pub comment: Option<NonEmptyText>,
    pub reactions: Vec<AllergyReaction>,
    pub audit: AuditInfo,
    pub void: VoidInfo,
}

impl Allergy {
    pub fn new(patient_id: PatientId, allergen: Allergen) -> Self {
        Self {
            uuid: EntityUuid::new(),
            patient_id,
            allergen,
            severity: None,
            comment: None,
            reactions: Vec::new(),
            audit: AuditInfo::default(),
            void: VoidInfo::default(),
        }
    }

    pub fn has_same_allergen(&self, other: &Allergy, config: &CoreConfig) -> bool {
        self.allergen.is_same_allergen(&other.allergen, config)
    }

    /// Reaction names joined by `", "`, free text preferred over the concept name.
    pub fn reactions_display(&self, locale: &Locale) -> String {
        self.reactions
            .iter()
            .map(|r| match &r.non_coded_reaction {
                Some(text) => text.to_string(),
                None => r.reaction.display_name(locale).to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Voidable for Allergy {
    fn void_info(&self) -> &VoidInfo {
        &self.void
    }

    fn void_info_mut(&mut self) -> &mut VoidInfo {
        &mut self.void
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllergyStatus {
    /// Nobody has asked yet.
    #[default]
    Unknown,
    /// Confirmed: the patient has no known allergies.
    NoKnownAllergies,
    /// The allergy list is authoritative.
    SeeList,
}

/// A patient's allergy list.
#[derive(Clone, Debug, Default)]
pub struct Allergies {
    status: AllergyStatus,
    allergies: Vec<Allergy>,
}

impl Allergies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AllergyStatus {
        self.status
    }

    /// Every allergy, voided or not.
    pub fn all(&self) -> &[Allergy] {
        &self.allergies
    }

    pub fn active(&self) -> impl Iterator<Item = &Allergy> {
        self.allergies.iter().filter(|a| !a.is_voided())
    }

    /// True if a non-voided allergy other than `allergy` itself has the same allergen.
    pub fn contains_allergen(&self, allergy: &Allergy, config: &CoreConfig) -> bool {
        self.active()
            .any(|existing| existing.uuid != allergy.uuid && existing.has_same_allergen(allergy, config))
    }

    /// Adds an allergy and marks the list authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::DuplicateAllergen`] if a non-voided allergy with the same allergen
    /// is already recorded.
    pub fn add(&mut self, allergy: Allergy, config: &CoreConfig) -> EmrResult<()> {
        if self.contains_allergen(&allergy, config) {
            return Err(EmrError::DuplicateAllergen(allergy.allergen.display(config)));
        }
        tracing::debug!(allergy = %allergy.uuid, patient = %allergy.patient_id, "adding allergy");
        self.allergies.push(allergy);
        self.status = AllergyStatus::SeeList;
        Ok(())
    }

    /// Removes an allergy. The status goes back to unknown when no active allergy remains.
    pub fn remove(&mut self, uuid: EntityUuid) -> Option<Allergy> {
        let index = self.allergies.iter().position(|a| a.uuid == uuid)?;
        let removed = self.allergies.remove(index);
        if self.active().next().is_none() {
            self.status = AllergyStatus::Unknown;
        }
        Some(removed)
    }

    /// Records that the patient has no known allergies.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::InvalidInput`] if active allergies are recorded.
    pub fn confirm_no_known_allergies(&mut self) -> EmrResult<()> {
        if self.active().next().is_some() {
            return Err(EmrError::InvalidInput(
                "cannot confirm no known allergies while allergies are recorded".into(),
            ));
        }
        self.status = AllergyStatus::NoKnownAllergies;
        Ok(())
    }

    /// Checks an existing list (for example one read from storage) for duplicate allergens.
    pub fn check_no_duplicates(&self, config: &CoreConfig) -> EmrResult<()> {
        match self
            .active()
            .find(|a| self.contains_allergen(a, config))
        {
            Some(dup) => Err(EmrError::DuplicateAllergen(dup.allergen.display(config))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NameFormat;
    use chrono::Utc;

    fn en() -> Locale {
        Locale::parse("en").unwrap()
    }

    fn concept(name: &str) -> Concept {
        Concept::named(NonEmptyText::new(name).unwrap(), en())
    }

    fn setup() -> (CoreConfig, Concept) {
        let other = concept("Other non-coded");
        let cfg = CoreConfig::new(en(), NameFormat::Short, Some(other.uuid));
        (cfg, other)
    }

    #[test]
    fn test_is_coded_uses_configured_other_concept() {
        let (cfg, other) = setup();
        let coded = Allergen::coded(AllergenType::Drug, concept("Penicillin"));
        let free = Allergen::non_coded(
            AllergenType::Food,
            Some(other),
            NonEmptyText::new("Kiwi").unwrap(),
        );

        assert!(coded.is_coded(&cfg));
        assert!(!free.is_coded(&cfg));
        assert!(free.is_coded(&CoreConfig::default()));
    }

    #[test]
    fn test_same_allergen_rules() {
        let (cfg, other) = setup();
        let penicillin = concept("Penicillin");
        let a = Allergen::coded(AllergenType::Drug, penicillin.clone());
        let b = Allergen::coded(AllergenType::Drug, penicillin);
        let c = Allergen::coded(AllergenType::Drug, concept("Aspirin"));
        let kiwi = Allergen::non_coded(
            AllergenType::Food,
            Some(other.clone()),
            NonEmptyText::new("kiwi").unwrap(),
        );
        let kiwi_upper = Allergen::non_coded(
            AllergenType::Food,
            Some(other),
            NonEmptyText::new("KIWI").unwrap(),
        );

        assert!(a.is_same_allergen(&b, &cfg));
        assert!(!a.is_same_allergen(&c, &cfg));
        assert!(kiwi.is_same_allergen(&kiwi_upper, &cfg));
        assert!(!kiwi.is_same_allergen(&a, &cfg));
    }

    #[test]
    fn test_add_rejects_duplicate_allergen() {
        let (cfg, _) = setup();
        let penicillin = concept("Penicillin");
        let mut list = Allergies::new();
        assert_eq!(list.status(), AllergyStatus::Unknown);

        list.add(
            Allergy::new(PatientId(1), Allergen::coded(AllergenType::Drug, penicillin.clone())),
            &cfg,
        )
        .expect("first allergy");
        assert_eq!(list.status(), AllergyStatus::SeeList);

        let err = list
            .add(
                Allergy::new(PatientId(1), Allergen::coded(AllergenType::Drug, penicillin)),
                &cfg,
            )
            .expect_err("duplicate allergen");
        match err {
            EmrError::DuplicateAllergen(name) => assert_eq!(name, "Penicillin"),
            other => panic!("expected DuplicateAllergen, got {other:?}"),
        }
        assert_eq!(list.all().len(), 1);
    }

    #[test]
    fn test_voided_allergy_does_not_block_readding() {
        let (cfg, _) = setup();
        let penicillin = concept("Penicillin");
        let mut list = Allergies::new();

        let mut first = Allergy::new(PatientId(1), Allergen::coded(AllergenType::Drug, penicillin.clone()));
        first.void(None, Utc::now(), NonEmptyText::new("wrong drug").unwrap());
        list.add(first, &cfg).expect("voided allergy added");

        list.add(
            Allergy::new(PatientId(1), Allergen::coded(AllergenType::Drug, penicillin)),
            &cfg,
        )
        .expect("re-add after void");
        assert_eq!(list.active().count(), 1);
        list.check_no_duplicates(&cfg).expect("no active duplicates");
    }

    #[test]
    fn test_confirm_no_known_allergies() {
        let (cfg, _) = setup();
        let mut list = Allergies::new();
        list.confirm_no_known_allergies().expect("empty list");
        assert_eq!(list.status(), AllergyStatus::NoKnownAllergies);

        let allergy = Allergy::new(PatientId(1), Allergen::coded(AllergenType::Environment, concept("Dust")));
        let uuid = allergy.uuid;
        list.add(allergy, &cfg).unwrap();
        assert!(list.confirm_no_known_allergies().is_err());

        assert!(list.remove(uuid).is_some());
        assert_eq!(list.status(), AllergyStatus::Unknown);
    }

    #[test]
    fn test_reactions_display_prefers_free_text() {
        let mut allergy = Allergy::new(PatientId(1), Allergen::coded(AllergenType::Drug, concept("Sulfa")));
        allergy.reactions.push(AllergyReaction {
            reaction: concept("Rash"),
            non_coded_reaction: None,
        });
        allergy.reactions.push(AllergyReaction {
            reaction: concept("Other"),
            non_coded_reaction: Some(NonEmptyText::new("Itchy eyes").unwrap()),
        });
        assert_eq!(allergy.reactions_display(&en()), "Rash, Itchy eyes");
    }
}
