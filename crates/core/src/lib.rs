//! # EMR Core
//!
//! Domain layer for patient programme enrollment and cohorts.
//!
//! - Programmes, their workflows and workflow states (the catalogue)
//! - Patient enrollments and the state-transition rules that govern them
//! - Cohorts and their set algebra (union, intersection, difference)
//! - Allergies, person names and addresses
//!
//! Everything here is in-memory and synchronous. Persistence, transactions and the wire
//! format live elsewhere (`emr-wire`, `emr-cli`).

pub mod allergy;
pub mod audit;
pub mod cohort;
pub mod concept;
pub mod config;
pub mod constants;
pub mod error;
pub mod ordering;
pub mod patient_program;
pub mod person;
pub mod program;
pub mod workflow;

pub use allergy::{Allergen, AllergenType, Allergies, Allergy, AllergyReaction, AllergyStatus};
pub use audit::{AuditInfo, RetireInfo, Retireable, VoidInfo, Voidable};
pub use cohort::{membership_order, Cohort, CohortMembership};
pub use concept::{Concept, ConceptName};
pub use config::{CoreConfig, NameFormat};
pub use error::{EmrError, EmrResult};
pub use patient_program::{chronological_order, PatientProgram, PatientState};
pub use person::{address_order, name_order, PersonAddress, PersonName};
pub use program::Program;
pub use workflow::{ProgramWorkflow, ProgramWorkflowState};

pub use emr_types::{Locale, NonEmptyText, PatientId};
pub use emr_uuid::EntityUuid;
