//! Wire pieces shared by the document modules: concepts, void/retire stamps, and the strict
//! YAML entry points.

use crate::{WireError, WireResult};
use chrono::{DateTime, Utc};
use emr_core::{Concept, ConceptName, RetireInfo, VoidInfo};
use emr_types::{Locale, NonEmptyText};
use emr_uuid::EntityUuid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Deserialize `yaml_text` into `T`, reporting the failing field path on mismatch.
pub(crate) fn from_yaml<T: DeserializeOwned>(yaml_text: &str, what: &str) -> WireResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(WireError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

pub(crate) fn to_yaml<T: Serialize>(wire: &T, what: &str) -> WireResult<String> {
    serde_yaml::to_string(wire)
        .map_err(|e| WireError::Translation(format!("Failed to serialize {what}: {e}")))
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> WireResult<EntityUuid> {
    EntityUuid::parse(value)
        .map_err(|_| WireError::InvalidUuid(format!("Invalid UUID in {field}: {value}")))
}

pub(crate) fn parse_text(value: &str, field: &str) -> WireResult<NonEmptyText> {
    NonEmptyText::new(value)
        .map_err(|e| WireError::InvalidInput(format!("{field}: {e}")))
}

pub(crate) fn optional_text(value: Option<&str>, field: &str) -> WireResult<Option<NonEmptyText>> {
    value.map(|v| parse_text(v, field)).transpose()
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConceptWire {
    pub uuid: String,
    pub names: Vec<ConceptNameWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConceptNameWire {
    pub name: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub preferred: bool,
}

impl ConceptWire {
    pub(crate) fn to_domain(&self, field: &str) -> WireResult<Concept> {
        let uuid = parse_uuid(&self.uuid, &format!("{field}.uuid"))?;

        let mut names = self.names.iter().map(|n| -> WireResult<ConceptName> {
            let locale = Locale::parse(&n.locale)
                .map_err(|e| WireError::InvalidInput(format!("{field}.names.locale: {e}")))?;
            let name = parse_text(&n.name, &format!("{field}.names.name"))?;
            Ok(if n.preferred {
                ConceptName::preferred(name, locale)
            } else {
                ConceptName::new(name, locale)
            })
        });

        let first = names.next().ok_or_else(|| {
            WireError::InvalidInput(format!("{field}: a concept needs at least one name"))
        })??;
        let mut concept = Concept::new(uuid, first);
        for name in names {
            concept.add_name(name?);
        }
        Ok(concept)
    }

    pub(crate) fn from_domain(concept: &Concept) -> Self {
        Self {
            uuid: concept.uuid.to_string(),
            names: concept
                .names()
                .iter()
                .map(|n| ConceptNameWire {
                    name: n.name.to_string(),
                    locale: n.locale.to_string(),
                    preferred: n.locale_preferred,
                })
                .collect(),
        }
    }
}

/// Retirement stamp. Absent means "not retired".
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct RetireWire {
    pub date: DateTime<Utc>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
}

impl RetireWire {
    pub(crate) fn apply(&self, info: &mut RetireInfo, field: &str) -> WireResult<()> {
        let by = self
            .by
            .as_deref()
            .map(|by| parse_uuid(by, &format!("{field}.by")))
            .transpose()?;
        let reason = parse_text(&self.reason, &format!("{field}.reason"))?;
        info.retire(by, self.date, reason);
        Ok(())
    }

    pub(crate) fn from_domain(info: &RetireInfo) -> Option<Self> {
        if !info.is_retired() {
            return None;
        }
        Some(Self {
            date: info.date_retired()?,
            reason: info.retire_reason()?.to_string(),
            by: info.retired_by().map(|u| u.to_string()),
        })
    }
}

/// Void stamp. Absent means "not voided".
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct VoidWire {
    pub date: DateTime<Utc>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
}

impl VoidWire {
    pub(crate) fn apply(&self, info: &mut VoidInfo, field: &str) -> WireResult<()> {
        let by = self
            .by
            .as_deref()
            .map(|by| parse_uuid(by, &format!("{field}.by")))
            .transpose()?;
        let reason = parse_text(&self.reason, &format!("{field}.reason"))?;
        info.void(by, self.date, reason);
        Ok(())
    }

    pub(crate) fn from_domain(info: &VoidInfo) -> Option<Self> {
        if !info.is_voided() {
            return None;
        }
        Some(Self {
            date: info.date_voided()?,
            reason: info.void_reason()?.to_string(),
            by: info.voided_by().map(|u| u.to_string()),
        })
    }
}
