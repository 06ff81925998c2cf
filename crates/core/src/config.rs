//! Core runtime configuration.
//!
//! Settings that would otherwise be process-wide statics (the display locale, the person
//! name format, the "other non-coded" allergen concept) are resolved once at startup into a
//! [`CoreConfig`] and passed explicitly to the functions that need them. The core never reads
//! environment variables itself.

use crate::constants::DEFAULT_LOCALE;
use crate::{EmrError, EmrResult};
use emr_types::Locale;
use emr_uuid::EntityUuid;
use std::str::FromStr;

/// How [`crate::person::PersonName::full_name`] renders a name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameFormat {
    /// Given, middle and family names only.
    #[default]
    Short,
    /// Every name part including prefix, family prefix/suffix and degree.
    Long,
}

impl FromStr for NameFormat {
    type Err = EmrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(NameFormat::Short),
            "long" => Ok(NameFormat::Long),
            other => Err(EmrError::InvalidInput(format!(
                "name format must be 'short' or 'long', got '{other}'"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    locale: Locale,
    name_format: NameFormat,
    other_non_coded_allergen: Option<EntityUuid>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            name_format: NameFormat::default(),
            other_non_coded_allergen: None,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        locale: Locale,
        name_format: NameFormat,
        other_non_coded_allergen: Option<EntityUuid>,
    ) -> Self {
        Self {
            locale,
            name_format,
            other_non_coded_allergen,
        }
    }

    /// Build a configuration from raw (typically environment) values.
    ///
    /// Missing or blank values fall back to the defaults: locale `en`, short names, no
    /// "other non-coded" allergen concept.
    ///
    /// # Errors
    ///
    /// Returns an [`EmrError`] if a present value cannot be parsed.
    pub fn from_values(
        locale: Option<String>,
        name_format: Option<String>,
        other_non_coded_allergen: Option<String>,
    ) -> EmrResult<Self> {
        let locale = non_blank(locale)
            .map(|v| Locale::parse(&v))
            .transpose()?
            .map_or_else(|| Locale::parse(DEFAULT_LOCALE), Ok)?;
        let name_format = non_blank(name_format)
            .map(|v| v.parse::<NameFormat>())
            .transpose()?
            .unwrap_or_default();
        let other_non_coded_allergen = non_blank(other_non_coded_allergen)
            .map(|v| EntityUuid::parse(&v))
            .transpose()?;

        Ok(Self::new(locale, name_format, other_non_coded_allergen))
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn name_format(&self) -> NameFormat {
        self.name_format
    }

    /// UUID of the concept that marks an allergen as free text rather than coded.
    pub fn other_non_coded_allergen(&self) -> Option<EntityUuid> {
        self.other_non_coded_allergen
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_defaults_when_missing() {
        let cfg = CoreConfig::from_values(None, Some("  ".into()), None).expect("defaults");
        assert_eq!(cfg.locale().to_string(), "en");
        assert_eq!(cfg.name_format(), NameFormat::Short);
        assert_eq!(cfg.other_non_coded_allergen(), None);
    }

    #[test]
    fn test_from_values_parses_everything() {
        let cfg = CoreConfig::from_values(
            Some("fr_CA".into()),
            Some("LONG".into()),
            Some("5622aaaa-0000-4000-8000-000000000000".into()),
        )
        .expect("valid values");
        assert_eq!(cfg.locale().to_string(), "fr_CA");
        assert_eq!(cfg.name_format(), NameFormat::Long);
        assert_eq!(
            cfg.other_non_coded_allergen().map(|u| u.to_string()),
            Some("5622aaaa-0000-4000-8000-000000000000".to_string())
        );
    }

    #[test]
    fn test_from_values_rejects_bad_name_format() {
        let err = CoreConfig::from_values(None, Some("medium".into()), None)
            .expect_err("should reject format");
        match err {
            EmrError::InvalidInput(msg) => assert!(msg.contains("medium")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_from_values_rejects_bad_locale_and_uuid() {
        assert!(matches!(
            CoreConfig::from_values(Some("english".into()), None, None),
            Err(EmrError::Text(_))
        ));
        assert!(matches!(
            CoreConfig::from_values(None, None, Some("nope".into())),
            Err(EmrError::Uuid(_))
        ));
    }
}
