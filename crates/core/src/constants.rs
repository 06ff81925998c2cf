//! Constants used throughout the EMR core crate.

/// Display locale used when no locale is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// Label standing in for a missing operand in synthesised cohort names.
pub const NULL_COHORT_NAME: &str = "NULL";

/// Environment variable naming the display locale.
pub const LOCALE_ENV: &str = "EMR_LOCALE";

/// Environment variable naming the person name format (`short` or `long`).
pub const NAME_FORMAT_ENV: &str = "EMR_NAME_FORMAT";

/// Environment variable holding the UUID of the "other, non-coded" allergen concept.
pub const OTHER_NON_CODED_ALLERGEN_ENV: &str = "EMR_OTHER_NON_CODED_ALLERGEN";
