//! Derived attributes
//!
//! Pure functions over extracted fields. Sex is guessed from the patronymic
//! (or Turkic `огли`/`кизи` suffix) ending the name, the classification code is
//! the KVED code that prefixes the activity description, and the active flag
//! compares the status text with the registered literal.

use super::models::{Derived, EnrichedRecord, Sex, StructuredRecord};

/// Status text of a registered, operating entity
pub const REGISTERED_STATUS: &str = "зареєстровано";

/// Four-letter feminine endings. The first uses a Latin `I`, a frequent
/// keyboard-layout slip in the register.
const FEMININE_ENDINGS: [&str; 5] = ["IВНА", "ІВНА", "ЇВНА", "ОВНА", "КИЗИ"];

/// Two-letter masculine endings, again with the Latin `I` variant
const MASCULINE_SHORT_ENDINGS: [&str; 3] = ["ИЧ", "IЧ", "ІЧ"];

const MASCULINE_LONG_ENDINGS: [&str; 2] = ["ОГЛИ", "ОГЛЫ"];

/// Guess sex from the ending of a person's full name
pub fn derive_sex(name: &str) -> Option<Sex> {
    let last_four = ending(name, 4);
    if FEMININE_ENDINGS.contains(&last_four.as_str()) {
        return Some(Sex::Female);
    }

    let last_two = ending(name, 2);
    if MASCULINE_SHORT_ENDINGS.contains(&last_two.as_str())
        || MASCULINE_LONG_ENDINGS.contains(&last_four.as_str())
    {
        return Some(Sex::Male);
    }

    None
}

/// Leading token of the activity description, e.g. `62.01`
pub fn derive_classification_code(activity: &str) -> Option<String> {
    activity.split_whitespace().next().map(str::to_owned)
}

/// `true` only for the registered status
pub fn derive_active_flag(status: &str) -> bool {
    status == REGISTERED_STATUS
}

/// Attach derived attributes to an extracted record
///
/// Absent fields leave the matching attribute unset; an empty name or
/// activity does too. An empty status is still a status and marks the record
/// inactive.
pub fn enrich(record: StructuredRecord) -> EnrichedRecord {
    let derived = Derived {
        sex: non_empty(record.person_name()).and_then(derive_sex),
        classification_code: non_empty(record.activity()).and_then(derive_classification_code),
        active: record.status().map(derive_active_flag),
    };

    EnrichedRecord { record, derived }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Last `n` characters, trimmed and uppercased
fn ending(name: &str, n: usize) -> String {
    let total = name.chars().count();
    name.chars()
        .skip(total.saturating_sub(n))
        .collect::<String>()
        .trim()
        .to_uppercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::registry::models::{Entrepreneur, LegalPerson};
    use proptest::prelude::*;

    #[test]
    fn test_feminine_names() {
        assert_eq!(derive_sex("ШЕВЧЕНКО ОКСАНА ПЕТРІВНА"), Some(Sex::Female));
        assert_eq!(derive_sex("Коваль Марія Іванівна"), Some(Sex::Female));
        assert_eq!(derive_sex("іванівна"), Some(Sex::Female));
        assert_eq!(derive_sex("ІВАНІВНА"), Some(Sex::Female));
        assert_eq!(derive_sex("ТКАЧ ОЛЕНА ОЛЕКСАНДРОВНА"), Some(Sex::Female));
        assert_eq!(derive_sex("ГРИЦАЙ ЮЛІЯ АНДРІЇВНА"), Some(Sex::Female));
        assert_eq!(derive_sex("АЛІЄВА ЛЕЙЛА РАШИД КИЗИ"), Some(Sex::Female));
        // Latin I in the patronymic
        assert_eq!(derive_sex("БОНДАР ІРИНА ПЕТРIВНА"), Some(Sex::Female));
    }

    #[test]
    fn test_masculine_names() {
        assert_eq!(derive_sex("СТОРОЖУК В'ЯЧЕСЛАВ ПЕТРОВИЧ"), Some(Sex::Male));
        assert_eq!(derive_sex("Мельник Андрій Ілліч"), Some(Sex::Male));
        assert_eq!(derive_sex("ГУСЕЙНОВ ЕЛЬЧИН АЛІ ОГЛИ"), Some(Sex::Male));
        assert_eq!(derive_sex("МАМЕДОВ РУСЛАН ОГЛЫ"), Some(Sex::Male));
        assert_eq!(derive_sex("ЛИСЕНКО ПЕТРО ФОМIЧ"), Some(Sex::Male));
    }

    #[test]
    fn test_unknown_sex() {
        assert_eq!(derive_sex("ТОВ \"РОМАШКА\""), None);
        assert_eq!(derive_sex("SMITH JOHN"), None);
        assert_eq!(derive_sex(""), None);
        assert_eq!(derive_sex("Ч"), None);
    }

    #[test]
    fn test_window_is_taken_before_trimming() {
        // The extractor trims fields, so this only matters for direct callers
        assert_eq!(derive_sex("ПЕТРОВИЧ "), None);
        assert_eq!(derive_sex("ПЕТРІВНА "), None);
    }

    #[test]
    fn test_classification_code() {
        assert_eq!(
            derive_classification_code("14.11.0 ДОБУВАННЯ ДЕКОРАТИВНОГО ТА БУДІВЕЛЬНОГО КАМЕНЮ"),
            Some("14.11.0".to_string())
        );
        assert_eq!(derive_classification_code("62.01"), Some("62.01".to_string()));
        assert_eq!(derive_classification_code("   "), None);
    }

    #[test]
    fn test_active_flag() {
        assert!(derive_active_flag("зареєстровано"));
        assert!(!derive_active_flag("припинено"));
        assert!(!derive_active_flag("в стані припинення"));
        assert!(!derive_active_flag("Зареєстровано"));
        assert!(!derive_active_flag(""));
    }

    #[test]
    fn test_enrich_legal_person_uses_chief_officer() {
        let record = StructuredRecord::LegalPerson(LegalPerson {
            full_name: Some("ТОВ \"А\"".to_string()),
            chief_officer: Some("КОВАЛЬ ГАННА ПЕТРІВНА".to_string()),
            activity: Some("62.01 Комп'ютерне програмування".to_string()),
            status: Some("зареєстровано".to_string()),
            ..LegalPerson::default()
        });

        let enriched = enrich(record);
        assert_eq!(enriched.derived.sex, Some(Sex::Female));
        assert_eq!(enriched.derived.classification_code.as_deref(), Some("62.01"));
        assert_eq!(enriched.derived.active, Some(true));
    }

    #[test]
    fn test_enrich_absent_and_empty_fields() {
        let record = StructuredRecord::Entrepreneur(Entrepreneur {
            full_name: Some(String::new()),
            address: None,
            activity: None,
            status: Some(String::new()),
        });

        let enriched = enrich(record);
        assert_eq!(enriched.derived.sex, None);
        assert_eq!(enriched.derived.classification_code, None);
        // Present but empty status is not the registered one
        assert_eq!(enriched.derived.active, Some(false));
    }

    #[test]
    fn test_enrich_entrepreneur_uses_name() {
        let record = StructuredRecord::Entrepreneur(Entrepreneur {
            full_name: Some("ШЕВЧЕНКО ТАРАС ГРИГОРОВИЧ".to_string()),
            address: None,
            activity: Some("01.11 Вирощування зернових".to_string()),
            status: Some("припинено".to_string()),
        });

        let enriched = enrich(record);
        assert_eq!(enriched.derived.sex, Some(Sex::Male));
        assert_eq!(enriched.derived.classification_code.as_deref(), Some("01.11"));
        assert_eq!(enriched.derived.active, Some(false));
    }

    proptest! {
        #[test]
        fn prop_sex_ignores_case(name in "[а-щьюяіїєА-ЩЬЮЯІЇЄ ]{0,24}") {
            prop_assert_eq!(derive_sex(&name.to_lowercase()), derive_sex(&name.to_uppercase()));
        }

        #[test]
        fn prop_sex_is_total(name in "\\PC{0,40}") {
            let _ = derive_sex(&name);
        }

        #[test]
        fn prop_classification_code_is_idempotent(activity in "\\PC{0,60}") {
            if let Some(code) = derive_classification_code(&activity) {
                prop_assert_eq!(derive_classification_code(&code), Some(code.clone()));
            }
        }
    }
}
