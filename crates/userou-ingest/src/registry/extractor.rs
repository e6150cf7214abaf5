//! Positional field extraction
//!
//! The registry documents carry no field names worth trusting, only a fixed
//! child order. Legal persons (UO):
//!
//! | # | Field |
//! |---|-------|
//! | 0 | full name |
//! | 1 | short name |
//! | 2 | EDRPOU code (TIN) |
//! | 3 | address |
//! | 4 | chief officer |
//! | 5 | primary activity (KVED) |
//! | 6 | status |
//! | 7 | `FOUNDERS`, only when the entity has founders |
//!
//! Entrepreneurs (FOP): name, residence, primary activity, status.

use super::models::{EntityKind, Entrepreneur, LegalPerson, RawElement, StructuredRecord};
use crate::config::FOUNDERS_TAG;
use crate::error::{IngestError, Result};

/// Positional fields of a legal-person record
pub const LEGAL_PERSON_FIELDS: usize = 7;

/// Positional fields of an entrepreneur record
pub const ENTREPRENEUR_FIELDS: usize = 4;

/// Turn a raw record element into a structured record
pub fn extract(element: RawElement, kind: EntityKind) -> Result<StructuredRecord> {
    match kind {
        EntityKind::LegalPerson => extract_legal_person(element).map(StructuredRecord::LegalPerson),
        EntityKind::Entrepreneur => extract_entrepreneur(element).map(StructuredRecord::Entrepreneur),
    }
}

fn extract_legal_person(element: RawElement) -> Result<LegalPerson> {
    let fields_end = element.children.len().min(LEGAL_PERSON_FIELDS);
    if element.children[..fields_end]
        .iter()
        .any(|child| child.tag == FOUNDERS_TAG)
    {
        return Err(IngestError::structural(
            element.tag.clone(),
            format!("{} is not the last child", FOUNDERS_TAG),
        ));
    }

    let has_founders = element
        .children
        .last()
        .is_some_and(|child| child.tag == FOUNDERS_TAG);
    let expected = if has_founders {
        LEGAL_PERSON_FIELDS + 1
    } else {
        LEGAL_PERSON_FIELDS
    };
    ensure_child_count(&element, expected, kind_label(EntityKind::LegalPerson, has_founders))?;

    let RawElement { children, .. } = element;
    let mut children = children.into_iter();
    let mut next_field = || children.next().and_then(|child| field_value(child.text));

    let mut person = LegalPerson {
        full_name: next_field(),
        short_name: next_field(),
        tin: next_field(),
        address: next_field(),
        chief_officer: next_field(),
        activity: next_field(),
        status: next_field(),
        founders: Vec::new(),
    };

    if let Some(container) = children.next() {
        person.founders = container
            .children
            .into_iter()
            .map(|founder| field_value(founder.text))
            .collect();
    }

    Ok(person)
}

fn extract_entrepreneur(element: RawElement) -> Result<Entrepreneur> {
    ensure_child_count(&element, ENTREPRENEUR_FIELDS, kind_label(EntityKind::Entrepreneur, false))?;

    let mut children = element.children.into_iter();
    let mut next_field = || children.next().and_then(|child| field_value(child.text));

    Ok(Entrepreneur {
        full_name: next_field(),
        address: next_field(),
        activity: next_field(),
        status: next_field(),
    })
}

fn ensure_child_count(element: &RawElement, expected: usize, label: &str) -> Result<()> {
    let actual = element.children.len();
    if actual == expected {
        return Ok(());
    }

    Err(IngestError::structural(
        element.tag.clone(),
        format!("{} expects {} children, found {}", label, expected, actual),
    ))
}

fn kind_label(kind: EntityKind, has_founders: bool) -> &'static str {
    match (kind, has_founders) {
        (EntityKind::LegalPerson, true) => "legal person with founders",
        (EntityKind::LegalPerson, false) => "legal person without founders",
        (EntityKind::Entrepreneur, _) => "entrepreneur",
    }
}

/// Trimmed text; absent text stays absent
fn field_value(text: Option<String>) -> Option<String> {
    text.map(|value| {
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            value
        } else {
            trimmed.to_string()
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn legal_person(founders: Option<&[&str]>) -> RawElement {
        let mut record = RawElement::new("RECORD")
            .with_child(RawElement::leaf("NAME", " ТОВАРИСТВО З ОБМЕЖЕНОЮ ВІДПОВІДАЛЬНІСТЮ \"ГОРБУДІНДУСТРІЯ\" "))
            .with_child(RawElement::leaf("SHORT_NAME", "ТОВ \"ГОРБУДІНДУСТРІЯ\""))
            .with_child(RawElement::leaf("EDRPOU", "34567528"))
            .with_child(RawElement::leaf(
                "ADDRESS",
                "19501, Черкаська обл., Городищенський район, місто Городище, ВУЛИЦЯ ІНДУСТРІАЛЬНА, будинок 18",
            ))
            .with_child(RawElement::leaf("BOSS", "СТОРОЖУК В'ЯЧЕСЛАВ ПЕТРОВИЧ"))
            .with_child(RawElement::leaf("KVED", "14.11.0 ДОБУВАННЯ ДЕКОРАТИВНОГО ТА БУДІВЕЛЬНОГО КАМЕНЮ"))
            .with_child(RawElement::leaf("STAN", "в стані припинення"));

        if let Some(names) = founders {
            let mut container = RawElement::new("FOUNDERS");
            for name in names {
                container = container.with_child(RawElement::leaf("FOUNDER", *name));
            }
            record = record.with_child(container);
        }
        record
    }

    fn entrepreneur() -> RawElement {
        RawElement::new("RECORD")
            .with_child(RawElement::leaf("FIO", "ШЕВЧЕНКО ОКСАНА ПЕТРІВНА"))
            .with_child(RawElement::leaf("ADDRESS", "01001, м.Київ"))
            .with_child(RawElement::leaf("KVED", "47.71 Роздрібна торгівля одягом"))
            .with_child(RawElement::leaf("STAN", "зареєстровано"))
    }

    #[test]
    fn test_legal_person_without_founders() {
        let record = extract(legal_person(None), EntityKind::LegalPerson).unwrap();

        assert_eq!(record.kind(), EntityKind::LegalPerson);
        assert!(record.founders().is_empty());
        let fields = record.fields();
        assert_eq!(fields.len(), LEGAL_PERSON_FIELDS);
        assert_eq!(
            fields[0],
            Some("ТОВАРИСТВО З ОБМЕЖЕНОЮ ВІДПОВІДАЛЬНІСТЮ \"ГОРБУДІНДУСТРІЯ\"")
        );
        assert_eq!(fields[2], Some("34567528"));
        assert_eq!(record.person_name(), Some("СТОРОЖУК В'ЯЧЕСЛАВ ПЕТРОВИЧ"));
    }

    #[test]
    fn test_founder_count_matches_container() {
        let record = extract(
            legal_person(Some(&["ІВАНЕНКО ІВАН ІВАНОВИЧ", " ТОВ \"ІНВЕСТ\" ", "ПЕТРЕНКО"])),
            EntityKind::LegalPerson,
        )
        .unwrap();

        assert_eq!(
            record.founders(),
            &[
                Some("ІВАНЕНКО ІВАН ІВАНОВИЧ".to_string()),
                Some("ТОВ \"ІНВЕСТ\"".to_string()),
                Some("ПЕТРЕНКО".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_founder_child_is_kept_as_none() {
        let mut element = legal_person(Some(&["А"]));
        element.children[7].children.push(RawElement::new("FOUNDER"));

        let record = extract(element, EntityKind::LegalPerson).unwrap();
        assert_eq!(record.founders(), &[Some("А".to_string()), None]);
    }

    #[test]
    fn test_absent_and_blank_fields() {
        let mut element = legal_person(None);
        element.children[1].text = None;
        element.children[4].text = Some("   ".to_string());

        let record = extract(element, EntityKind::LegalPerson).unwrap();
        let fields = record.fields();
        assert_eq!(fields[1], None);
        assert_eq!(fields[4], Some(""));
    }

    #[test]
    fn test_legal_person_wrong_child_count() {
        let mut element = legal_person(None);
        element.children.pop();
        let err = extract(element, EntityKind::LegalPerson).unwrap_err();
        assert!(matches!(err, IngestError::Structural { .. }));

        let mut element = legal_person(None);
        element.children.push(RawElement::leaf("EXTRA", "x"));
        let err = extract(element, EntityKind::LegalPerson).unwrap_err();
        assert!(err.to_string().contains("expects 7 children, found 8"));
    }

    #[test]
    fn test_founders_must_be_last() {
        let mut element = legal_person(Some(&["А"]));
        element.children.swap(6, 7);
        let err = extract(element, EntityKind::LegalPerson).unwrap_err();
        assert!(err.to_string().contains("FOUNDERS is not the last child"));
    }

    #[test]
    fn test_founders_in_field_position_with_seven_children() {
        // Address missing and the founders container moved up into its slot
        let mut element = legal_person(Some(&["ІВАНЕНКО ІВАН ІВАНОВИЧ"]));
        let founders = element.children.pop().unwrap();
        element.children[3] = founders;
        assert_eq!(element.children.len(), LEGAL_PERSON_FIELDS);

        let err = extract(element, EntityKind::LegalPerson).unwrap_err();
        assert!(matches!(err, IngestError::Structural { .. }));
        assert!(err.to_string().contains("FOUNDERS is not the last child"));
    }

    #[test]
    fn test_entrepreneur_fields() {
        let record = extract(entrepreneur(), EntityKind::Entrepreneur).unwrap();

        assert_eq!(record.kind(), EntityKind::Entrepreneur);
        assert_eq!(record.fields().len(), ENTREPRENEUR_FIELDS);
        assert!(record.founders().is_empty());
        assert_eq!(record.person_name(), Some("ШЕВЧЕНКО ОКСАНА ПЕТРІВНА"));
        assert_eq!(record.status(), Some("зареєстровано"));
    }

    #[test]
    fn test_entrepreneur_wrong_child_count() {
        let element = entrepreneur().with_child(RawElement::leaf("EXTRA", "x"));
        let err = extract(element, EntityKind::Entrepreneur).unwrap_err();
        assert!(matches!(err, IngestError::Structural { .. }));
    }
}
