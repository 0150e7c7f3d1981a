use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::task::{CustomFieldValue, FieldKind, FieldValue};

#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("custom field {field} has unsupported kind `{kind}`")]
    UnknownFieldKind { field: String, kind: String },
}

/// gids of the custom fields that get special treatment on duplication.
#[derive(Debug, Clone, Copy)]
pub struct CostFields<'a> {
    pub expected: &'a str,
    pub actual: &'a str,
    pub sprint_number: &'a str,
}

/// Build the custom-field payload of a duplicate.
///
/// The expected cost carries forward as `max(expected - actual, 0)` and is
/// always present. The actual cost and the sprint number are dropped. Every
/// other enum, text or number field is copied; unset enums are skipped.
pub fn reconcile_custom_fields(
    fields: &[CustomFieldValue],
    ids: CostFields<'_>,
) -> Result<BTreeMap<String, FieldValue>, ReconcileError> {
    let mut out = BTreeMap::new();
    let mut expected = 0.0_f64;
    let mut actual = 0.0_f64;

    for field in fields {
        if field.gid == ids.expected {
            if let Some(value) = field.number_value {
                expected = value;
            }
        } else if field.gid == ids.actual {
            if let Some(value) = field.number_value {
                actual = value;
            }
        } else if field.gid == ids.sprint_number {
            continue;
        } else {
            match &field.kind {
                FieldKind::Enum => {
                    if let Some(option) = &field.enum_value {
                        out.insert(field.gid.clone(), FieldValue::Option(option.gid.clone()));
                    }
                }
                FieldKind::Text => {
                    out.insert(field.gid.clone(), FieldValue::Text(field.text_value.clone()));
                }
                FieldKind::Number => {
                    out.insert(field.gid.clone(), FieldValue::Number(field.number_value));
                }
                FieldKind::Other(kind) => {
                    return Err(ReconcileError::UnknownFieldKind {
                        field: field.gid.clone(),
                        kind: kind.clone(),
                    });
                }
            }
        }
    }

    let remaining = if actual < expected {
        expected - actual
    } else {
        0.0
    };
    out.insert(ids.expected.to_string(), FieldValue::Number(Some(remaining)));
    Ok(out)
}
