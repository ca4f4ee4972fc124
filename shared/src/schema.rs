use crate::error::{ApiError, FieldErrors};
use serde_json::{Map, Value};

/// Wire type accepted for a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    StringArray,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Number => "a number",
            FieldType::Boolean => "a boolean",
            FieldType::StringArray => "an array of strings",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty, required: true }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty, required: false }
    }
}

/// Statically declared validation schema for one resource kind.
#[derive(Debug)]
pub struct EntitySchema {
    /// Document kind prefix used as the store partition ("BUILDER").
    pub kind: &'static str,
    /// Human label used in error messages ("Builder").
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
    /// Numeric counters defaulted to 0 when omitted on create.
    pub counters: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// All required fields must be present (POST).
    Full,
    /// Every field optional, supplied ones still type-checked (PATCH).
    Partial,
}

/// Check `payload` against `schema`, returning the declared fields only.
/// Unknown keys are dropped; null is treated as absent.
pub fn validate(
    schema: &EntitySchema,
    payload: &Value,
    mode: ValidationMode,
) -> Result<Map<String, Value>, ApiError> {
    let object = payload.as_object().ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.insert("body".to_string(), "must be a JSON object".to_string());
        ApiError::validation(errors)
    })?;

    let mut errors = FieldErrors::new();
    let mut out = Map::new();

    for field in schema.fields {
        match object.get(field.name) {
            None | Some(Value::Null) => {
                if field.required && mode == ValidationMode::Full {
                    errors.insert(field.name.to_string(), "is required".to_string());
                }
            }
            Some(value) if field.ty.matches(value) => {
                out.insert(field.name.to_string(), value.clone());
            }
            Some(_) => {
                errors.insert(
                    field.name.to_string(),
                    format!("must be {}", field.ty.describe()),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(ApiError::validation(errors))
    }
}

use FieldType::{Boolean, Number, String as Str, StringArray};

pub static BUILDER: EntitySchema = EntitySchema {
    kind: "BUILDER",
    label: "Builder",
    fields: &[
        FieldSpec::required("companyName", Str),
        FieldSpec::required("type", Str),
        FieldSpec::required("yearsActive", Number),
        FieldSpec::required("registeredAddress", Str),
        FieldSpec::required("cin", Str),
        FieldSpec::required("gst", Str),
        FieldSpec::required("website", Str),
        FieldSpec::required("contactPerson", Str),
        FieldSpec::required("email", Str),
        FieldSpec::required("phone", Str),
        FieldSpec::required("regions", StringArray),
        FieldSpec::required("overview", Str),
        FieldSpec::required("keyProjects", StringArray),
        FieldSpec::optional("logo", Str),
        FieldSpec::optional("verified", Boolean),
        FieldSpec::optional("rating", Number),
        FieldSpec::optional("totalProjects", Number),
    ],
    counters: &[],
};

pub static PROJECT: EntitySchema = EntitySchema {
    kind: "PROJECT",
    label: "Project",
    fields: &[
        FieldSpec::required("title", Str),
        FieldSpec::required("builderName", Str),
        FieldSpec::optional("builderId", Str),
        FieldSpec::required("city", Str),
        FieldSpec::required("location", Str),
        FieldSpec::required("stage", Str),
        FieldSpec::required("priceRange", Str),
        FieldSpec::required("expectedYield", Str),
        FieldSpec::required("configurations", Str),
        FieldSpec::required("area", Str),
        FieldSpec::required("possession", Str),
        FieldSpec::required("reraNumber", Str),
        FieldSpec::optional("type", Str),
        FieldSpec::optional("totalUnits", Number),
        FieldSpec::optional("availableUnits", Number),
        FieldSpec::optional("amenities", StringArray),
        FieldSpec::optional("highlights", StringArray),
        FieldSpec::optional("images", StringArray),
        FieldSpec::optional("brochure", Str),
        FieldSpec::optional("featured", Boolean),
        FieldSpec::optional("views", Number),
        FieldSpec::optional("inquiries", Number),
    ],
    counters: &["views", "inquiries"],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder_payload() -> Value {
        json!({
            "companyName": "Acme",
            "type": "developer",
            "yearsActive": 5,
            "registeredAddress": "12 MG Road",
            "cin": "U12345MH2010PTC111111",
            "gst": "27AAAAA0000A1Z5",
            "website": "https://acme.example",
            "contactPerson": "A",
            "email": "a@x.com",
            "phone": "123",
            "regions": ["west"],
            "overview": "...",
            "keyProjects": [],
        })
    }

    #[test]
    fn full_validation_accepts_complete_payload() {
        let out = validate(&BUILDER, &builder_payload(), ValidationMode::Full).unwrap();
        assert_eq!(out.get("companyName").unwrap(), "Acme");
        assert_eq!(out.get("yearsActive").unwrap(), 5);
        assert!(out.get("verified").is_none());
    }

    #[test]
    fn full_validation_reports_missing_required_fields() {
        let mut payload = builder_payload();
        payload.as_object_mut().unwrap().remove("companyName");
        payload.as_object_mut().unwrap().remove("regions");

        let err = validate(&BUILDER, &payload, ValidationMode::Full).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors.get("companyName").unwrap(), "is required");
                assert_eq!(errors.get("regions").unwrap(), "is required");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn type_mismatches_are_reported_per_field() {
        let mut payload = builder_payload();
        payload["yearsActive"] = json!("five");
        payload["regions"] = json!(["west", 7]);

        let err = validate(&BUILDER, &payload, ValidationMode::Full).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors.get("yearsActive").unwrap(), "must be a number");
                assert_eq!(errors.get("regions").unwrap(), "must be an array of strings");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn partial_validation_skips_missing_but_checks_supplied() {
        let out = validate(&PROJECT, &json!({"featured": true}), ValidationMode::Partial).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("featured").unwrap(), true);

        let err =
            validate(&PROJECT, &json!({"totalUnits": "many"}), ValidationMode::Partial).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors.get("totalUnits").unwrap(), "must be a number");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_keys_are_stripped() {
        let mut payload = builder_payload();
        payload["adminOverride"] = json!(true);
        let out = validate(&BUILDER, &payload, ValidationMode::Full).unwrap();
        assert!(out.get("adminOverride").is_none());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = validate(&BUILDER, &json!([1, 2]), ValidationMode::Full).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors.get("body").unwrap(), "must be a JSON object");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
