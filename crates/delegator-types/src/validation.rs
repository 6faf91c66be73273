//! Validation of implementation-specific TOML tables.
//!
//! Wallet providers and gateways receive their own configuration table. Each
//! implementation describes the shape it expects with a [`Schema`] and the
//! factory rejects the table before anything is constructed.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while checking a configuration table.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	/// Qualifies the offending field with the name of its parent table.
	fn nested(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", parent, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
			other => other,
		}
	}

	fn mismatch(field: &str, expected: &str, value: &toml::Value) -> Self {
		ValidationError::TypeMismatch {
			field: field.to_string(),
			expected: expected.to_string(),
			actual: value.type_str().to_string(),
		}
	}
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// A string restricted to a fixed set of values.
	OneOf(&'static [&'static str]),
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Boolean,
	Array(Box<FieldType>),
	Table(Schema),
}

impl FieldType {
	fn check(&self, field: &str, value: &toml::Value) -> Result<(), ValidationError> {
		match self {
			FieldType::String => {
				if !value.is_str() {
					return Err(ValidationError::mismatch(field, "string", value));
				}
			},
			FieldType::OneOf(allowed) => {
				let s = value
					.as_str()
					.ok_or_else(|| ValidationError::mismatch(field, "string", value))?;
				if !allowed.contains(&s) {
					return Err(ValidationError::InvalidValue {
						field: field.to_string(),
						message: format!("'{}' is not one of {}", s, allowed.join(", ")),
					});
				}
			},
			FieldType::Integer { min, max } => {
				let n = value
					.as_integer()
					.ok_or_else(|| ValidationError::mismatch(field, "integer", value))?;
				if let Some(min) = min {
					if n < *min {
						return Err(ValidationError::InvalidValue {
							field: field.to_string(),
							message: format!("Value {} is less than minimum {}", n, min),
						});
					}
				}
				if let Some(max) = max {
					if n > *max {
						return Err(ValidationError::InvalidValue {
							field: field.to_string(),
							message: format!("Value {} is greater than maximum {}", n, max),
						});
					}
				}
			},
			FieldType::Boolean => {
				if !value.is_bool() {
					return Err(ValidationError::mismatch(field, "boolean", value));
				}
			},
			FieldType::Array(inner) => {
				let items = value
					.as_array()
					.ok_or_else(|| ValidationError::mismatch(field, "array", value))?;
				for (i, item) in items.iter().enumerate() {
					inner.check(&format!("{}[{}]", field, i), item)?;
				}
			},
			FieldType::Table(schema) => {
				schema.validate(value).map_err(|e| e.nested(field))?;
			},
		}
		Ok(())
	}
}

/// Custom check run after the type check passed.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		self.field_type.check(&self.name, value)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks presence of required fields, then the type and custom
	/// validator of every field that is present.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

/// Polymorphic validator handed out by implementations.
#[async_trait]
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("endpoint", FieldType::String)],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("on_sign", FieldType::OneOf(&["approve", "reject"])),
				Field::new(
					"limits",
					FieldType::Table(Schema::new(
						vec![Field::new("max", FieldType::Integer { min: None, max: None })],
						vec![],
					)),
				),
			],
		)
	}

	#[test]
	fn test_accepts_valid_table() {
		let value: toml::Value = toml::from_str(
			r#"
			endpoint = "http://localhost:8080"
			timeout_seconds = 30
			on_sign = "reject"
			"#,
		)
		.unwrap();
		assert!(schema().validate(&value).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let value: toml::Value = toml::from_str("timeout_seconds = 30").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "endpoint"));
	}

	#[test]
	fn test_out_of_range_integer() {
		let value: toml::Value = toml::from_str(
			r#"
			endpoint = "x"
			timeout_seconds = 0
			"#,
		)
		.unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { .. }));
	}

	#[test]
	fn test_one_of_rejects_unknown_value() {
		let value: toml::Value = toml::from_str(
			r#"
			endpoint = "x"
			on_sign = "maybe"
			"#,
		)
		.unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(err.to_string().contains("approve, reject"));
	}

	#[test]
	fn test_nested_table_errors_are_qualified() {
		let value: toml::Value = toml::from_str(
			r#"
			endpoint = "x"
			[limits]
			"#,
		)
		.unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "limits.max"));
	}
}
