//! Validation of backend configuration tables.
//!
//! Storage and notification backends receive their own raw TOML table from
//! the application config. Each backend describes the table it accepts with a
//! [`Schema`] and checks it before constructing itself.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has a value outside its allowed range or set.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// A string restricted to a fixed set of values.
	OneOf(&'static [&'static str]),
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a configuration schema.
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

	/// Attaches a custom validator that runs after the type check.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;

		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}

		Ok(())
	}
}

/// Required and optional fields of a backend configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	///
	/// Required fields must be present; optional fields are only checked when
	/// present. Keys the schema does not mention are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

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

fn type_mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(type_mismatch(field_name, "string", value));
			}
		},
		FieldType::OneOf(allowed) => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "string", value))?;

			if !allowed.contains(&s) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not one of {:?}", s, allowed),
				});
			}
		},
	}

	Ok(())
}

/// A configuration schema that can validate a backend's TOML table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> toml::Value {
		toml::Value::Table(s.parse::<toml::Table>().unwrap())
	}

	#[test]
	fn test_required_field_missing() {
		let schema = Schema::new(vec![Field::new("storage_path", FieldType::String)], vec![]);
		let err = schema.validate(&parse("")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "storage_path"));
	}

	#[test]
	fn test_optional_field_type_checked_when_present() {
		let schema = Schema::new(vec![], vec![Field::new("label", FieldType::String)]);
		assert!(schema.validate(&parse("")).is_ok());
		assert!(schema.validate(&parse("label = \"kitchen\"")).is_ok());
		assert!(matches!(
			schema.validate(&parse("label = 3")),
			Err(ValidationError::TypeMismatch { .. })
		));
	}

	#[test]
	fn test_one_of_rejects_unknown_value() {
		let schema = Schema::new(
			vec![Field::new("permission", FieldType::OneOf(&["granted", "denied"]))],
			vec![],
		);
		assert!(schema.validate(&parse("permission = \"denied\"")).is_ok());
		let err = schema.validate(&parse("permission = \"maybe\"")).unwrap_err();
		assert!(err.to_string().contains("maybe"));
	}

	#[test]
	fn test_custom_validator_runs_after_type_check() {
		let schema = Schema::new(
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(path) if !path.is_empty() => Ok(()),
					_ => Err("must not be empty".to_string()),
				}
			})],
			vec![],
		);

		assert!(schema.validate(&parse("storage_path = \"./data\"")).is_ok());
		let err = schema.validate(&parse("storage_path = \"\"")).unwrap_err();
		assert!(err.to_string().contains("must not be empty"));
		assert!(matches!(
			schema.validate(&parse("storage_path = 1")),
			Err(ValidationError::TypeMismatch { .. })
		));
	}
}
