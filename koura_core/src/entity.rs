use std::collections::HashMap;
use std::fmt::Display;

use derive_more::Deref;
use derive_more::DerefMut;
use float_cmp::approx_eq;

use crate::KouraError;
use crate::KouraResult;
use crate::Location;

/// The single dynamically typed value used throughout parsing and rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
	Text(String),
	Number(Number),
	Object(Object),
	Sequence(Vec<Entity>),
}

/// The variant tag of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
	Text,
	Number,
	Object,
	Sequence,
}

impl Display for EntityKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			EntityKind::Text => "text",
			EntityKind::Number => "number",
			EntityKind::Object => "object",
			EntityKind::Sequence => "sequence",
		};
		write!(f, "{name}")
	}
}

/// A numeric entity value. Equality is approximate (within 2 ulps) so values
/// that went through decimal parsing compare the way they read.
#[derive(Debug, Clone, Copy, Default)]
pub struct Number(pub f64);

impl Eq for Number {}
impl PartialEq for Number {
	fn eq(&self, other: &Self) -> bool {
		approx_eq!(f64, self.0, other.0, ulps = 2)
	}
}

impl Display for Number {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let value = self.0;
		// Integral values print without a fractional part.
		if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
			write!(f, "{}", value as i64)
		} else {
			write!(f, "{value}")
		}
	}
}

/// A mapping from field name to entity, addressed one level deep with
/// `object.field`.
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut)]
pub struct Object(
	#[deref]
	#[deref_mut]
	HashMap<String, Entity>,
);

impl Object {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder style insert.
	#[must_use]
	pub fn with(mut self, name: impl Into<String>, value: impl Into<Entity>) -> Self {
		self.0.insert(name.into(), value.into());
		self
	}
}

impl<K, V> FromIterator<(K, V)> for Object
where
	K: Into<String>,
	V: Into<Entity>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

impl Entity {
	pub fn kind(&self) -> EntityKind {
		match self {
			Entity::Text(_) => EntityKind::Text,
			Entity::Number(_) => EntityKind::Number,
			Entity::Object(_) => EntityKind::Object,
			Entity::Sequence(_) => EntityKind::Sequence,
		}
	}

	/// Convert this entity to the text written by an output tag. Numbers use
	/// their canonical decimal form; objects and sequences have no textual
	/// form.
	pub fn as_text(&self, location: Location) -> KouraResult<String> {
		match self {
			Entity::Text(text) => Ok(text.clone()),
			Entity::Number(number) => Ok(number.to_string()),
			Entity::Object(_) | Entity::Sequence(_) => {
				Err(KouraError::type_mismatch("text", self.kind(), location))
			}
		}
	}

	/// Whether this entity selects the first branch of an `if`.
	pub fn is_truthy(&self) -> bool {
		match self {
			Entity::Text(text) => !text.is_empty(),
			Entity::Number(number) => number.0 != 0.0,
			Entity::Object(object) => !object.is_empty(),
			Entity::Sequence(items) => !items.is_empty(),
		}
	}

	pub fn as_sequence(&self) -> Option<&[Entity]> {
		match self {
			Entity::Sequence(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&Object> {
		match self {
			Entity::Object(object) => Some(object),
			_ => None,
		}
	}
}

impl From<&str> for Entity {
	fn from(value: &str) -> Self {
		Entity::Text(value.to_string())
	}
}

impl From<String> for Entity {
	fn from(value: String) -> Self {
		Entity::Text(value)
	}
}

impl From<f64> for Entity {
	fn from(value: f64) -> Self {
		Entity::Number(Number(value))
	}
}

impl From<i64> for Entity {
	fn from(value: i64) -> Self {
		Entity::Number(Number(value as f64))
	}
}

impl From<i32> for Entity {
	fn from(value: i32) -> Self {
		Entity::Number(Number(f64::from(value)))
	}
}

impl From<u32> for Entity {
	fn from(value: u32) -> Self {
		Entity::Number(Number(f64::from(value)))
	}
}

impl From<usize> for Entity {
	fn from(value: usize) -> Self {
		Entity::Number(Number(value as f64))
	}
}

impl From<Number> for Entity {
	fn from(value: Number) -> Self {
		Entity::Number(value)
	}
}

impl From<Object> for Entity {
	fn from(value: Object) -> Self {
		Entity::Object(value)
	}
}

impl<T: Into<Entity>> From<Vec<T>> for Entity {
	fn from(value: Vec<T>) -> Self {
		Entity::Sequence(value.into_iter().map(Into::into).collect())
	}
}

impl TryFrom<serde_json::Value> for Entity {
	type Error = KouraError;

	fn try_from(value: serde_json::Value) -> KouraResult<Self> {
		use serde_json::Value;

		let entity = match value {
			Value::Null => return Err(KouraError::UnsupportedValue("null".to_string())),
			Value::Bool(flag) => Entity::from(u32::from(flag)),
			Value::Number(number) => {
				let Some(value) = number.as_f64() else {
					return Err(KouraError::UnsupportedValue(number.to_string()));
				};
				Entity::from(value)
			}
			Value::String(text) => Entity::Text(text),
			Value::Array(items) => {
				Entity::Sequence(
					items
						.into_iter()
						.map(Entity::try_from)
						.collect::<KouraResult<_>>()?,
				)
			}
			Value::Object(map) => {
				let mut object = Object::new();
				for (key, value) in map {
					object.insert(key, Entity::try_from(value)?);
				}
				Entity::Object(object)
			}
		};

		Ok(entity)
	}
}
