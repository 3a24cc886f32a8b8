use std::collections::HashMap;

use crate::Entity;
use crate::KouraError;
use crate::KouraResult;

/// The names visible at a point in a template.
///
/// A context is a frame of local bindings layered over an optional parent
/// frame. Reads fall through to the parent; writes always land in the local
/// frame. A loop body renders against a [`child`](Context::child) so the loop
/// variable, and any `set` performed inside the body, disappear with the
/// iteration and never reach the parent.
#[derive(Debug, Clone, Default)]
pub struct Context<'parent> {
	entities: HashMap<String, Entity>,
	parent: Option<&'parent Context<'parent>>,
}

impl Context<'static> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a context from a JSON object whose keys become top-level names.
	pub fn from_json(value: serde_json::Value) -> KouraResult<Self> {
		let serde_json::Value::Object(map) = value else {
			return Err(KouraError::UnsupportedValue(value.to_string()));
		};

		let mut context = Self::new();
		for (name, value) in map {
			context.add_entity(name, Entity::try_from(value)?);
		}

		Ok(context)
	}
}

impl<'parent> Context<'parent> {
	/// Bind `name` in the local frame, shadowing any binding of the same name
	/// in a parent frame.
	pub fn add_entity(&mut self, name: impl Into<String>, value: impl Into<Entity>) {
		self.entities.insert(name.into(), value.into());
	}

	/// Builder style [`add_entity`](Context::add_entity).
	#[must_use]
	pub fn with_entity(mut self, name: impl Into<String>, value: impl Into<Entity>) -> Self {
		self.add_entity(name, value);
		self
	}

	/// Look up `name` in this frame and then in each parent frame.
	pub fn get_entity(&self, name: &str) -> Option<&Entity> {
		let mut frame = Some(self);

		while let Some(context) = frame {
			if let Some(entity) = context.entities.get(name) {
				return Some(entity);
			}

			frame = context.parent;
		}

		None
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get_entity(name).is_some()
	}

	/// Replace the value of an existing name. The new value is written to the
	/// local frame; a binding that lives in a parent frame is shadowed rather
	/// than modified. Returns `false` when `name` is not bound anywhere.
	pub fn set_entity(&mut self, name: &str, value: Entity) -> bool {
		if let Some(slot) = self.entities.get_mut(name) {
			*slot = value;
			return true;
		}

		if self.contains(name) {
			self.entities.insert(name.to_string(), value);
			return true;
		}

		false
	}

	/// Create an empty frame layered over this one.
	pub fn child(&self) -> Context<'_> {
		Context {
			entities: HashMap::new(),
			parent: Some(self),
		}
	}

	/// Names bound in the local frame only.
	pub fn local_names(&self) -> impl Iterator<Item = &str> {
		self.entities.keys().map(String::as_str)
	}
}
