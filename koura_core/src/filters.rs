use std::fmt::Display;

use crate::Context;

/// A user supplied filter. The context is shared read-only so a filter can
/// consult values but never change what later tags see.
pub type FilterFn = Box<dyn Fn(&str, &Context<'_>) -> String + Send + Sync>;

/// Filters that are always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFilter {
	/// Uppercase the first character.
	Capitalize,
	Upper,
	Lower,
	Trim,
}

impl BuiltinFilter {
	pub const ALL: [BuiltinFilter; 4] = [
		BuiltinFilter::Capitalize,
		BuiltinFilter::Upper,
		BuiltinFilter::Lower,
		BuiltinFilter::Trim,
	];

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|filter| filter.name() == name)
	}

	pub fn name(self) -> &'static str {
		match self {
			BuiltinFilter::Capitalize => "capitalize",
			BuiltinFilter::Upper => "upper",
			BuiltinFilter::Lower => "lower",
			BuiltinFilter::Trim => "trim",
		}
	}

	pub fn apply(self, text: &str) -> String {
		match self {
			BuiltinFilter::Capitalize => capitalize(text),
			BuiltinFilter::Upper => text.to_uppercase(),
			BuiltinFilter::Lower => text.to_lowercase(),
			BuiltinFilter::Trim => text.trim().to_string(),
		}
	}
}

impl Display for BuiltinFilter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}

fn capitalize(text: &str) -> String {
	let mut chars = text.chars();

	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
