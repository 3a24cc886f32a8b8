use miette::Diagnostic;
use miette::SourceSpan;
use thiserror::Error;

use crate::EntityKind;
use crate::Location;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum KouraError {
	#[error(transparent)]
	#[diagnostic(code(koura::io_error))]
	Io(#[from] std::io::Error),

	#[error("syntax error at {location}: {message}")]
	#[diagnostic(code(koura::syntax))]
	Syntax {
		message: String,
		location: Location,
		#[label("{message}")]
		span: SourceSpan,
	},

	#[error("undefined name `{name}` at {location}")]
	#[diagnostic(
		code(koura::undefined_name),
		help("add `{name}` to the context before rendering")
	)]
	UndefinedName {
		name: String,
		location: Location,
		#[label("not found in the current context")]
		span: SourceSpan,
	},

	#[error("object `{object}` has no field `{field}` at {location}")]
	#[diagnostic(code(koura::missing_field))]
	MissingField {
		object: String,
		field: String,
		location: Location,
		#[label("unknown field")]
		span: SourceSpan,
	},

	#[error("type mismatch at {location}: expected {expected}, found {found}")]
	#[diagnostic(code(koura::type_mismatch))]
	TypeMismatch {
		expected: String,
		found: EntityKind,
		location: Location,
		#[label("this is {found}")]
		span: SourceSpan,
	},

	#[error("unknown tag `{name}` at {location}")]
	#[diagnostic(
		code(koura::unknown_tag),
		help("built-in tags: for, if, unless, set; register others with `Engine::register_custom_tag`")
	)]
	UnknownTag {
		name: String,
		location: Location,
		#[label("no handler registered for this tag")]
		span: SourceSpan,
	},

	#[error("unknown filter `{name}` at {location}")]
	#[diagnostic(
		code(koura::unknown_filter),
		help("built-in filters: capitalize, upper, lower, trim; register others with `Engine::register_custom_filter`")
	)]
	UnknownFilter {
		name: String,
		location: Location,
		#[label("no filter registered with this name")]
		span: SourceSpan,
	},

	#[error("`{0}` is a built-in name and cannot be registered again")]
	#[diagnostic(code(koura::reserved_name))]
	ReservedName(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(koura::config_parse),
		help("check that koura.toml is valid TOML with [data] and/or [render] sections")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(koura::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(koura::unsupported_format),
		help("supported formats: text, json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),

	#[error("value `{0}` has no entity equivalent")]
	#[diagnostic(
		code(koura::unsupported_value),
		help("entities are text, numbers, objects and sequences")
	)]
	UnsupportedValue(String),
}

impl KouraError {
	pub fn syntax(message: impl Into<String>, location: Location) -> Self {
		Self::Syntax {
			message: message.into(),
			location,
			span: location.span(1),
		}
	}

	pub fn undefined_name(name: impl Into<String>, location: Location) -> Self {
		let name = name.into();
		let span = location.span(name.len());
		Self::UndefinedName {
			name,
			location,
			span,
		}
	}

	pub fn missing_field(
		object: impl Into<String>,
		field: impl Into<String>,
		location: Location,
	) -> Self {
		let field = field.into();
		let span = location.span(field.len());
		Self::MissingField {
			object: object.into(),
			field,
			location,
			span,
		}
	}

	pub fn type_mismatch(
		expected: impl Into<String>,
		found: EntityKind,
		location: Location,
	) -> Self {
		Self::TypeMismatch {
			expected: expected.into(),
			found,
			location,
			span: location.span(1),
		}
	}

	pub fn unknown_tag(name: impl Into<String>, location: Location) -> Self {
		let name = name.into();
		let span = location.span(name.len());
		Self::UnknownTag {
			name,
			location,
			span,
		}
	}

	pub fn unknown_filter(name: impl Into<String>, location: Location) -> Self {
		let name = name.into();
		let span = location.span(name.len());
		Self::UnknownFilter {
			name,
			location,
			span,
		}
	}

	/// The template location this error points at, if it came from rendering.
	pub fn location(&self) -> Option<Location> {
		match self {
			Self::Syntax { location, .. }
			| Self::UndefinedName { location, .. }
			| Self::MissingField { location, .. }
			| Self::TypeMismatch { location, .. }
			| Self::UnknownTag { location, .. }
			| Self::UnknownFilter { location, .. } => Some(*location),
			_ => None,
		}
	}
}

pub type KouraResult<T> = Result<T, KouraError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
