use std::fmt::Display;

use tracing::trace;

use crate::Context;
use crate::Delimiter;
use crate::Engine;
use crate::Entity;
use crate::KouraError;
use crate::KouraResult;
use crate::Mark;
use crate::Scanner;
use crate::expression::parse_entity;
use crate::expression::parse_reference;
use crate::expression::resolve_reference;

pub const ELSE: &str = "else";
pub const END_FOR: &str = "endfor";
pub const END_IF: &str = "endif";
pub const END_UNLESS: &str = "endunless";

/// A user supplied control tag. The handler is called with the cursor just
/// after the tag name and must consume everything up to and including the
/// tag's closing `%}`.
pub type TagHandler = Box<
	dyn Fn(&Engine, &mut Scanner<'_>, &mut String, &mut Context<'_>) -> KouraResult<()>
		+ Send
		+ Sync,
>;

/// The built-in control tags, including the terminators that close them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
	For,
	If,
	Unless,
	Set,
	Else,
	EndFor,
	EndIf,
	EndUnless,
}

impl TagKind {
	pub const ALL: [TagKind; 8] = [
		TagKind::For,
		TagKind::If,
		TagKind::Unless,
		TagKind::Set,
		TagKind::Else,
		TagKind::EndFor,
		TagKind::EndIf,
		TagKind::EndUnless,
	];

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.name() == name)
	}

	pub fn name(self) -> &'static str {
		match self {
			TagKind::For => "for",
			TagKind::If => "if",
			TagKind::Unless => "unless",
			TagKind::Set => "set",
			TagKind::Else => ELSE,
			TagKind::EndFor => END_FOR,
			TagKind::EndIf => END_IF,
			TagKind::EndUnless => END_UNLESS,
		}
	}

	/// The terminator of a block tag, `None` for tags that stand alone.
	pub fn block_end(self) -> Option<&'static str> {
		match self {
			TagKind::For => Some(END_FOR),
			TagKind::If => Some(END_IF),
			TagKind::Unless => Some(END_UNLESS),
			TagKind::Set
			| TagKind::Else
			| TagKind::EndFor
			| TagKind::EndIf
			| TagKind::EndUnless => None,
		}
	}

	/// Whether this tag only closes or divides another block.
	pub fn is_terminator(self) -> bool {
		matches!(
			self,
			TagKind::Else | TagKind::EndFor | TagKind::EndIf | TagKind::EndUnless
		)
	}

	/// Whether the block opened by this tag may contain one `else`.
	pub fn accepts_else(self) -> bool {
		matches!(self, TagKind::If | TagKind::Unless)
	}
}

impl Display for TagKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}

/// Run the handler for a built-in tag. `start` marks the `{%` that opened it.
pub(crate) fn handle_builtin(
	kind: TagKind,
	engine: &Engine,
	scanner: &mut Scanner<'_>,
	out: &mut String,
	context: &mut Context<'_>,
	start: Mark,
) -> KouraResult<()> {
	match kind {
		TagKind::For => handle_for(engine, scanner, out, context, start),
		TagKind::If => handle_conditional(engine, scanner, out, context, start, false, END_IF),
		TagKind::Unless => {
			handle_conditional(engine, scanner, out, context, start, true, END_UNLESS)
		}
		TagKind::Set => handle_set(scanner, context),
		TagKind::Else | TagKind::EndFor | TagKind::EndIf | TagKind::EndUnless => {
			Err(stray_terminator(kind, start))
		}
	}
}

/// A terminator found where no open block expects it, including a second
/// `else` in the same block.
pub(crate) fn stray_terminator(kind: TagKind, start: Mark) -> KouraError {
	KouraError::syntax(
		format!("unexpected `{kind}` without a matching opening tag"),
		start.location(),
	)
}

pub(crate) fn unclosed(name: &str, start: Mark) -> KouraError {
	KouraError::syntax(
		format!("missing `{{% {name} %}}` before end of input"),
		start.location(),
	)
}

/// `{% for item in sequence %} body {% endfor %}`
///
/// The body is rendered once per element, each time from the same starting
/// mark and against a child context binding the loop variable.
fn handle_for(
	engine: &Engine,
	scanner: &mut Scanner<'_>,
	out: &mut String,
	context: &mut Context<'_>,
	start: Mark,
) -> KouraResult<()> {
	let variable = scanner.expect_identifier("a loop variable")?;
	scanner.expect_keyword("in")?;
	scanner.skip_whitespace();
	let source_location = scanner.location();
	let source = parse_entity(scanner, context)?;

	let Some(items) = source.as_sequence() else {
		return Err(KouraError::type_mismatch(
			"a sequence",
			source.kind(),
			source_location,
		));
	};

	engine.finish_tag(scanner)?;
	let body = scanner.mark();

	if items.is_empty() {
		trace!(variable, "skipping loop over empty sequence");
		if engine.skip_until(scanner, &[END_FOR])?.is_none() {
			return Err(unclosed(END_FOR, start));
		}
	}

	for (index, item) in items.iter().enumerate() {
		trace!(variable, index, "rendering loop iteration");
		scanner.reset(body);
		let mut iteration = context.child();
		iteration.add_entity(variable, item.clone());

		if engine
			.render_until(scanner, out, &mut iteration, &[END_FOR])?
			.is_none()
		{
			return Err(unclosed(END_FOR, start));
		}
	}

	scanner.consume_tag(END_FOR)
}

/// `{% if cond %} a {% else %} b {% endif %}` and its inverse `unless`.
///
/// The branch that is not taken is skipped without evaluating its tags.
fn handle_conditional(
	engine: &Engine,
	scanner: &mut Scanner<'_>,
	out: &mut String,
	context: &mut Context<'_>,
	start: Mark,
	negate: bool,
	end: &str,
) -> KouraResult<()> {
	let truthy = parse_entity(scanner, context)?.is_truthy();
	let taken = truthy != negate;
	trace!(taken, end, "evaluated condition");
	engine.finish_tag(scanner)?;

	let terminators = [ELSE, end];
	let found = if taken {
		engine.render_until(scanner, out, context, &terminators)?
	} else {
		engine.skip_until(scanner, &terminators)?
	};

	match found {
		None => return Err(unclosed(end, start)),
		Some(ELSE) => {
			scanner.consume_tag(ELSE)?;
			engine.chomp(scanner);

			let found = if taken {
				engine.skip_until(scanner, &[end])?
			} else {
				engine.render_until(scanner, out, context, &[end])?
			};

			if found.is_none() {
				return Err(unclosed(end, start));
			}
		}
		Some(_) => {}
	}

	scanner.consume_tag(end)
}

/// `{% set name expr %}` and `{% set name.field expr %}`.
///
/// The name must already be bound and the new value must have the same
/// variant as the current one.
fn handle_set(scanner: &mut Scanner<'_>, context: &mut Context<'_>) -> KouraResult<()> {
	let reference = parse_reference(scanner)?;
	let current = resolve_reference(&reference, context)?.kind();
	scanner.skip_whitespace();
	let value_location = scanner.location();
	let value = parse_entity(scanner, context)?.into_owned();

	if value.kind() != current {
		return Err(KouraError::type_mismatch(
			current.to_string(),
			value.kind(),
			value_location,
		));
	}

	let value = match reference.field {
		None => value,
		Some(field) => {
			// Resolving the reference above proved this is an object.
			let mut object = context
				.get_entity(reference.name)
				.and_then(Entity::as_object)
				.cloned()
				.unwrap_or_default();
			object.insert(field.to_string(), value);
			Entity::Object(object)
		}
	};

	trace!(name = reference.name, "assigning value");
	context.set_entity(reference.name, value);
	scanner.consume_delimiter(Delimiter::ControlClose)
}
