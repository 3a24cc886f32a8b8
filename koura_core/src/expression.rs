use std::borrow::Cow;

use crate::Context;
use crate::Entity;
use crate::KouraError;
use crate::KouraResult;
use crate::Location;
use crate::Scanner;

/// A parsed `name` or `name.field` reference, not yet resolved against a
/// context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'source> {
	pub name: &'source str,
	pub field: Option<&'source str>,
	/// Where `name` starts.
	pub location: Location,
	/// Where `field` starts, when present.
	pub field_location: Option<Location>,
}

/// Parse a named-entity reference: an identifier, optionally followed by a
/// single `.field`. A second `.` is rejected since field access is one level
/// deep.
pub fn parse_reference<'source>(scanner: &mut Scanner<'source>) -> KouraResult<Reference<'source>> {
	scanner.skip_whitespace();
	let location = scanner.location();
	let name = scanner.expect_identifier("an identifier")?;
	let mut reference = Reference {
		name,
		field: None,
		location,
		field_location: None,
	};

	if scanner.peek_non_space() != Some('.') {
		return Ok(reference);
	}

	scanner.next_char();
	scanner.skip_whitespace();
	reference.field_location = Some(scanner.location());
	reference.field = Some(scanner.expect_identifier("a field name")?);

	if scanner.peek_non_space() == Some('.') {
		return Err(KouraError::syntax(
			"nested field access is not supported",
			scanner.location(),
		));
	}

	Ok(reference)
}

/// Resolve a reference against `context`.
pub fn resolve_reference<'c>(
	reference: &Reference<'_>,
	context: &'c Context<'_>,
) -> KouraResult<&'c Entity> {
	let Some(entity) = context.get_entity(reference.name) else {
		return Err(KouraError::undefined_name(reference.name, reference.location));
	};

	let Some(field) = reference.field else {
		return Ok(entity);
	};

	let field_location = reference.field_location.unwrap_or(reference.location);
	let Entity::Object(object) = entity else {
		return Err(KouraError::type_mismatch(
			"an object",
			entity.kind(),
			reference.location,
		));
	};

	object
		.get(field)
		.ok_or_else(|| KouraError::missing_field(reference.name, field, field_location))
}

/// Parse a reference at the cursor and resolve it.
pub fn parse_named_entity<'c>(
	scanner: &mut Scanner<'_>,
	context: &'c Context<'_>,
) -> KouraResult<&'c Entity> {
	let reference = parse_reference(scanner)?;
	resolve_reference(&reference, context)
}

/// Parse the expression at the cursor into an entity.
///
/// The next non-whitespace character decides the form: `'` starts a string
/// literal, a digit a number literal, `[` a list literal, and anything else a
/// named reference. References borrow from the context, literals are owned.
pub fn parse_entity<'c>(
	scanner: &mut Scanner<'_>,
	context: &'c Context<'_>,
) -> KouraResult<Cow<'c, Entity>> {
	match scanner.peek_non_space() {
		Some('\'') => parse_string(scanner).map(Cow::Owned),
		Some(ch) if ch.is_ascii_digit() => parse_number(scanner).map(Cow::Owned),
		Some('[') => parse_list(scanner, context).map(Cow::Owned),
		Some(_) => parse_named_entity(scanner, context).map(Cow::Borrowed),
		None => Err(scanner.unexpected("an expression")),
	}
}

/// `'text'` with no escape sequences.
fn parse_string(scanner: &mut Scanner<'_>) -> KouraResult<Entity> {
	let start = scanner.location();
	scanner.next_char();
	let text = scanner.take_while(|ch| ch != '\'');

	if scanner.next_char().is_none() {
		return Err(KouraError::syntax("unterminated string literal", start));
	}

	Ok(Entity::Text(text.to_string()))
}

/// Digits with an optional fraction and exponent, e.g. `12`, `1.5`, `2e3`.
fn parse_number(scanner: &mut Scanner<'_>) -> KouraResult<Entity> {
	let start = scanner.mark();
	scanner.take_while(|ch| ch.is_ascii_digit());

	let fraction = scanner.mark();
	if scanner.eat(".") && scanner.take_while(|ch| ch.is_ascii_digit()).is_empty() {
		scanner.reset(fraction);
	}

	let exponent = scanner.mark();
	if scanner.eat("e") || scanner.eat("E") {
		if !scanner.eat("+") {
			scanner.eat("-");
		}

		if scanner.take_while(|ch| ch.is_ascii_digit()).is_empty() {
			scanner.reset(exponent);
		}
	}

	let literal = &scanner.source()[start.offset()..scanner.offset()];

	literal.parse::<f64>().map(Entity::from).map_err(|error| {
		KouraError::syntax(
			format!("invalid number `{literal}`: {error}"),
			start.location(),
		)
	})
}

/// `[expr, expr, ...]`. Elements are any expression, a trailing comma is
/// allowed. Each list opens a nesting level.
fn parse_list(scanner: &mut Scanner<'_>, context: &Context<'_>) -> KouraResult<Entity> {
	scanner.nested(|scanner| parse_list_items(scanner, context))
}

fn parse_list_items(scanner: &mut Scanner<'_>, context: &Context<'_>) -> KouraResult<Entity> {
	let start = scanner.location();
	scanner.next_char();
	let mut items = vec![];

	loop {
		match scanner.peek_non_space() {
			Some(']') => {
				scanner.next_char();
				break;
			}
			None => return Err(KouraError::syntax("unterminated list literal", start)),
			Some(_) => {}
		}

		items.push(parse_entity(scanner, context)?.into_owned());

		match scanner.peek_non_space() {
			Some(',') => {
				scanner.next_char();
			}
			Some(']') => {
				scanner.next_char();
				break;
			}
			None => return Err(KouraError::syntax("unterminated list literal", start)),
			Some(_) => return Err(scanner.unexpected("`,` or `]`")),
		}
	}

	Ok(Entity::Sequence(items))
}
