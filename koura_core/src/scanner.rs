use std::fmt::Display;

use crate::KouraError;
use crate::KouraResult;
use crate::Location;

/// The two-character delimiters that open and close tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
	/// `{{`
	OutputOpen,
	/// `}}`
	OutputClose,
	/// `{%`
	ControlOpen,
	/// `%}`
	ControlClose,
}

impl Delimiter {
	pub fn as_str(self) -> &'static str {
		match self {
			Delimiter::OutputOpen => "{{",
			Delimiter::OutputClose => "}}",
			Delimiter::ControlOpen => "{%",
			Delimiter::ControlClose => "%}",
		}
	}
}

impl Display for Delimiter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// How deeply list literals and block tags may nest before rendering fails
/// with a syntax error instead of exhausting the stack.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A saved scanner position, restored with [`Scanner::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(Location);

impl Mark {
	pub fn offset(self) -> usize {
		self.0.offset
	}

	pub fn location(self) -> Location {
		self.0
	}
}

/// A rewindable character cursor over a template.
///
/// Every primitive works on the remaining input after the cursor. Lookahead
/// saves a [`Mark`] and resets to it, and loop bodies are re-scanned the same
/// way, so the whole template stays addressable for the duration of a render.
/// The cursor tracks its line and column as it moves so errors can point at
/// the offending tag.
#[derive(Debug, Clone)]
pub struct Scanner<'source> {
	source: &'source str,
	position: Location,
	depth: usize,
}

impl<'source> Scanner<'source> {
	pub fn new(source: &'source str) -> Self {
		Self {
			source,
			position: Location::start(),
			depth: 0,
		}
	}

	pub fn source(&self) -> &'source str {
		self.source
	}

	pub fn offset(&self) -> usize {
		self.position.offset
	}

	pub fn mark(&self) -> Mark {
		Mark(self.position)
	}

	pub fn reset(&mut self, mark: Mark) {
		self.position = mark.0;
	}

	/// The line and column of the cursor.
	pub fn location(&self) -> Location {
		self.position
	}

	/// The number of enclosing list literals and block tags.
	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Run `parse` one nesting level deeper. Fails once
	/// [`MAX_NESTING_DEPTH`] levels are open.
	pub fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> KouraResult<T>) -> KouraResult<T> {
		if self.depth >= MAX_NESTING_DEPTH {
			return Err(KouraError::syntax(
				format!("nesting too deep, at most {MAX_NESTING_DEPTH} levels are allowed"),
				self.location(),
			));
		}

		self.depth += 1;
		let result = parse(self);
		self.depth -= 1;

		result
	}

	pub fn is_eof(&self) -> bool {
		self.position.offset >= self.source.len()
	}

	fn rest(&self) -> &'source str {
		&self.source[self.position.offset..]
	}

	fn advance(&mut self, len: usize) {
		let skipped = &self.rest()[..len];
		self.position.advance_str(skipped);
	}

	pub fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}

	pub fn next_char(&mut self) -> Option<char> {
		let ch = self.peek()?;
		self.position.advance_char(ch);
		Some(ch)
	}

	pub fn starts_with(&self, text: &str) -> bool {
		self.rest().starts_with(text)
	}

	/// Consume `text` if the remaining input starts with it.
	pub fn eat(&mut self, text: &str) -> bool {
		if self.starts_with(text) {
			self.advance(text.len());
			true
		} else {
			false
		}
	}

	/// Consume characters while `predicate` holds and return them.
	pub fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'source str {
		let rest = self.rest();
		let len = rest
			.char_indices()
			.find(|(_, ch)| !predicate(*ch))
			.map_or(rest.len(), |(index, _)| index);
		self.advance(len);
		&rest[..len]
	}

	pub fn skip_whitespace(&mut self) {
		self.take_while(|ch| ch.is_ascii_whitespace());
	}

	/// Skip whitespace and return the next meaningful character without
	/// consuming it.
	pub fn peek_non_space(&mut self) -> Option<char> {
		self.skip_whitespace();
		self.peek()
	}

	/// Skip whitespace and read a maximal run of ASCII letters and
	/// underscores. Returns an empty string when there is none.
	pub fn read_identifier(&mut self) -> &'source str {
		self.skip_whitespace();
		self.take_while(|ch| ch.is_ascii_alphabetic() || ch == '_')
	}

	/// Like [`read_identifier`](Scanner::read_identifier) but an empty
	/// identifier is a syntax error naming `what` was expected.
	pub fn expect_identifier(&mut self, what: &str) -> KouraResult<&'source str> {
		let identifier = self.read_identifier();

		if identifier.is_empty() {
			return Err(self.unexpected(what));
		}

		Ok(identifier)
	}

	/// Read an identifier that must equal `keyword`.
	pub fn expect_keyword(&mut self, keyword: &str) -> KouraResult<()> {
		self.skip_whitespace();
		let start = self.mark();
		let identifier = self.read_identifier();

		if identifier != keyword {
			self.reset(start);
			return Err(self.unexpected(&format!("`{keyword}`")));
		}

		Ok(())
	}

	/// Find the next `{{` or `{%`, appending everything before it to `out`.
	/// The cursor stops immediately before the delimiter, which is returned.
	/// At the end of input everything is copied and `None` is returned.
	pub fn copy_literal_until_tag(&mut self, out: &mut String) -> Option<Delimiter> {
		let (literal, delimiter) = self.literal_until_tag();
		out.push_str(literal);
		delimiter
	}

	/// [`copy_literal_until_tag`](Scanner::copy_literal_until_tag) without
	/// the copy.
	pub fn skip_literal_until_tag(&mut self) -> Option<Delimiter> {
		self.literal_until_tag().1
	}

	fn literal_until_tag(&mut self) -> (&'source str, Option<Delimiter>) {
		let rest = self.rest();
		let bytes = rest.as_bytes();
		let mut search = 0;

		while let Some(found) = rest[search..].find('{') {
			let index = search + found;
			let delimiter = match bytes.get(index + 1) {
				Some(b'{') => Some(Delimiter::OutputOpen),
				Some(b'%') => Some(Delimiter::ControlOpen),
				_ => None,
			};

			if let Some(delimiter) = delimiter {
				self.advance(index);
				return (&rest[..index], Some(delimiter));
			}

			search = index + 1;
		}

		self.advance(rest.len());
		(rest, None)
	}

	/// Non-destructive lookahead: is the cursor at `{%` followed by a tag
	/// named `expected`? The cursor is restored whatever the outcome.
	pub fn probe_tag_name(&mut self, expected: &str) -> bool {
		self.probe_tag_names(&[expected]).is_some()
	}

	/// Non-destructive lookahead for any of `names`, returning the one found.
	pub fn probe_tag_names<'name>(&mut self, names: &[&'name str]) -> Option<&'name str> {
		let start = self.mark();
		let mut found = None;

		if self.eat(Delimiter::ControlOpen.as_str()) {
			let identifier = self.read_identifier();
			found = names.iter().copied().find(|name| *name == identifier);
		}

		self.reset(start);
		found
	}

	/// Skip whitespace and consume `delimiter`, failing with a syntax error
	/// when it is not next.
	pub fn consume_delimiter(&mut self, delimiter: Delimiter) -> KouraResult<()> {
		self.skip_whitespace();

		if self.eat(delimiter.as_str()) {
			Ok(())
		} else {
			Err(self.unexpected(&format!("`{delimiter}`")))
		}
	}

	/// Consume a whole `{% name %}` tag.
	pub fn consume_tag(&mut self, name: &str) -> KouraResult<()> {
		self.consume_delimiter(Delimiter::ControlOpen)?;
		self.expect_keyword(name)?;
		self.consume_delimiter(Delimiter::ControlClose)
	}

	/// Move the cursor just past the next `delimiter` without interpreting
	/// the tag body. Quoted strings are stepped over whole, so a delimiter
	/// inside `'...'` does not end the tag.
	pub fn skip_past(&mut self, delimiter: Delimiter) -> KouraResult<()> {
		loop {
			if self.eat(delimiter.as_str()) {
				return Ok(());
			}

			match self.peek() {
				Some('\'') => {
					let start = self.location();
					self.next_char();
					self.take_while(|ch| ch != '\'');

					if self.next_char().is_none() {
						return Err(KouraError::syntax("unterminated string literal", start));
					}
				}
				Some(_) => {
					self.next_char();
				}
				None => return Err(self.unexpected(&format!("`{delimiter}`"))),
			}
		}
	}

	/// A syntax error at the cursor describing what was expected and what was
	/// found instead.
	pub fn unexpected(&self, expected: &str) -> KouraError {
		let found = match self.peek() {
			Some(ch) => format!("`{ch}`"),
			None => "end of input".to_string(),
		};

		KouraError::syntax(
			format!("expected {expected}, found {found}"),
			self.location(),
		)
	}
}
