use std::fmt::Display;

use miette::SourceSpan;

/// A location inside a template.
///
/// `line` and `column` are 1-indexed, `offset` is the 0-indexed byte offset
/// from the start of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Location {
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// The location of the first byte of a template.
	pub fn start() -> Self {
		Self::new(1, 1, 0)
	}

	/// Compute the location of `offset` within `source` by counting the lines
	/// that precede it. Offsets past the end are clamped to the end and
	/// offsets inside a multi-byte character to the start of that character.
	pub fn of(source: &str, offset: usize) -> Self {
		let mut location = Self::start();

		for (index, ch) in source.char_indices() {
			if index + ch.len_utf8() > offset {
				break;
			}

			location.advance_char(ch);
		}

		location
	}

	/// Move this location forward through `text`.
	pub fn advance_str(&mut self, text: &str) {
		for ch in text.chars() {
			self.advance_char(ch);
		}
	}

	pub fn advance_char(&mut self, ch: char) {
		if ch == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}

		self.offset += ch.len_utf8();
	}

	/// A zero-or-more byte span starting at this location, for diagnostics.
	pub fn span(&self, len: usize) -> SourceSpan {
		(self.offset, len).into()
	}
}

impl Display for Location {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}
