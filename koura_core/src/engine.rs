use std::collections::HashMap;
use std::io::Read;
use std::io::Write;

use serde::Deserialize;
use tracing::debug;
use tracing::trace;

use crate::BuiltinFilter;
use crate::Context;
use crate::Delimiter;
use crate::FilterFn;
use crate::KouraError;
use crate::KouraResult;
use crate::Mark;
use crate::Scanner;
use crate::TagHandler;
use crate::TagKind;
use crate::expression::parse_entity;
use crate::tags::ELSE;
use crate::tags::handle_builtin;
use crate::tags::stray_terminator;
use crate::tags::unclosed;

/// Knobs that change how an [`Engine`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
	/// Swallow a single `\n` directly after the `%}` of a control tag so that
	/// a line holding only a control tag leaves no blank line behind. Output
	/// tags are never chomped.
	pub chomp: bool,
}

impl Default for EngineOptions {
	fn default() -> Self {
		Self { chomp: true }
	}
}

/// Renders templates against a [`Context`].
///
/// Built-in tags (`for`, `if`, `unless`, `set`) and filters (`capitalize`,
/// `upper`, `lower`, `trim`) are always available. Custom tags and filters are
/// registered through `&mut self`, rendering only needs `&self`, so nothing
/// can be registered while a render is in flight.
#[derive(Default)]
pub struct Engine {
	options: EngineOptions,
	tags: HashMap<String, TagHandler>,
	filters: HashMap<String, FilterFn>,
}

impl std::fmt::Debug for Engine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut tags: Vec<_> = self.tags.keys().collect();
		let mut filters: Vec<_> = self.filters.keys().collect();
		tags.sort();
		filters.sort();

		f.debug_struct("Engine")
			.field("options", &self.options)
			.field("tags", &tags)
			.field("filters", &filters)
			.finish()
	}
}

impl Engine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_options(options: EngineOptions) -> Self {
		Self {
			options,
			..Self::default()
		}
	}

	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	/// Register a handler for `{% name ... %}`. Built-in tag names are
	/// reserved; registering an existing custom name replaces it.
	pub fn register_custom_tag<F>(&mut self, name: impl Into<String>, handler: F) -> KouraResult<()>
	where
		F: Fn(&Engine, &mut Scanner<'_>, &mut String, &mut Context<'_>) -> KouraResult<()>
			+ Send
			+ Sync
			+ 'static,
	{
		let name = name.into();

		if TagKind::from_name(&name).is_some() {
			return Err(KouraError::ReservedName(name));
		}

		self.tags.insert(name, Box::new(handler));
		Ok(())
	}

	/// Register a filter usable as `{{ value | name }}`. Built-in filter names
	/// are reserved; registering an existing custom name replaces it.
	pub fn register_custom_filter<F>(&mut self, name: impl Into<String>, filter: F) -> KouraResult<()>
	where
		F: Fn(&str, &Context<'_>) -> String + Send + Sync + 'static,
	{
		let name = name.into();

		if BuiltinFilter::from_name(&name).is_some() {
			return Err(KouraError::ReservedName(name));
		}

		self.filters.insert(name, Box::new(filter));
		Ok(())
	}

	pub fn has_tag(&self, name: &str) -> bool {
		TagKind::from_name(name).is_some() || self.tags.contains_key(name)
	}

	pub fn has_filter(&self, name: &str) -> bool {
		BuiltinFilter::from_name(name).is_some() || self.filters.contains_key(name)
	}

	/// Render `template` and return the output.
	///
	/// Output is collected in memory, so a failed render returns only the
	/// error and never a partial result.
	pub fn render(&self, template: &str, context: &mut Context<'_>) -> KouraResult<String> {
		debug!(len = template.len(), "rendering template");
		let mut scanner = Scanner::new(template);
		let mut out = String::with_capacity(template.len());
		self.render_until(&mut scanner, &mut out, context, &[])?;
		debug!(len = out.len(), "rendered template");

		Ok(out)
	}

	/// Read a template from `input` and write the rendered result to
	/// `output`. Nothing is written when rendering fails.
	pub fn render_to(
		&self,
		mut input: impl Read,
		mut output: impl Write,
		context: &mut Context<'_>,
	) -> KouraResult<()> {
		let mut template = String::new();
		input.read_to_string(&mut template)?;
		let rendered = self.render(&template, context)?;
		output.write_all(rendered.as_bytes())?;
		output.flush()?;

		Ok(())
	}

	/// Copy literal text and process tags until the cursor reaches a control
	/// tag named in `terminators`, which is left unconsumed and returned.
	/// Returns `None` when the input runs out first.
	pub fn render_until<'t>(
		&self,
		scanner: &mut Scanner<'_>,
		out: &mut String,
		context: &mut Context<'_>,
		terminators: &[&'t str],
	) -> KouraResult<Option<&'t str>> {
		while let Some(delimiter) = scanner.copy_literal_until_tag(out) {
			if delimiter == Delimiter::ControlOpen {
				if let Some(found) = scanner.probe_tag_names(terminators) {
					return Ok(Some(found));
				}
			}

			self.process_tag(scanner, out, context)?;
		}

		Ok(None)
	}

	/// Move past a region without rendering it, stopping before a control tag
	/// named in `terminators`. Nested blocks are matched with their own
	/// terminators; no tag inside the region is evaluated. A built-in
	/// terminator that closes nothing is a syntax error, exactly as it is when
	/// the region is rendered.
	pub fn skip_until<'t>(
		&self,
		scanner: &mut Scanner<'_>,
		terminators: &[&'t str],
	) -> KouraResult<Option<&'t str>> {
		while let Some(delimiter) = scanner.skip_literal_until_tag() {
			if delimiter == Delimiter::OutputOpen {
				scanner.skip_past(Delimiter::OutputClose)?;
				continue;
			}

			if let Some(found) = scanner.probe_tag_names(terminators) {
				return Ok(Some(found));
			}

			let start = scanner.mark();
			scanner.consume_delimiter(Delimiter::ControlOpen)?;
			let kind = TagKind::from_name(scanner.read_identifier());

			if let Some(kind) = kind.filter(|kind| kind.is_terminator()) {
				return Err(stray_terminator(kind, start));
			}

			scanner.skip_past(Delimiter::ControlClose)?;

			if let Some(kind) = kind.filter(|kind| kind.block_end().is_some()) {
				scanner.nested(|scanner| self.skip_block(kind, scanner, start))?;
			}
		}

		Ok(None)
	}

	/// Skip the rest of a nested block whose opening tag has been consumed,
	/// up to and including its terminator.
	fn skip_block(&self, kind: TagKind, scanner: &mut Scanner<'_>, start: Mark) -> KouraResult<()> {
		let Some(end) = kind.block_end() else {
			return Ok(());
		};

		let mut found = if kind.accepts_else() {
			self.skip_until(scanner, &[ELSE, end])?
		} else {
			self.skip_until(scanner, &[end])?
		};

		if found == Some(ELSE) {
			scanner.consume_tag(ELSE)?;
			found = self.skip_until(scanner, &[end])?;
		}

		if found.is_none() {
			return Err(unclosed(end, start));
		}

		scanner.consume_tag(end)
	}

	/// Process the tag at the cursor, which must be at `{{` or `{%`.
	pub fn process_tag(
		&self,
		scanner: &mut Scanner<'_>,
		out: &mut String,
		context: &mut Context<'_>,
	) -> KouraResult<()> {
		let start = scanner.mark();

		if scanner.eat(Delimiter::OutputOpen.as_str()) {
			return self.handle_output_tag(scanner, out, context);
		}

		scanner.consume_delimiter(Delimiter::ControlOpen)?;
		scanner.skip_whitespace();
		let name_location = scanner.location();
		let name = scanner.expect_identifier("a tag name")?;

		// A control tag and everything it renders form one nesting level.
		scanner.nested(|scanner| {
			if let Some(kind) = TagKind::from_name(name) {
				trace!(tag = name, offset = start.offset(), "dispatching built-in tag");
				handle_builtin(kind, self, scanner, out, context, start)
			} else if let Some(handler) = self.tags.get(name) {
				trace!(tag = name, offset = start.offset(), "dispatching custom tag");
				handler(self, scanner, out, context)
			} else {
				Err(KouraError::unknown_tag(name, name_location))
			}
		})?;

		self.chomp(scanner);
		Ok(())
	}

	/// `{{ expr | filter | ... }}`
	fn handle_output_tag(
		&self,
		scanner: &mut Scanner<'_>,
		out: &mut String,
		context: &Context<'_>,
	) -> KouraResult<()> {
		scanner.skip_whitespace();
		let location = scanner.location();
		let text = parse_entity(scanner, context)?.as_text(location)?;
		let text = self.apply_filters(text, scanner, context)?;
		out.push_str(&text);

		scanner.consume_delimiter(Delimiter::OutputClose)
	}

	/// Run `text` through every `| name` that follows the cursor, left to
	/// right.
	pub fn apply_filters(
		&self,
		mut text: String,
		scanner: &mut Scanner<'_>,
		context: &Context<'_>,
	) -> KouraResult<String> {
		while scanner.peek_non_space() == Some('|') {
			scanner.next_char();
			scanner.skip_whitespace();
			let location = scanner.location();
			let name = scanner.expect_identifier("a filter name")?;

			text = if let Some(filter) = BuiltinFilter::from_name(name) {
				filter.apply(&text)
			} else if let Some(filter) = self.filters.get(name) {
				filter(&text, context)
			} else {
				return Err(KouraError::unknown_filter(name, location));
			};

			trace!(filter = name, "applied filter");
		}

		Ok(text)
	}

	/// Consume the `%}` that closes a control tag and chomp the newline after
	/// it. Handlers use this for delimiters inside their block, such as the end
	/// of an opening `for` tag; the final `%}` of a tag is chomped by the
	/// dispatcher.
	pub fn finish_tag(&self, scanner: &mut Scanner<'_>) -> KouraResult<()> {
		scanner.consume_delimiter(Delimiter::ControlClose)?;
		self.chomp(scanner);
		Ok(())
	}

	pub fn chomp(&self, scanner: &mut Scanner<'_>) {
		if self.options.chomp {
			scanner.eat("\n");
		}
	}
}

/// Render `template` with a default [`Engine`].
pub fn render(template: &str, context: &mut Context<'_>) -> KouraResult<String> {
	Engine::new().render(template, context)
}
