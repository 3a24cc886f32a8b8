use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render a text template with data from JSON, TOML and YAML files.",
	long_about = "koura renders text templates made of literal text, `{{ expr | filter }}` output \
	              tags and `{% tag %}` control tags.\n\nData comes from the `[data]` table of a \
	              `koura.toml` file, from `--data` files and from `--set` values. The rendered \
	              text is written to stdout or to `--output`.\n\nExamples:\n  koura readme.tpl \
	              --data pkg=package.json\n  koura notes.tpl --set name=world --output \
	              notes.txt\n  echo 'Hello {{ name }}' | koura - --set name=world"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct KouraCli {
	/// Path to the template file. Use `-` to read the template from stdin.
	pub template: PathBuf,

	/// Load a data file into a namespace, e.g. `--data pkg=package.json`.
	/// The format is chosen from the file extension. Can be repeated.
	#[arg(long, short, value_name = "NAMESPACE=FILE", value_parser = parse_data_arg)]
	pub data: Vec<(String, PathBuf)>,

	/// Bind a name to a text value, e.g. `--set title=Docs`. Can be repeated.
	#[arg(long, short, value_name = "NAME=VALUE", value_parser = parse_set_arg)]
	pub set: Vec<(String, String)>,

	/// Write the rendered output to this file instead of stdout.
	#[arg(long, short)]
	pub output: Option<PathBuf>,

	/// Path to a config file. Defaults to the first of `koura.toml`,
	/// `.koura.toml` and `.config/koura.toml` in the current directory.
	#[arg(long, short)]
	pub config: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, default_value_t = false)]
	pub no_color: bool,

	/// Keep the newline that directly follows a control tag.
	#[arg(long, default_value_t = false)]
	pub no_chomp: bool,
}

/// Parse a `NAME=VALUE` pair where `NAME` must be usable from a template.
pub fn parse_set_arg(input: &str) -> Result<(String, String), String> {
	let Some((name, value)) = input.split_once('=') else {
		return Err(format!("expected `NAME=VALUE`, found `{input}`"));
	};

	let name = name.trim();

	if name.is_empty() || !name.chars().all(|ch| ch.is_ascii_alphabetic() || ch == '_') {
		return Err(format!(
			"`{name}` is not a valid name, only ASCII letters and `_` are allowed"
		));
	}

	Ok((name.to_string(), value.to_string()))
}

/// Parse a `NAMESPACE=FILE` pair.
pub fn parse_data_arg(input: &str) -> Result<(String, PathBuf), String> {
	let (namespace, path) = parse_set_arg(input)?;

	if path.is_empty() {
		return Err(format!("missing data file path for `{namespace}`"));
	}

	Ok((namespace, PathBuf::from(path)))
}
