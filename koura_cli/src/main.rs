use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use koura_cli::KouraCli;
use koura_core::Context;
use koura_core::Engine;
use koura_core::config::KouraConfig;
use koura_core::config::load_data_file;
use miette::IntoDiagnostic;
use miette::NamedSource;
use miette::WrapErr;
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
	let args = KouraCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_logging(args.verbose, use_color);

	if let Err(report) = run(&args, use_color) {
		eprintln!("{report:?}");
		process::exit(2);
	}
}

/// Log to stderr so rendered output on stdout stays clean. `RUST_LOG` takes
/// precedence over `--verbose`.
fn init_logging(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(use_color)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

fn run(args: &KouraCli, use_color: bool) -> miette::Result<()> {
	let cwd = std::env::current_dir().into_diagnostic()?;
	let config = load_config(args, &cwd)?;

	let mut options = config
		.as_ref()
		.map(|(config, _)| config.render)
		.unwrap_or_default();
	if args.no_chomp {
		options.chomp = false;
	}

	let mut context = build_context(args, config.as_ref(), &cwd)?;
	let (name, template) = read_template(&args.template)?;
	let engine = Engine::with_options(options);

	let rendered = match engine.render(&template, &mut context) {
		Ok(rendered) => rendered,
		Err(error) => {
			return Err(miette::Report::new(error).with_source_code(NamedSource::new(name, template)));
		}
	};

	write_output(args.output.as_deref(), &rendered, use_color)
}

/// Load the config named by `--config`, or discover one in `cwd`. Returns the
/// config with the root its data paths are relative to.
fn load_config(args: &KouraCli, cwd: &Path) -> miette::Result<Option<(KouraConfig, PathBuf)>> {
	if let Some(path) = &args.config {
		let path = cwd.join(path);
		let root = path
			.parent()
			.map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
		let config = KouraConfig::load_file(&path)
			.wrap_err_with(|| format!("failed to load config `{}`", path.display()))?;
		debug!(path = %path.display(), "loaded config");

		return Ok(Some((config, root)));
	}

	let Some(path) = KouraConfig::resolve_path(cwd) else {
		debug!("no config file found");
		return Ok(None);
	};

	let config = KouraConfig::load_file(&path)
		.wrap_err_with(|| format!("failed to load config `{}`", path.display()))?;
	debug!(path = %path.display(), "discovered config");

	Ok(Some((config, cwd.to_path_buf())))
}

/// Config namespaces first, then `--data` files, then `--set` values. Later
/// entries replace earlier ones with the same name.
fn build_context(
	args: &KouraCli,
	config: Option<&(KouraConfig, PathBuf)>,
	cwd: &Path,
) -> miette::Result<Context<'static>> {
	let mut context = match config {
		Some((config, root)) => config.load_context(root)?,
		None => Context::new(),
	};

	for (namespace, path) in &args.data {
		let entity = load_data_file(&cwd.join(path), None)?;
		debug!(namespace = namespace.as_str(), path = %path.display(), "loaded data file");
		context.add_entity(namespace.as_str(), entity);
	}

	for (name, value) in &args.set {
		context.add_entity(name.as_str(), value.as_str());
	}

	Ok(context)
}

/// Returns the display name used in diagnostics along with the template text.
fn read_template(path: &Path) -> miette::Result<(String, String)> {
	if path == Path::new("-") {
		let mut template = String::new();
		std::io::stdin()
			.read_to_string(&mut template)
			.into_diagnostic()
			.wrap_err("failed to read template from stdin")?;

		return Ok(("<stdin>".to_string(), template));
	}

	let template = std::fs::read_to_string(path)
		.into_diagnostic()
		.wrap_err_with(|| format!("failed to read template `{}`", path.display()))?;

	Ok((path.display().to_string(), template))
}

fn write_output(output: Option<&Path>, rendered: &str, use_color: bool) -> miette::Result<()> {
	let Some(path) = output else {
		let mut stdout = std::io::stdout().lock();
		stdout.write_all(rendered.as_bytes()).into_diagnostic()?;
		return stdout.flush().into_diagnostic();
	};

	std::fs::write(path, rendered)
		.into_diagnostic()
		.wrap_err_with(|| format!("failed to write `{}`", path.display()))?;

	let label = "Rendered";
	if use_color {
		eprintln!("{} {}", label.green(), path.display());
	} else {
		eprintln!("{label} {}", path.display());
	}

	Ok(())
}
