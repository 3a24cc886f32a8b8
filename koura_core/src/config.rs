use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::Context;
use crate::EngineOptions;
use crate::Entity;
use crate::KouraError;
use crate::KouraResult;
use crate::Object;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["koura.toml", ".koura.toml", ".config/koura.toml"];

/// Data source entry for a `[data]` namespace.
///
/// A plain path picks the format from the file extension:
///
/// ```toml
/// [data]
/// pkg = "package.json"
/// ```
///
/// Typed entries name the format explicitly:
///
/// ```toml
/// [data]
/// site = { path = "site-info", format = "yaml" }
/// ```
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum DataSource {
	Path(PathBuf),
	Typed(TypedDataSource),
}

impl DataSource {
	pub fn path(&self) -> &Path {
		match self {
			Self::Path(path) => path.as_path(),
			Self::Typed(typed) => typed.path.as_path(),
		}
	}

	/// The explicit format override, if any.
	pub fn format(&self) -> Option<&str> {
		match self {
			Self::Path(_) => None,
			Self::Typed(typed) => Some(typed.format.as_str()),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct TypedDataSource {
	pub path: PathBuf,
	pub format: String,
}

/// Configuration loaded from a `koura.toml` file.
///
/// ```toml
/// [data]
/// pkg = "package.json"
/// site = { path = "site", format = "yaml" }
///
/// [render]
/// chomp = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct KouraConfig {
	/// Map of namespace name to data file, relative to the config root.
	#[serde(default)]
	pub data: HashMap<String, DataSource>,
	/// Engine options.
	#[serde(default)]
	pub render: EngineOptions,
}

impl KouraConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is none.
	pub fn load(root: &Path) -> KouraResult<Option<KouraConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		Self::load_file(&config_path).map(Some)
	}

	pub fn load_file(path: &Path) -> KouraResult<KouraConfig> {
		let content = std::fs::read_to_string(path)?;
		toml::from_str(&content).map_err(|e| KouraError::ConfigParse(e.to_string()))
	}

	/// Load every data namespace into a fresh context. Paths are resolved
	/// against `root`.
	pub fn load_context(&self, root: &Path) -> KouraResult<Context<'static>> {
		let mut context = Context::new();
		let mut namespaces: Vec<_> = self.data.iter().collect();
		namespaces.sort_by(|a, b| a.0.cmp(b.0));

		for (namespace, source) in namespaces {
			let path = root.join(source.path());
			let entity = load_data_file(&path, source.format())?;
			context.add_entity(namespace.as_str(), entity);
		}

		Ok(context)
	}
}

/// Read a data file and convert it to an entity. The format is `format` when
/// given, otherwise the file extension.
pub fn load_data_file(path: &Path, format: Option<&str>) -> KouraResult<Entity> {
	let path_display = path.display().to_string();
	let content = std::fs::read_to_string(path).map_err(|e| {
		KouraError::DataFile {
			path: path_display.clone(),
			reason: e.to_string(),
		}
	})?;

	let format = format
		.map(str::to_string)
		.or_else(|| {
			path.extension()
				.and_then(|extension| extension.to_str())
				.map(str::to_string)
		})
		.unwrap_or_default()
		.trim()
		.to_ascii_lowercase();

	parse_data(&content, &format, &path_display)
}

/// Parse data content in the given format.
pub fn parse_data(content: &str, format: &str, path_display: &str) -> KouraResult<Entity> {
	let data_error = |reason: String| {
		KouraError::DataFile {
			path: path_display.to_string(),
			reason,
		}
	};

	match format {
		"text" | "txt" => Ok(Entity::Text(content.to_string())),
		"json" => {
			let value: serde_json::Value =
				serde_json::from_str(content).map_err(|e| data_error(e.to_string()))?;
			Entity::try_from(value)
		}
		"toml" => {
			let value: toml::Value =
				toml::from_str(content).map_err(|e| data_error(e.to_string()))?;
			Ok(toml_to_entity(value))
		}
		"yaml" | "yml" => {
			let value: serde_json::Value =
				serde_yaml_ng::from_str(content).map_err(|e| data_error(e.to_string()))?;
			Entity::try_from(value)
		}
		other => Err(KouraError::UnsupportedDataFormat(other.to_string())),
	}
}

fn toml_to_entity(value: toml::Value) -> Entity {
	match value {
		toml::Value::String(text) => Entity::Text(text),
		toml::Value::Integer(number) => Entity::from(number),
		toml::Value::Float(number) => Entity::from(number),
		toml::Value::Boolean(flag) => Entity::from(u32::from(flag)),
		toml::Value::Datetime(datetime) => Entity::Text(datetime.to_string()),
		toml::Value::Array(items) => {
			Entity::Sequence(items.into_iter().map(toml_to_entity).collect())
		}
		toml::Value::Table(table) => {
			Entity::Object(
				table
					.into_iter()
					.map(|(key, value)| (key, toml_to_entity(value)))
					.collect::<Object>(),
			)
		}
	}
}
