//! Multi-file configuration loading.
//!
//! A root file may pull in other files with `include`. Included files are
//! merged section by section; a top-level section defined twice is an error
//! rather than a silent override.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a root configuration file together with its includes.
pub struct ConfigLoader {
	/// Base directory for relative paths.
	base_path: PathBuf,
	/// Canonical paths already read, used to detect include cycles.
	loaded_files: HashSet<PathBuf>,
	/// Section name to the file that defined it.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads, merges and validates a configuration.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;
		let root_content = self.load_file(&config_path).await?;
		let mut root: toml::Value = toml::from_str(&root_content)?;

		let includes = Self::extract_includes(&root)?;
		if includes.is_empty() {
			return root_content.parse();
		}

		if let Some(table) = root.as_table_mut() {
			table.remove("include");
			for key in table.keys() {
				self.section_sources.insert(key.clone(), config_path.clone());
			}
		}

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let content = self.load_file(&include_path).await?;
			let included: toml::Value = toml::from_str(&content)?;
			self.merge(&mut root, included, &include_path)?;
		}

		let combined = toml::to_string(&root).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined.parse()
	}

	fn merge(
		&mut self,
		root: &mut toml::Value,
		included: toml::Value,
		source: &Path,
	) -> Result<(), ConfigError> {
		let toml::Value::Table(sections) = included else {
			return Ok(());
		};
		let Some(root_table) = root.as_table_mut() else {
			return Err(ConfigError::Validation(
				"Root configuration must be a table".into(),
			));
		};

		for (key, value) in sections {
			if let Some(existing) = self.section_sources.get(&key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing.display(),
					source.display()
				)));
			}
			self.section_sources.insert(key.clone(), source.to_path_buf());
			root_table.insert(key, value);
		}
		Ok(())
	}

	/// Reads a file once and expands environment references.
	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	/// Accepts `include = "a.toml"` or `include = ["a.toml", "b.toml"]`.
	fn extract_includes(root: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		match root.get("include") {
			None => Ok(Vec::new()),
			Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
			Some(toml::Value::Array(items)) => items
				.iter()
				.map(|item| {
					item.as_str().map(PathBuf::from).ok_or_else(|| {
						ConfigError::Validation("Include array must contain only strings".into())
					})
				})
				.collect(),
			Some(_) => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const GATEWAY: &str = r#"
[gateway]
primary = "fixed"
[gateway.implementations.fixed]
min_fee_a = 44
"#;

	const WALLET: &str = r#"
[wallet]
[wallet.providers.nami]
implementation = "mock"
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		let content = format!("[delegator]\nid = \"single\"\n{}{}", GATEWAY, WALLET);
		fs::write(&config_path, content).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();
		assert_eq!(config.delegator.id, "single");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		let root = r#"
include = ["gateway.toml", "wallet.toml"]
[delegator]
id = "split"
"#;
		fs::write(temp_dir.path().join("main.toml"), root).unwrap();
		fs::write(temp_dir.path().join("gateway.toml"), GATEWAY).unwrap();
		fs::write(temp_dir.path().join("wallet.toml"), WALLET).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();
		assert_eq!(config.delegator.id, "split");
		assert_eq!(config.gateway.primary, "fixed");
		assert!(config.wallet.providers.contains_key("nami"));
	}

	#[tokio::test]
	async fn test_single_string_include() {
		let temp_dir = TempDir::new().unwrap();
		let root = format!("include = \"wallet.toml\"\n[delegator]\nid = \"one\"\n{}", GATEWAY);
		fs::write(temp_dir.path().join("main.toml"), root).unwrap();
		fs::write(temp_dir.path().join("wallet.toml"), WALLET).unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml").to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.delegator.id, "one");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		let root = format!("include = [\"dup.toml\"]\n[delegator]\nid = \"a\"\n{}{}", GATEWAY, WALLET);
		fs::write(temp_dir.path().join("main.toml"), root).unwrap();
		fs::write(temp_dir.path().join("dup.toml"), "[delegator]\nid = \"b\"\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'delegator'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("self.toml"),
			"include = [\"self.toml\"]\n[delegator]\nid = \"loop\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("self.toml").await.unwrap_err();
		assert!(err.to_string().contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"absent.toml\"]\n[delegator]\nid = \"x\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
