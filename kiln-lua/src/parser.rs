//! Build definition parser
//!
//! Evaluates a `kiln.lua` definition in the sandbox and overlays the returned
//! table onto [`BuildConfig::default`]. Every section is optional; a missing
//! section keeps its defaults. A `dependencies` array, when present, replaces
//! the default dependency set as a whole.

use anyhow::{Context, Result};
use kiln_core::domain::config::BuildConfig;
use kiln_core::domain::dependency::{Dependency, DependencyKind, DependencySet};
use kiln_core::domain::directive::{CapabilityCheck, TargetPlatform};
use mlua::{FromLua, Table};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::sandbox::create_sandbox;

/// Parse a build definition from Lua source code
///
/// # Example
/// ```no_run
/// use kiln_lua::parser::parse_build_definition;
///
/// let source = r#"
///     return pipeline.define({
///         name = "survey-processor",
///         trigger = { branch = "main" },
///         runtime = { version = "3.11" },
///         artifact = { name = "Survey_Processor" },
///     })
/// "#;
///
/// let config = parse_build_definition(source)?;
/// assert_eq!(config.trigger.primary_branch, "main");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_build_definition(source: &str) -> Result<BuildConfig> {
    let lua = create_sandbox().context("Failed to create definition sandbox")?;

    let definition: Table = lua
        .load(source)
        .set_name("kiln.lua")
        .eval()
        .context("Failed to evaluate build definition")?;

    let mut config = BuildConfig::default();

    if let Some(name) = opt::<String>(&definition, "name")? {
        config.name = name;
    }

    if let Some(trigger) = opt::<Table>(&definition, "trigger")? {
        parse_trigger(&trigger, &mut config)?;
    }

    if let Some(source_table) = opt::<Table>(&definition, "source")? {
        if let Some(repository) = opt::<String>(&source_table, "repository")? {
            config.source.repository = repository;
        }
    }

    if let Some(runtime) = opt::<Table>(&definition, "runtime")? {
        parse_runtime(&runtime, &mut config)?;
    }

    if let Some(dependencies) = opt::<Table>(&definition, "dependencies")? {
        config.dependencies = parse_dependencies(&dependencies)?;
    }

    if let Some(package) = opt::<Table>(&definition, "package")? {
        parse_package(&package, &mut config)?;
    }

    if let Some(artifact) = opt::<Table>(&definition, "artifact")? {
        if let Some(name) = opt::<String>(&artifact, "name")? {
            config.artifact_name = name;
        }
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid build definition: {}", e))?;

    debug!("Parsed build definition '{}'", config.name);

    Ok(config)
}

/// Read and parse a definition file
pub fn load_build_definition(path: &Path) -> Result<BuildConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read build definition: {}", path.display()))?;

    parse_build_definition(&source)
        .with_context(|| format!("Failed to load build definition: {}", path.display()))
}

/// Typed optional field; a present value of the wrong type is an error
fn opt<T: FromLua>(table: &Table, key: &str) -> Result<Option<T>> {
    table
        .get::<Option<T>>(key)
        .with_context(|| format!("Field '{}' has an invalid type", key))
}

fn string_list(table: &Table, key: &str) -> Result<Option<Vec<String>>> {
    let Some(list) = opt::<Table>(table, key)? else {
        return Ok(None);
    };

    let mut values = Vec::new();
    for value in list.sequence_values::<String>() {
        values.push(value.with_context(|| format!("Field '{}' must be an array of strings", key))?);
    }
    Ok(Some(values))
}

fn parse_trigger(trigger: &Table, config: &mut BuildConfig) -> Result<()> {
    if let Some(branch) = opt::<String>(trigger, "branch")? {
        config.trigger.primary_branch = branch;
    }
    if let Some(manual) = opt::<bool>(trigger, "manual")? {
        config.trigger.manual_dispatch = manual;
    }
    Ok(())
}

fn parse_runtime(runtime: &Table, config: &mut BuildConfig) -> Result<()> {
    let env = &mut config.environment;

    if let Some(version) = opt::<String>(runtime, "version")? {
        env.runtime_version = version;
    }
    if let Some(image) = opt::<String>(runtime, "image")? {
        env.image_repository = image;
    }
    if let Some(variant) = opt::<String>(runtime, "variant")? {
        env.os_variant = variant;
    }
    if let Some(interpreter) = opt::<String>(runtime, "interpreter")? {
        env.interpreter = interpreter;
    }
    Ok(())
}

fn parse_dependencies(list: &Table) -> Result<DependencySet> {
    let mut packages = Vec::new();

    for entry in list.sequence_values::<Table>() {
        let entry = entry.context("Failed to read dependency entry")?;

        let name: String = entry
            .get("name")
            .context("Dependency must have a 'name' field")?;

        let kind_str: String = entry
            .get("kind")
            .with_context(|| format!("Dependency '{}' must have a 'kind' field", name))?;

        let kind = DependencyKind::parse(&kind_str).ok_or_else(|| {
            anyhow::anyhow!("Dependency '{}' has unknown kind '{}'", name, kind_str)
        })?;

        let mut dependency = Dependency::new(name, kind);
        dependency.hidden_imports = string_list(&entry, "hidden_imports")?.unwrap_or_default();
        dependency.collect_all = opt::<bool>(&entry, "collect_all")?.unwrap_or(false);

        packages.push(dependency);
    }

    if packages.is_empty() {
        return Err(anyhow::anyhow!(
            "Field 'dependencies' must list at least one package"
        ));
    }

    Ok(DependencySet::new(packages))
}

fn parse_package(package: &Table, config: &mut BuildConfig) -> Result<()> {
    let directive = &mut config.directive;

    if let Some(script) = opt::<String>(package, "script")? {
        directive.script = PathBuf::from(script);
    }
    if let Some(onefile) = opt::<bool>(package, "onefile")? {
        directive.onefile = onefile;
    }
    if let Some(name) = opt::<String>(package, "name")? {
        directive.output_name = name;
    }
    if let Some(hidden) = string_list(package, "hidden_imports")? {
        directive.hidden_imports = hidden;
    }
    if let Some(collect) = string_list(package, "collect_all")? {
        directive.collect_all = collect;
    }

    if let Some(check) = opt::<String>(package, "capability_check")? {
        config.capability_check = match check.as_str() {
            "strict" => CapabilityCheck::Strict,
            "permissive" => CapabilityCheck::Permissive,
            other => {
                return Err(anyhow::anyhow!(
                    "Field 'capability_check' must be 'strict' or 'permissive', got '{}'",
                    other
                ));
            }
        };
    }

    if let Some(platform) = opt::<String>(package, "platform")? {
        config.platform = TargetPlatform::parse(&platform)
            .ok_or_else(|| anyhow::anyhow!("Unknown target platform '{}'", platform))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_definition_yields_defaults() {
        let config = parse_build_definition("return {}").unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let source = r#"
            return pipeline.define({
                name = "nightly",
                trigger = { branch = "release", manual = false },
                source = { repository = "https://git.example.com/survey.git" },
                runtime = { version = "3.12.2", variant = "slim" },
                package = { platform = "windows", capability_check = "permissive" },
                artifact = { name = "Survey_Processor_Nightly" },
            })
        "#;

        let config = parse_build_definition(source).unwrap();
        assert_eq!(config.name, "nightly");
        assert_eq!(config.trigger.primary_branch, "release");
        assert!(!config.trigger.manual_dispatch);
        assert_eq!(config.source.repository, "https://git.example.com/survey.git");
        assert_eq!(config.environment.runtime_version, "3.12.2");
        assert_eq!(
            config.environment.image(),
            "docker.io/library/python:3.12.2-slim"
        );
        assert_eq!(config.platform, TargetPlatform::Windows);
        assert_eq!(config.capability_check, CapabilityCheck::Permissive);
        assert_eq!(config.artifact_name, "Survey_Processor_Nightly");
        // untouched sections keep defaults
        assert_eq!(config.dependencies, DependencySet::default());
    }

    #[test]
    fn test_dependencies_replace_default_set() {
        let source = r#"
            return {
                dependencies = {
                    pipeline.dependency("numpy", "numeric-array"),
                    pipeline.dependency("pyreadstat", "statistical-file-format", {
                        hidden_imports = { "pyreadstat._readstat_parser" },
                        collect_all = true,
                    }),
                    { name = "pyinstaller", kind = "packaging-tool" },
                },
            }
        "#;

        let config = parse_build_definition(source).unwrap();
        assert_eq!(
            config.dependencies.names(),
            vec!["numpy", "pyreadstat", "pyinstaller"]
        );
        let pyreadstat = config.dependencies.get("pyreadstat").unwrap();
        assert_eq!(pyreadstat.hidden_imports, vec!["pyreadstat._readstat_parser"]);
        assert!(pyreadstat.collect_all);
    }

    #[test]
    fn test_unknown_dependency_kind() {
        let source = r#"
            return { dependencies = { { name = "rustc", kind = "compiler" } } }
        "#;
        let err = parse_build_definition(source).unwrap_err();
        assert!(err.to_string().contains("unknown kind"));
    }

    #[test]
    fn test_wrong_field_type() {
        let source = r#"return { trigger = { branch = { "main" } } }"#;
        let err = parse_build_definition(source).unwrap_err();
        assert!(err.to_string().contains("branch"));
    }

    #[test]
    fn test_invalid_definition_rejected_by_validation() {
        let source = r#"return { artifact = { name = "" } }"#;
        let err = parse_build_definition(source).unwrap_err();
        assert!(err.to_string().contains("Invalid build definition"));
    }

    #[test]
    fn test_parse_invalid_lua() {
        assert!(parse_build_definition("this is not valid lua!!!").is_err());
    }

    #[test]
    fn test_definition_not_returning_table() {
        assert!(parse_build_definition(r#"return "not a table""#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.lua");
        std::fs::write(&path, r#"return { name = "from-file" }"#).unwrap();

        let config = load_build_definition(&path).unwrap();
        assert_eq!(config.name, "from-file");

        let missing = load_build_definition(&dir.path().join("missing.lua"));
        assert!(missing.is_err());
    }
}
