//! Compile command implementation
//!
//! Every procedure file is compiled independently on the rayon pool; a
//! failing file produces no output and does not stop the others.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use pluto_core::{CompilerConfig, GrammarRegistry, compile_with};
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::Session;
use crate::output::{CompileSummary, print_failure, print_success};

/// Extension of procedure source files
pub const SOURCE_EXTENSION: &str = "pluto";

/// Result of compiling one file
struct FileOutcome {
    source: PathBuf,
    result: anyhow::Result<Generated>,
}

enum Generated {
    Written(PathBuf),
    Text(String),
}

/// Compile command implementation
pub fn compile_command(
    paths: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    name: Option<String>,
    stdout: bool,
    quiet: bool,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let first = paths.first().map(PathBuf::as_path).unwrap_or(Path::new("."));
    let session = Session::load(config_path.as_deref(), first)?;
    let registry = session.registry()?;

    let files = discover_files(&paths)?;
    if files.is_empty() {
        bail!("No .{SOURCE_EXTENSION} files found");
    }
    if name.is_some() && files.len() > 1 {
        bail!("--name can only be used with a single procedure file");
    }
    info!("Compiling {} procedure file(s)", files.len());

    let output_dir = output_dir.or_else(|| session.config.output_directory().map(Path::to_path_buf));
    if let Some(dir) = &output_dir
        && !stdout
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let job = Job {
        registry,
        config: &session.config,
        output_dir: output_dir.as_deref(),
        name: name.as_deref(),
        stdout,
    };
    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|source| FileOutcome {
            source: source.clone(),
            result: job.run(source),
        })
        .collect();

    let mut summary = CompileSummary::default();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(Generated::Text(text)) => {
                summary.compiled += 1;
                print!("{text}");
            }
            Ok(Generated::Written(target)) => {
                summary.compiled += 1;
                if !quiet {
                    print_success(&outcome.source, target);
                }
            }
            Err(e) => {
                summary.failed += 1;
                print_failure(&outcome.source, e);
            }
        }
    }

    if !quiet && !stdout {
        summary.print();
    }
    if summary.failed > 0 {
        bail!("{} of {} procedure(s) failed to compile", summary.failed, summary.total());
    }
    Ok(())
}

/// Settings shared by every file of one invocation
struct Job<'a> {
    registry: &'a GrammarRegistry,
    config: &'a CompilerConfig,
    output_dir: Option<&'a Path>,
    name: Option<&'a str>,
    stdout: bool,
}

impl Job<'_> {
    fn run(&self, source_path: &Path) -> anyhow::Result<Generated> {
        let source = fs::read_to_string(source_path)
            .with_context(|| format!("Failed to read {}", source_path.display()))?;
        let name = self.procedure_name(source_path);
        debug!("Compiling {} as '{}'", source_path.display(), name);

        let generated = compile_with(self.registry, &source, &name)?;
        if self.stdout {
            return Ok(Generated::Text(generated));
        }

        let target = self.target_path(source_path);
        fs::write(&target, generated)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(Generated::Written(target))
    }

    /// Command line name, then the configured name, then the file stem
    fn procedure_name(&self, source_path: &Path) -> String {
        if let Some(name) = self.name {
            return name.to_string();
        }
        if let Some(name) = self
            .config
            .compiler
            .as_ref()
            .and_then(|c| c.procedure_name.as_deref())
        {
            return name.to_string();
        }
        source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.procedure_name().to_string())
    }

    fn target_path(&self, source_path: &Path) -> PathBuf {
        let file_name = source_path
            .with_extension(self.config.output_extension())
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        match self.output_dir {
            Some(dir) => dir.join(file_name),
            None => source_path.with_extension(self.config.output_extension()),
        }
    }
}

/// Expand directories into the procedure files below them
pub fn discover_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == SOURCE_EXTENSION))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("Path not found: {}", path.display());
        }
    }
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_files_walks_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("thermal");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("heater.pluto"), "").unwrap();
        fs::write(temp_dir.path().join("cooler.pluto"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let files = discover_files(&[temp_dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cooler.pluto", "heater.pluto"]);
    }

    #[test]
    fn test_discover_files_missing_path() {
        assert!(discover_files(&[PathBuf::from("does/not/exist.pluto")]).is_err());
    }

    #[test]
    fn test_target_path_uses_configured_extension() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{ "output": { "extension": "txt" } }"#).unwrap();
        let registry = GrammarRegistry::global().unwrap();
        let job = Job {
            registry,
            config: &config,
            output_dir: Some(Path::new("out")),
            name: None,
            stdout: false,
        };
        assert_eq!(
            job.target_path(Path::new("procs/heater.pluto")),
            PathBuf::from("out/heater.txt")
        );
        assert_eq!(job.procedure_name(Path::new("procs/heater.pluto")), "heater");
    }
}
