//! Console reporting

use std::path::Path;

use colored::*;

/// Per-invocation compile statistics
#[derive(Debug, Clone, Default)]
pub struct CompileSummary {
    pub compiled: usize,
    pub failed: usize,
}

impl CompileSummary {
    pub fn total(&self) -> usize {
        self.compiled + self.failed
    }

    pub fn print(&self) {
        println!("\n{}", "Summary:".bold());
        println!("  Compiled: {}", self.compiled.to_string().green());
        if self.failed > 0 {
            println!("  Failed: {}", self.failed.to_string().red());
        }
    }
}

pub fn print_success(source: &Path, target: &Path) {
    println!(
        "{} {} -> {}",
        "✓".green(),
        source.display(),
        target.display().to_string().dimmed()
    );
}

pub fn print_failure(source: &Path, error: &anyhow::Error) {
    eprintln!("{} {}: {error:#}", "✗".red(), source.display().to_string().bold());
}
