//! Configuration system for the PLUTO compiler
//!
//! Settings are read from a TOML or JSON file. When no path is given the
//! loader walks up from the working directory looking for, in order:
//!
//! - `.plutorc.json`
//! - `.plutorc.toml`
//! - `pluto.toml`
//! - `pluto.json`
//!
//! Missing sections and fields fall back to built-in defaults, so an empty
//! file is a valid configuration.
//!
//! ## Example Configuration
//!
//! ```json
//! {
//!   "compiler": { "procedureName": "heater_check" },
//!   "output": { "extension": "py", "directory": "generated" },
//!   "grammar": { "pluto": "grammars/pluto.grammar" }
//! }
//! ```

mod loader;
mod pluto_config;

pub use loader::{CONFIG_FILE_NAMES, ConfigLoader};
pub use pluto_config::{CompilerConfig, CompilerSection, GrammarSection, OutputSection};
