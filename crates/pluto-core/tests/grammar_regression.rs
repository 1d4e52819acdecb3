//! The checked-in internal grammars must stay derivable from the ISO EBNF

use pluto_core::grammar::{
    GrammarCompiler, GrammarRegistry, GrammarSources, PLUTO_EBNF, PLUTO_GRAMMAR, RewriteRules,
    UNITS_EBNF, UNITS_GRAMMAR, regenerate,
};
use pluto_core::{compile, compile_with};

#[test]
fn test_regenerated_grammars_match_checked_in_files() {
    let regenerated = regenerate(PLUTO_EBNF, UNITS_EBNF).unwrap();
    assert_eq!(regenerated.pluto, PLUTO_GRAMMAR);
    assert_eq!(regenerated.engineering_units, UNITS_GRAMMAR);
}

#[test]
fn test_units_conversion_is_idempotent() {
    let compiler = GrammarCompiler::new(RewriteRules::engineering_units()).unwrap();
    let once = compiler.convert(UNITS_EBNF).unwrap();
    assert_eq!(compiler.convert(&once).unwrap(), once);
}

#[test]
fn test_registry_from_regenerated_sources_compiles_identically() {
    let sources = regenerate(PLUTO_EBNF, UNITS_EBNF).unwrap();
    let registry = GrammarRegistry::from_sources(&sources).unwrap();
    let source = "procedure main Speed := 2.5 km/h; wait for 1 min 30 s; end main end procedure";

    assert_eq!(
        compile_with(&registry, source, "rover").unwrap(),
        compile(source, "rover").unwrap()
    );
}

#[test]
fn test_broken_grammar_source_is_rejected() {
    let sources = GrammarSources {
        pluto: "procedure_definition : \"procedure\" missing_rule\n".to_string(),
        ..GrammarSources::default()
    };
    assert!(GrammarRegistry::from_sources(&sources).is_err());
}
