//! End-to-end compilation of procedures into Python

use pluto_core::export::ir::{Declaration, Statement};
use pluto_core::{ErrorKind, GrammarRegistry, compile, compile_to_ir};

const HEATER_PROCEDURE: &str = r#"procedure
  declare
    event Heater Ready described by "heater reached setpoint",
    variable Target Temp of type real
  end declare
  preconditions
    wait until value of Temperature of Heater >= 290 K timeout 5 min;
  end preconditions
  main
    Target Temp := 293.15 K;
    initiate and confirm Heater of Thermal with Level := 3, Mode := record Fast := TRUE end record end with refer by Heater Call;
    wait for event Heater Ready timeout 10 s raise event Heater Late;
    if Target Temp > 300 K then
      log "hot";
    else
      wait for 1 min 30 s;
    end if;
    initiate and confirm step Warm Up
      main
        Target Temp := Target Temp + 1 K;
      end main
    end step in case confirmed : continue not confirmed : raise event Heater Late end case;
  end main
  watchdog
    initiate and confirm step Guard main log Target Temp; end main end step;
  end watchdog
end procedure"#;

fn compile_main(statements: &str) -> String {
    let source = format!("procedure main {statements} end main end procedure");
    compile(&source, "test").unwrap()
}

#[test]
fn test_heater_procedure_snapshot() {
    let output = compile(HEATER_PROCEDURE, "heater_check").unwrap();
    insta::assert_snapshot!("heater_procedure", output);
}

#[test]
fn test_equality_becomes_python_comparison() {
    let output = compile_main("if Level = 2 then log 1; end if;");
    assert!(output.contains(
        "expression = lambda x: get_variable(caller, 'Level').value == ureg('2')"
    ));
}

#[test]
fn test_exclusive_or_and_negation() {
    let output = compile_main("log Ready XOR NOT Armed;");
    assert!(output.contains(
        "caller.log(lambda x: get_variable(caller, 'Ready').value ^ (not get_variable(caller, 'Armed').value))"
    ));
}

#[test]
fn test_absolute_time_becomes_datetime() {
    let output = compile_main("log 2024-03-04T10:11:12.0005Z;");
    assert!(output.contains("caller.log(lambda x: datetime(2024, 3, 4, 10, 11, 12, 500))"));

    let output = compile_main("log 2024-064T00:00:00Z;");
    assert!(output.contains("datetime(2024, 3, 4, 0, 0, 0, 0)"));
}

#[test]
fn test_invalid_absolute_time_is_rejected() {
    let err = compile("procedure main log 2023-02-29T00:00:00Z; end main end procedure", "test")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
}

#[test]
fn test_hexadecimal_constant() {
    let output = compile_main("Mask := 0x1F;");
    assert!(output.contains("caller.assignment('Mask', lambda x: int('0x1F', 16))"));
}

#[test]
fn test_wait_for_event_without_timeout() {
    let output = compile_main("wait for event Go;");
    assert!(output.contains("caller.wait_for_event(get_event(caller, 'Go'), timeout=None)"));
}

#[test]
fn test_wait_until_with_timeout() {
    let output = compile_main("wait until Ready = TRUE timeout 30 s;");
    assert!(output.contains(
        "caller.wait_until_expression(lambda x: get_variable(caller, 'Ready').value == True, timeout=lambda x: ureg('30s'))"
    ));
}

#[test]
fn test_nested_conditionals_have_distinct_keys() {
    let source = "procedure main \
        if Level > 1 then if Count > 2 then log 1; end if; else log 2; end if; \
        end main end procedure";
    let registry = GrammarRegistry::global().unwrap();
    let ir = compile_to_ir(registry, source, "nested").unwrap();

    let keys: Vec<&str> = ir.declarations.iter().map(Declaration::key).collect();
    let mut unique = keys.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(keys.len(), unique.len());
    assert_eq!(keys.len(), 4);

    // The outer conditional completes last and is the only main body entry
    assert_eq!(ir.procedure.bodies[0].statements, vec!["stmt_pos_15"]);
    let Some(Declaration::Statement {
        statement: Statement::Conditional { then_branch, .. },
        ..
    }) = ir.declarations.last()
    else {
        panic!("outer conditional is not the last declaration");
    };
    assert_eq!(then_branch, &vec!["stmt_pos_33".to_string()]);
}

#[test]
fn test_declarations_follow_source_order() {
    let output = compile_main("log 1; log 2; log 3;");
    let first = output.find("def stmt_pos_15").unwrap();
    let second = output.find("def stmt_pos_22").unwrap();
    let third = output.find("def stmt_pos_29").unwrap();
    let class = output.find("class Procedure_test(Procedure)").unwrap();
    assert!(first < second && second < third && third < class);
}

#[test]
fn test_unsupported_construct_produces_no_output() {
    let err = compile(
        "procedure main while Running do log 1; end while; end main end procedure",
        "loop",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(err.to_string().contains("while_statement"));
}

#[test]
fn test_syntax_error_is_a_parse_error() {
    let err = compile("procedure main log 1 end main end procedure", "broken").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_string_constants_become_python_literals() {
    let output = compile_main(r#"log "C:\"; log "two\nlines", "first
second";"#);
    assert!(output.contains(r#"caller.log(lambda x: "C:\\")"#));
    assert!(output.contains(r#"caller.log(lambda x: "two\\nlines", lambda x: "first\nsecond")"#));
}

#[test]
fn test_event_description_is_escaped() {
    let source = r#"procedure
  declare event Done described by "path C:\temp\"
  end declare
  main log 1; end main
end procedure"#;
    let output = compile(source, "test").unwrap();
    assert!(output.contains(r#"caller.event_declaration('Done', "path C:\\temp\\")"#));
}

#[test]
fn test_names_sharing_words_with_keywords() {
    let output = compile_main("Start time := 5; log Tank data;");
    assert!(output.contains("caller.assignment('Start time', lambda x: ureg('5'))"));
    assert!(output.contains("caller.log(lambda x: get_variable(caller, 'Tank data').value)"));
}

#[test]
fn test_mission_specific_function_is_unsupported() {
    let source = "procedure main log Check Limit(1); end main end procedure";
    let err = compile(source, "test").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(err.to_string().contains("NONSTANDARD_FUNCTION_NAME"), "{err}");

    let output = compile_main("log sqrt(4);");
    assert!(output.contains("caller.log(lambda x: sqrt(ureg('4')))"));
}
