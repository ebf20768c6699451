// Integration tests for the RuC front end

use pretty_assertions::assert_eq;
use rucfront::ast::{NodeId, NodeKind};
use rucfront::{compile, ErrorKind, FrontendOptions, Module, WarningKind};

fn compile_ok(source: &str) -> Module {
    let module = compile(source, &FrontendOptions::default()).expect("lexing failed");
    assert!(
        !module.had_errors(),
        "unexpected errors: {:?}",
        module.errors()
    );
    module
}

fn error_kinds(source: &str) -> Vec<ErrorKind> {
    let module = compile(source, &FrontendOptions::default()).expect("lexing failed");
    module.errors().iter().map(|e| e.kind.clone()).collect()
}

/// Expression under the `index`-th expression statement
fn statement_expression(module: &Module, index: usize) -> NodeId {
    let stmt = module.nodes_of(NodeKind::ExpressionStatement)[index];
    module.syntax.tree.nth_child(stmt, 0)
}

#[test]
fn test_declaration_and_assignment() {
    let source = r#"
        int main() {
            int x;
            x = 5;
            return 0;
        }
    "#;
    let module = compile_ok(source);
    let tree = &module.syntax.tree;

    let decls = module.nodes_of(NodeKind::VariableDeclaration);
    assert_eq!(decls.len(), 1);
    let x = tree.arg(decls[0], 0);

    let assign = statement_expression(&module, 0);
    assert_eq!(module.syntax.dump(assign), "Binary = : int rvalue\n  Identifier x : int lvalue\n  IntegerLiteral 5 : int rvalue\n");
    let target = tree.nth_child(assign, 0);
    assert_eq!(tree.arg(target, 2), x);
}

#[test]
fn test_int_to_float_assignment_widens() {
    let source = r#"
        int main() {
            int i = 5;
            float y;
            y = 5;
            y = i;
            return 0;
        }
    "#;
    let module = compile_ok(source);

    assert_eq!(
        module.syntax.dump(statement_expression(&module, 0)),
        "Binary = : float rvalue\n  Identifier y : float lvalue\n  FloatingLiteral 5.0 : float rvalue\n"
    );
    assert_eq!(
        module.syntax.dump(statement_expression(&module, 1)),
        "Binary = : float rvalue\n  Identifier y : float lvalue\n  Cast : float rvalue\n    Identifier i : int lvalue\n"
    );
}

#[test]
fn test_float_to_int_assignment_is_rejected() {
    let source = r#"
        int main() {
            int y;
            y = 5.0;
            return 0;
        }
    "#;
    let module = compile(source, &FrontendOptions::default()).unwrap();
    assert_eq!(module.errors().len(), 1);
    assert!(matches!(module.errors()[0].kind, ErrorKind::TypeMismatch { .. }));
    assert!(module.nodes_of(NodeKind::ExpressionStatement).is_empty());
}

#[test]
fn test_wrong_argument_count() {
    let source = r#"
        int f(int);
        int f(int a) { return a; }
        int main() {
            return f(1, 2);
        }
    "#;
    assert_eq!(
        error_kinds(source),
        vec![ErrorKind::WrongArgumentCount {
            expected: 1,
            found: 2
        }]
    );
}

#[test]
fn test_goto_resolves_to_label() {
    let source = r#"
        int main() {
            int i = 0;
            goto L;
            i = 1;
        L:
            return i;
        }
    "#;
    let module = compile_ok(source);
    let tree = &module.syntax.tree;

    let goto = module.nodes_of(NodeKind::Goto)[0];
    let label = module.nodes_of(NodeKind::Labeled)[0];
    assert_eq!(tree.arg(goto, 0), tree.arg(label, 0));
}

#[test]
fn test_break_outside_loop_continues_parsing() {
    let source = r#"
        int main() {
            break;
            y = 1;
            return 0;
        }
    "#;
    let errors = error_kinds(source);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], ErrorKind::BreakNotInLoopOrSwitch);
    assert!(matches!(&errors[1], ErrorKind::UndeclaredVariable { name } if name == "y"));
}

#[test]
fn test_full_program_dump() {
    let source = r#"
        int square(int n) {
            return n * n;
        }

        int main() {
            int total = 0;
            for (int i = 0; i < 3; i++)
                total += square(i);
            return total;
        }
    "#;
    let module = compile_ok(source);
    assert_eq!(
        module.dump(),
        "TranslationUnit
  FunctionDefinition square frame=1
    Compound
      Return
        Binary * : int rvalue
          Identifier n : int lvalue
          Identifier n : int lvalue
  FunctionDefinition main frame=2
    Compound
      VariableDeclaration total: int
        IntegerLiteral 0 : int rvalue
      For
        VariableDeclaration i: int
          IntegerLiteral 0 : int rvalue
        Binary < : bool rvalue
          Identifier i : int lvalue
          IntegerLiteral 3 : int rvalue
        Unary postfix ++ : int rvalue
          Identifier i : int lvalue
        ExpressionStatement
          Binary += : int rvalue
            Identifier total : int lvalue
            Call : int rvalue
              Identifier square : int(int) rvalue
              Identifier i : int lvalue
      Return
        Identifier total : int lvalue
"
    );
}

#[test]
fn test_russian_keywords() {
    let source = r#"
        цел сумма(цел а, цел б) {
            возврат а + б;
        }

        цел main() {
            вещ х = 1.5;
            если (х > 1) х = х * 2; иначе х = 0;
            пока (х < 100) х = х * 2;
            печатьф("%в\n", х);
            возврат сумма(1, 2);
        }
    "#;
    compile_ok(source);
}

#[test]
fn test_structs_and_pointers() {
    let source = r#"
        struct point {
            int x;
            int y;
        };

        int length(struct point *p) {
            return abs(p->x) + abs(p->y);
        }

        int main() {
            struct point a = {3, -4};
            struct point *p = &a;
            int *px = &a.x;
            *px = 1;
            p->y = 2;
            return length(p);
        }
    "#;
    let module = compile_ok(source);
    assert_eq!(module.nodes_of(NodeKind::Member).len(), 4);
}

#[test]
fn test_arrays_and_strings() {
    let source = r#"
        int main() {
            int a[] = {1, 2, 3};
            int m[2][3];
            char s[] = "hello";
            int i;
            for (i = 0; i < upb(a); i++)
                m[1][i] = a[i];
            printf("%s %i\n", s, m[1][2]);
            return 0;
        }
    "#;
    let module = compile_ok(source);
    assert_eq!(module.syntax.strings, vec!["hello".to_string(), "%s %i\n".to_string()]);
}

#[test]
fn test_printf_argument_checks() {
    let source = r#"
        int main() {
            printf("%i %f\n", 1);
            printf("%i\n", 2.5);
            printf("%q\n", 1);
            return 0;
        }
    "#;
    let errors = error_kinds(source);
    assert_eq!(errors.len(), 3);
    assert_eq!(
        errors[0],
        ErrorKind::PrintfArgumentCount {
            expected: 2,
            found: 1
        }
    );
    assert!(matches!(errors[1], ErrorKind::TypeMismatch { .. }));
    assert_eq!(errors[2], ErrorKind::PrintfUnknownSpecifier { specifier: 'q' });
}

#[test]
fn test_enum_and_switch() {
    let source = r#"
        enum color { RED, GREEN, BLUE };

        int score(enum color c) {
            switch (c) {
                case RED: return 1;
                case GREEN: return 2;
                default: return 3;
            }
        }

        int main() {
            return score(BLUE);
        }
    "#;
    let module = compile_ok(source);
    assert_eq!(module.nodes_of(NodeKind::Case).len(), 2);
}

#[test]
fn test_function_pointer_parameter() {
    let source = r#"
        float twice(float x) { return x * 2; }

        float apply(float (*g)(float), float v) {
            return g(g(v));
        }

        int main() {
            float r = apply(twice, 1.5);
            return 0;
        }
    "#;
    compile_ok(source);
}

#[test]
fn test_independent_errors_are_all_reported() {
    let source = r#"
        int main() {
            int a;
            a = undefined1;
            a = undefined2 + 1;
            a = 1 +;
            continue;
            return 0;
        }
    "#;
    let errors = error_kinds(source);
    assert_eq!(errors.len(), 4);
    assert!(matches!(&errors[0], ErrorKind::UndeclaredVariable { name } if name == "undefined1"));
    assert!(matches!(&errors[1], ErrorKind::UndeclaredVariable { name } if name == "undefined2"));
    assert!(matches!(errors[2], ErrorKind::ExpectedExpression { .. }));
    assert_eq!(errors[3], ErrorKind::ContinueNotInLoop);
}

#[test]
fn test_missing_main() {
    assert_eq!(
        error_kinds("int f() { return 1; }"),
        vec![ErrorKind::NoMainInProgram]
    );
}

#[test]
fn test_error_limit() {
    let source = r#"
        int a = x1;
        int b = x2;
        int c = x3;
        int main() { return 0; }
    "#;
    let options = FrontendOptions {
        max_errors: Some(1),
        ..FrontendOptions::default()
    };
    let module = compile(source, &options).unwrap();
    assert_eq!(module.errors().len(), 1);
}

#[test]
fn test_warnings() {
    let source = r#"
        struct empty { };
        int main() {
            float x = 1.5;
            if (x == 1.5) return 1;
            return 0;
        }
    "#;
    let module = compile_ok(source);
    let warnings: Vec<_> = module.warnings().iter().map(|w| w.kind.clone()).collect();
    assert_eq!(warnings, vec![WarningKind::EmptyStruct, WarningKind::FloatEquality]);

    let quiet = FrontendOptions {
        warnings: false,
        ..FrontendOptions::default()
    };
    assert!(compile(source, &quiet).unwrap().warnings().is_empty());
}

#[test]
fn test_lexical_error() {
    let result = compile("int main() { char c = 'x; }", &FrontendOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_deep_nesting_does_not_overflow() {
    let depth = 5000;
    let source = format!(
        "int main() {{ int x = {}1{}; return x; }}",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let module = compile_ok(&source);
    assert!(module.dump().contains("IntegerLiteral 1"));
}

#[test]
fn test_failed_declaration_is_reported_once() {
    let source = r#"
        int main() {
            void v;
            int y;
            y = v * 2;
            y = v;
            return y;
        }
    "#;
    assert_eq!(error_kinds(source), vec![ErrorKind::OnlyFunctionsMayHaveVoid]);
}

#[test]
fn test_empty_struct_variable_is_an_error() {
    let source = r#"
        int main() {
            struct {} v;
            int y;
            v = 1;
            y = 2;
            return y;
        }
    "#;
    let module = compile(source, &FrontendOptions::default()).unwrap();
    assert!(module.had_errors());
    assert!(matches!(
        &module.errors()[0].kind,
        ErrorKind::IncompleteType { what } if what == "'v'"
    ));
    assert_eq!(module.errors().len(), 1);
    assert_eq!(module.nodes_of(NodeKind::ExpressionStatement).len(), 1);
}

#[test]
fn test_enum_overflow_is_reported() {
    let source = r#"
        enum { A = 9223372036854775807, B };
        int main() { return 0; }
    "#;
    assert_eq!(
        error_kinds(source),
        vec![ErrorKind::EnumeratorOverflow {
            name: "B".to_string()
        }]
    );
}

#[test]
fn test_struct_member_bound_must_be_integer() {
    let source = r#"
        struct s { int a[1.5]; };
        int main() { return 0; }
    "#;
    let errors = error_kinds(source);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ErrorKind::ArraySizeMustBeInteger { .. }));
}
