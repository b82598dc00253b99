//! Prism semantic analysis: types, scopes, and the checker.

pub mod checker;
pub mod constant;
pub mod errors;
pub mod scope;
pub mod semantic_info;
pub mod type_arena;

pub use checker::{check, Checker};
pub use constant::{ConstError, ConstValue};
pub use errors::SemanticError;
pub use scope::{ResolveState, Scope, ScopeArena, ScopeId, Symbol, SymbolId, SymbolKind};
pub use semantic_info::{AddressMode, SemanticInfo, TypeAndValue};
pub use type_arena::{StructField, TypeArena, TypeId, TypeIdVec, TypeKind, TypeProperties};

#[cfg(test)]
mod tests {
    use prism_frontend::{scan_file, Parser, SourceFile};

    use crate::constant::ConstValue;
    use crate::scope::SymbolKind;
    use crate::semantic_info::AddressMode;
    use crate::type_arena::{TypeId, TypeKind};

    fn check(src: &str) -> (crate::SemanticInfo, Vec<prism_frontend::Diagnostic>) {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, lex_errors) = scan_file(&file);
        assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_file();
        assert!(!parser.has_errors(), "parse errors: {:?}", parser.take_errors());
        crate::check(&ast)
    }

    fn check_ok(src: &str) -> crate::SemanticInfo {
        let (info, diags) = check(src);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:#?}");
        info
    }

    fn check_errors(src: &str) -> Vec<String> {
        let (_, diags) = check(src);
        diags.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn constant_folding_on_declaration() {
        let info = check_ok("const x int = 1 + 2 * 3\n");
        let sym = info
            .scopes
            .find(info.global_scope, "x")
            .expect("symbol x exists");
        let tv = info.type_of_symbol(sym).expect("x resolved");
        assert_eq!(tv.mode, AddressMode::Constant);
        assert_eq!(tv.ty, TypeId::INT);
        assert_eq!(tv.value, Some(ConstValue::Int(7)));
    }

    #[test]
    fn undeclared_identifier_reports_one_error() {
        let errors = check_errors("func k() int { return z }\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("undeclared identifier"), "{errors:?}");
    }

    #[test]
    fn cyclic_constants_report_a_cycle() {
        let errors = check_errors("const a int = b\nconst b int = a\n");
        assert!(
            errors.iter().any(|e| e.contains("cyclic dependency")),
            "{errors:?}"
        );
    }

    #[test]
    fn swizzle_types_resolve_to_interned_vectors() {
        let info = check_ok("func h(v f32x4) f32x2 { return v.xy }\n");
        let sym = info.scopes.find(info.global_scope, "h").unwrap();
        let tv = info.type_of_symbol(sym).unwrap();
        let TypeKind::Func { returns, .. } = info.types.kind(tv.ty) else {
            panic!("h is not a function");
        };
        assert_eq!(returns[0], TypeId::F32X2);
    }

    #[test]
    fn invalid_swizzle_is_rejected() {
        let errors = check_errors("func h(v f32x2) float32 { return v.z }\n");
        assert!(errors.iter().any(|e| e.contains("invalid swizzle")), "{errors:?}");
    }

    #[test]
    fn redefinition_reports_the_first_declaration() {
        let (_, diags) = check("const x = 1\nconst x = 2\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("redefinition"));
        assert_eq!(diags[0].notes.len(), 1);
        assert!(diags[0].notes[0].message.contains("first declared here"));
    }

    #[test]
    fn strong_alias_is_not_its_underlying_type() {
        let errors = check_errors(
            "type Celsius float32\nfunc f(c Celsius) float32 { return c }\n",
        );
        assert!(
            errors.iter().any(|e| e.contains("incorrect return type")),
            "{errors:?}"
        );
    }

    #[test]
    fn weak_alias_is_its_underlying_type() {
        check_ok("type Celsius = float32\nfunc f(c Celsius) float32 { return c }\n");
    }

    #[test]
    fn bitwise_on_float_is_rejected() {
        let errors = check_errors("func f(x float32) float32 { return x & x }\n");
        assert!(
            errors.iter().any(|e| e.contains("doesn't support bitwise operations")),
            "{errors:?}"
        );
    }

    #[test]
    fn modulus_on_float_is_rejected() {
        let errors = check_errors("func f(x float32) float32 { return x % x }\n");
        assert!(
            errors.iter().any(|e| e.contains("doesn't support modulus operations")),
            "{errors:?}"
        );
    }

    #[test]
    fn duplicate_case_values_are_rejected() {
        let errors = check_errors(
            "func f(x int) {\n  switch x {\n  case 1:\n  case 2 - 1:\n  }\n}\n",
        );
        assert!(
            errors.iter().any(|e| e.contains("duplicate case value '1'")),
            "{errors:?}"
        );
    }

    #[test]
    fn fallthrough_in_final_case_is_rejected() {
        let errors = check_errors(
            "func f(x int) {\n  switch x {\n  case 1:\n    fallthrough\n  }\n}\n",
        );
        assert!(
            errors.iter().any(|e| e.contains("final case")),
            "{errors:?}"
        );
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let errors = check_errors("func f() { break }\n");
        assert!(
            errors.iter().any(|e| e.contains("break statement not within")),
            "{errors:?}"
        );
    }

    #[test]
    fn if_condition_must_be_bool() {
        let errors = check_errors("func f(x int) { if x { } }\n");
        assert!(
            errors.iter().any(|e| e.contains("should be boolean")),
            "{errors:?}"
        );
    }

    #[test]
    fn define_then_use_in_block() {
        check_ok("func f() int {\n  x := 1\n  y := x + 2\n  return y\n}\n");
    }

    #[test]
    fn assignment_type_mismatch_has_notes() {
        let (_, diags) = check("func f() {\n  x := 1\n  x = 1.5\n}\n");
        let mismatch = diags
            .iter()
            .find(|d| d.message.contains("type mismatch in assignment"))
            .expect("mismatch diagnostic");
        assert_eq!(mismatch.notes.len(), 2);
    }

    #[test]
    fn call_arity_and_types_are_checked() {
        let errors = check_errors(
            "func g(x int) int { return x }\nfunc f() int { return g(1, 2) }\n",
        );
        assert!(
            errors.iter().any(|e| e.contains("expected 1 arguments, but found 2")),
            "{errors:?}"
        );

        let errors = check_errors(
            "func g(x int) int { return x }\nfunc f() int { return g(1.5) }\n",
        );
        assert!(
            errors.iter().any(|e| e.contains("incorrect argument type")),
            "{errors:?}"
        );
    }

    #[test]
    fn multi_return_fan_out() {
        check_ok(
            "func pair() (int, int) { return 1, 2 }\nfunc f() int {\n  a, b := pair()\n  return a + b\n}\n",
        );
    }

    #[test]
    fn reachable_symbols_in_declaration_order() {
        let info = check_ok("const a = 1\nconst b = 2\nfunc main() { }\n");
        let names: Vec<_> = info
            .reachable_symbols
            .iter()
            .map(|&id| info.scopes.symbol(id).name.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "main"]);
    }

    #[test]
    fn dependency_resolution_completes_the_dependee_first() {
        let info = check_ok("const a = b + 1\nconst b = 2\n");
        let names: Vec<_> = info
            .reachable_symbols
            .iter()
            .map(|&id| info.scopes.symbol(id).name.clone())
            .collect();
        // `b` finishes resolving while `a` is in flight.
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn checker_is_idempotent_per_expression() {
        let info = check_ok("const x int = 1 + 2\n");
        let sym = info.scopes.find(info.global_scope, "x").unwrap();
        assert!(matches!(
            info.scopes.symbol(sym).kind,
            SymbolKind::Const { .. }
        ));
        // Cached resolution: the stored value is final.
        let tv = info.type_of_symbol(sym).unwrap();
        assert_eq!(tv.value, Some(ConstValue::Int(3)));
    }

    #[test]
    fn embedded_struct_fields_resolve_through_strong_aliases() {
        check_ok(
            "type Base struct { depth float32 }\ntype Sprite struct {\n  x float32\n  Base\n}\nfunc f(s Sprite) float32 { return s.depth }\n",
        );
    }

    #[test]
    fn const_requires_constant_initialiser() {
        let errors = check_errors("var v int = 1\nconst c int = v\n");
        assert!(
            errors.iter().any(|e| e.contains("requires a constant expression")),
            "{errors:?}"
        );
    }

    #[test]
    fn named_results_allow_bare_return() {
        check_ok("func f() (result int) { return }\n");
    }

    #[test]
    fn division_by_zero_in_constant_is_an_error() {
        let errors = check_errors("const x = 1 / 0\n");
        assert!(
            errors.iter().any(|e| e.contains("division by zero")),
            "{errors:?}"
        );
    }
}
