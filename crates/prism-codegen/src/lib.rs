//! Lowering from the checked Prism AST to SPIR-V IR.

pub mod errors;
pub mod lower;

pub use errors::LowerError;
pub use lower::lower;

#[cfg(test)]
mod tests {
    use prism_frontend::{scan_file, Parser, SourceFile};
    use prism_spirv::{rewrite, Module, ObjectKind, Opcode};

    fn lower_source(src: &str) -> Module {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, lex_errors) = scan_file(&file);
        assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_file();
        assert!(!parser.has_errors(), "parse errors: {:?}", parser.take_errors());
        let (info, diags) = prism_sema::check(&ast);
        assert!(diags.is_empty(), "check errors: {diags:#?}");
        let mut module = crate::lower(&ast, &info).expect("lowering failed");
        rewrite(&mut module);
        module
    }

    fn function_opcodes(module: &Module) -> Vec<Opcode> {
        let mut out = Vec::new();
        for func in module.function_ids() {
            for &block in module.function_blocks(func) {
                for instruction in module.block_instructions(block) {
                    out.push(instruction.opcode());
                }
            }
        }
        out
    }

    #[test]
    fn empty_function_gets_ids_in_lowering_order() {
        let module = lower_source("func main() {}\n");

        // void type, function type, function, entry block.
        let void = module.objects().find(|o| matches!(o.kind, ObjectKind::VoidType));
        assert_eq!(void.unwrap().id.value(), 1);
        let fn_ty = module
            .objects()
            .find(|o| matches!(o.kind, ObjectKind::FuncType { .. }))
            .unwrap();
        assert_eq!(fn_ty.id.value(), 2);
        assert_eq!(fn_ty.name, "func_main");
        let func = module
            .objects()
            .find(|o| matches!(o.kind, ObjectKind::Function { .. }))
            .unwrap();
        assert_eq!(func.id.value(), 3);

        assert_eq!(function_opcodes(&module), vec![Opcode::Return]);
    }

    #[test]
    fn arithmetic_selects_integer_opcodes_through_locals() {
        let module = lower_source("func f() int {\n  var a int = 2\n  return a + 3\n}\n");

        let ops = function_opcodes(&module);
        assert_eq!(
            ops,
            vec![
                Opcode::Variable,
                Opcode::Store,
                Opcode::Load,
                Opcode::IAdd,
                Opcode::ReturnValue,
            ]
        );
    }

    #[test]
    fn float_literals_dispatch_to_fadd() {
        let module = lower_source("func g() float32 { return 1.0 + 2.0 }\n");

        let ops = function_opcodes(&module);
        assert_eq!(ops, vec![Opcode::FAdd, Opcode::ReturnValue]);

        let float_consts: Vec<_> = module
            .objects()
            .filter(|o| matches!(o.kind, ObjectKind::FloatConstant { .. }))
            .collect();
        assert_eq!(float_consts.len(), 2);
    }

    #[test]
    fn unsigned_division_and_shift_opcodes() {
        let module = lower_source(
            "func f(x uint, y uint) uint {\n  var a uint = x\n  a /= y\n  a >>= 1\n  return a\n}\n",
        );
        let ops = function_opcodes(&module);
        assert!(ops.contains(&Opcode::UDiv), "{ops:?}");
        assert!(ops.contains(&Opcode::ShiftRightLogical), "{ops:?}");
    }

    #[test]
    fn signed_shift_is_arithmetic() {
        let module = lower_source("func f(x int) int { return x >> 1 }\n");
        assert!(function_opcodes(&module).contains(&Opcode::ShiftRightArithmetic));
    }

    #[test]
    fn and_not_lowers_to_not_then_and() {
        let module = lower_source("func f(x int, y int) int { return x &^ y }\n");
        let ops = function_opcodes(&module);
        let not_pos = ops.iter().position(|&o| o == Opcode::Not).expect("OpNot");
        let and_pos = ops
            .iter()
            .position(|&o| o == Opcode::BitwiseAnd)
            .expect("OpBitwiseAnd");
        assert!(not_pos < and_pos);
    }

    #[test]
    fn if_lowering_emits_selection_merge_shape() {
        let module = lower_source("func p(x bool) { if x { } }\n");

        let funcs = module.function_ids();
        assert_eq!(funcs.len(), 1);
        let blocks = module.function_blocks(funcs[0]);
        // entry + true + false + merge; the post-terminator block is pruned.
        assert_eq!(blocks.len(), 4);

        let entry = module.block_instructions(blocks[0]);
        assert_eq!(entry[0].opcode(), Opcode::SelectionMerge);
        assert_eq!(entry[1].opcode(), Opcode::BranchConditional);

        for &block in blocks {
            assert!(module.is_block_terminated(block));
        }
    }

    #[test]
    fn code_after_return_is_pruned() {
        let module = lower_source("func f() int {\n  return 1\n  return 2\n}\n");
        let funcs = module.function_ids();
        let blocks = module.function_blocks(funcs[0]);
        assert_eq!(blocks.len(), 1);
        let ops = function_opcodes(&module);
        assert_eq!(ops, vec![Opcode::ReturnValue]);
    }

    #[test]
    fn variables_end_up_in_the_entry_block() {
        let module = lower_source(
            "func f(c bool) int {\n  if c {\n    x := 1\n    return x\n  }\n  return 0\n}\n",
        );
        let funcs = module.function_ids();
        let blocks = module.function_blocks(funcs[0]);
        let entry = module.block_instructions(blocks[0]);
        assert_eq!(entry[0].opcode(), Opcode::Variable);

        for &block in &blocks[1..] {
            for instruction in module.block_instructions(block) {
                assert_ne!(instruction.opcode(), Opcode::Variable);
            }
        }
    }

    #[test]
    fn loop_shape_has_merge_and_continue_edges() {
        let module = lower_source(
            "func f() int {\n  s := 0\n  for i := 0; i < 10; i++ {\n    s += i\n  }\n  return s\n}\n",
        );
        let ops = function_opcodes(&module);
        assert!(ops.contains(&Opcode::LoopMerge), "{ops:?}");
        assert!(ops.contains(&Opcode::SLessThan), "{ops:?}");
        assert!(ops.contains(&Opcode::BranchConditional), "{ops:?}");

        let funcs = module.function_ids();
        for &block in module.function_blocks(funcs[0]) {
            assert!(module.is_block_terminated(block));
        }
    }

    #[test]
    fn calls_lower_to_function_call() {
        let module = lower_source(
            "func g(x int) int { return x }\nfunc f() int { return g(41) }\n",
        );
        let ops = function_opcodes(&module);
        assert!(ops.contains(&Opcode::FunctionCall), "{ops:?}");
    }

    #[test]
    fn global_constants_fold_into_use_sites() {
        let module = lower_source("const k int = 40 + 2\nfunc f() int { return k }\n");
        let int_consts: Vec<i64> = module
            .objects()
            .filter_map(|o| match o.kind {
                ObjectKind::IntConstant { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(int_consts, vec![42]);
        let ops = function_opcodes(&module);
        assert_eq!(ops, vec![Opcode::ReturnValue]);
    }

    #[test]
    fn switch_lowers_to_compare_chain_with_fallthrough() {
        let module = lower_source(
            "func f(x int) int {\n  r := 0\n  switch x {\n  case 1:\n    r = 1\n    fallthrough\n  case 2:\n    r = 2\n  default:\n    r = 3\n  }\n  return r\n}\n",
        );
        let ops = function_opcodes(&module);
        assert!(ops.iter().filter(|&&o| o == Opcode::IEqual).count() >= 2, "{ops:?}");
        assert!(ops.contains(&Opcode::SelectionMerge), "{ops:?}");

        let funcs = module.function_ids();
        for &block in module.function_blocks(funcs[0]) {
            assert!(module.is_block_terminated(block));
        }
    }

    #[test]
    fn vector_typed_functions_are_reported_unsupported() {
        let file = SourceFile::from_source(
            "<test>".into(),
            "func h(v f32x4) f32x2 { return v.xy }\n",
        );
        let (tokens, _) = scan_file(&file);
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_file();
        let (info, diags) = prism_sema::check(&ast);
        assert!(diags.is_empty());
        let err = crate::lower(&ast, &info).unwrap_err();
        assert!(matches!(err, crate::LowerError::UnsupportedType { .. }));
    }
}
