//! Structural rewrite passes applied after lowering, in a fixed order:
//!
//! 1. pull function-storage variables to the entry block;
//! 2. remove blocks unreachable from the entry;
//! 3. terminate any block still open.

use crate::cfg::Cfg;
use crate::ir::{Id, Instruction, Module, ObjectKind};
use crate::opcode::Opcode;

pub fn rewrite(module: &mut Module) {
    pull_local_vars_to_entry(module);
    remove_unreachable_blocks(module);
    terminate_blocks(module);
}

/// SPIR-V requires function-scope `OpVariable`s to appear in the first
/// block. Collects them from every block, preserving their relative order,
/// and prepends them to the entry block.
pub fn pull_local_vars_to_entry(module: &mut Module) {
    for func in module.function_ids() {
        let blocks = module.function_blocks(func).to_vec();
        if blocks.is_empty() {
            continue;
        }

        let mut pulled: Vec<Instruction> = Vec::new();
        for &block in &blocks {
            let Some(ObjectKind::Block { instructions }) =
                module.object_mut(block).map(|o| &mut o.kind)
            else {
                continue;
            };
            let mut kept = Vec::with_capacity(instructions.len());
            for instruction in instructions.drain(..) {
                if instruction.opcode() == Opcode::Variable {
                    pulled.push(instruction);
                } else {
                    kept.push(instruction);
                }
            }
            *instructions = kept;
        }

        let entry = blocks[0];
        let Some(ObjectKind::Block { instructions }) =
            module.object_mut(entry).map(|o| &mut o.kind)
        else {
            continue;
        };
        pulled.append(instructions);
        *instructions = pulled;
    }
}

/// Delete blocks the CFG cannot reach from the entry, and drop their ids
/// from the module's object index.
pub fn remove_unreachable_blocks(module: &mut Module) {
    let mut removed: Vec<Id> = Vec::new();

    for func in module.function_ids() {
        if module.function_blocks(func).len() <= 1 {
            continue;
        }

        let cfg = Cfg::build(module, func);
        let reachable = cfg.reachable_blocks();

        let Some(ObjectKind::Function { blocks, .. }) =
            module.object_mut(func).map(|o| &mut o.kind)
        else {
            continue;
        };
        blocks.retain(|block| {
            if reachable.contains(block) {
                true
            } else {
                removed.push(*block);
                false
            }
        });
    }

    module.remove_objects(&removed);
}

/// Append a terminator to every open block: `Return` in void functions,
/// `Unreachable` otherwise.
pub fn terminate_blocks(module: &mut Module) {
    for func in module.function_ids() {
        let is_void = {
            let Some(ObjectKind::Function { ty, .. }) = module.object(func).map(|o| &o.kind)
            else {
                continue;
            };
            let Some(ObjectKind::FuncType { ret, .. }) = module.object(*ty).map(|o| &o.kind)
            else {
                continue;
            };
            matches!(module.object(*ret).map(|o| &o.kind), Some(ObjectKind::VoidType))
        };

        for block in module.function_blocks(func).to_vec() {
            if !module.is_block_terminated(block) {
                let terminator = if is_void {
                    Instruction::Return
                } else {
                    Instruction::Unreachable
                };
                module.push_instruction(block, terminator);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{AddressingModel, MemoryModel, StorageClass};

    fn void_function(m: &mut Module, name: &str) -> (Id, Id) {
        let void = m.type_void();
        let fn_ty = m.type_func(void, vec![], &format!("func_{name}"));
        let func = m.new_function(name, fn_ty);
        let entry = m.new_block(func, "entry");
        (func, entry)
    }

    #[test]
    fn variables_are_hoisted_to_the_entry_block_in_order() {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        let (func, entry) = void_function(&mut m, "f");
        let int = m.type_int(32, true);
        let ptr = m.type_ptr(int, StorageClass::Function);

        let later = m.new_block(func, "later");
        m.push_instruction(entry, Instruction::Branch { target: later });

        let a = m.new_variable("a", ptr, StorageClass::Function, None);
        let b = m.new_variable("b", ptr, StorageClass::Function, None);
        m.push_instruction(
            later,
            Instruction::Variable {
                result_type: ptr,
                result: a,
                storage: StorageClass::Function,
                init: None,
            },
        );
        m.push_instruction(
            later,
            Instruction::Variable {
                result_type: ptr,
                result: b,
                storage: StorageClass::Function,
                init: None,
            },
        );
        m.push_instruction(later, Instruction::Return);

        pull_local_vars_to_entry(&mut m);

        let entry_instrs = m.block_instructions(entry);
        assert_eq!(entry_instrs[0].result(), Some(a));
        assert_eq!(entry_instrs[1].result(), Some(b));
        assert_eq!(entry_instrs[2].opcode(), Opcode::Branch);
        assert!(m
            .block_instructions(later)
            .iter()
            .all(|i| i.opcode() != Opcode::Variable));
    }

    #[test]
    fn unreachable_blocks_are_deleted_and_unindexed() {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        let (func, entry) = void_function(&mut m, "f");
        let orphan = m.new_block(func, "orphan");
        m.push_instruction(entry, Instruction::Return);
        m.push_instruction(orphan, Instruction::Return);

        remove_unreachable_blocks(&mut m);

        assert_eq!(m.function_blocks(func), &[entry]);
        assert!(m.object(orphan).is_none());
    }

    #[test]
    fn open_blocks_get_return_in_void_functions() {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        let (_, entry) = void_function(&mut m, "f");

        terminate_blocks(&mut m);

        assert_eq!(m.block_instructions(entry).last().unwrap().opcode(), Opcode::Return);
    }

    #[test]
    fn open_blocks_get_unreachable_in_value_functions() {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        let int = m.type_int(32, true);
        let fn_ty = m.type_func(int, vec![], "func_g");
        let func = m.new_function("g", fn_ty);
        let entry = m.new_block(func, "entry");

        terminate_blocks(&mut m);

        assert_eq!(
            m.block_instructions(entry).last().unwrap().opcode(),
            Opcode::Unreachable
        );
    }

    #[test]
    fn full_rewrite_terminates_every_block() {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        let (func, entry) = void_function(&mut m, "f");
        let merge = m.new_block(func, "merge");
        m.push_instruction(entry, Instruction::Branch { target: merge });

        rewrite(&mut m);

        for &block in m.function_blocks(func) {
            assert!(m.is_block_terminated(block));
        }
    }
}
