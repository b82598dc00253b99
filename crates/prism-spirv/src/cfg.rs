//! Per-function control flow graphs.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::{Id, Module};

/// Successor/predecessor edges for one function, derived from each block's
/// terminator targets and merge/continue annotations.
pub struct Cfg {
    pub function: Id,
    succ_edges: FxHashMap<Id, Vec<Id>>,
    pred_edges: FxHashMap<Id, Vec<Id>>,
    blocks: Vec<Id>,
}

impl Cfg {
    pub fn build(module: &Module, function: Id) -> Cfg {
        let blocks = module.function_blocks(function).to_vec();
        let mut cfg = Cfg {
            function,
            succ_edges: FxHashMap::default(),
            pred_edges: FxHashMap::default(),
            blocks: blocks.clone(),
        };

        for &block in &blocks {
            for succ in module.block_successors(block) {
                cfg.succ_edges.entry(block).or_default().push(succ);
                cfg.pred_edges.entry(succ).or_default().push(block);
            }
        }

        cfg
    }

    pub fn successors(&self, block: Id) -> &[Id] {
        self.succ_edges.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, block: Id) -> &[Id] {
        self.pred_edges.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocks reachable from the entry block by successor edges.
    pub fn reachable_blocks(&self) -> FxHashSet<Id> {
        let mut reachable = FxHashSet::default();
        let Some(&entry) = self.blocks.first() else {
            return reachable;
        };

        let mut queue = vec![entry];
        while let Some(current) = queue.pop() {
            if !reachable.insert(current) {
                continue;
            }
            for &succ in self.successors(current) {
                if !reachable.contains(&succ) {
                    queue.push(succ);
                }
            }
        }

        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;
    use crate::opcode::{AddressingModel, MemoryModel};

    #[test]
    fn unreached_blocks_are_not_reachable() {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        let void = m.type_void();
        let fn_ty = m.type_func(void, vec![], "func_f");
        let func = m.new_function("f", fn_ty);
        let entry = m.new_block(func, "entry");
        let target = m.new_block(func, "target");
        let orphan = m.new_block(func, "orphan");

        m.push_instruction(entry, Instruction::Branch { target });
        m.push_instruction(target, Instruction::Return);
        m.push_instruction(orphan, Instruction::Return);

        let cfg = Cfg::build(&m, func);
        let reachable = cfg.reachable_blocks();
        assert!(reachable.contains(&entry));
        assert!(reachable.contains(&target));
        assert!(!reachable.contains(&orphan));
        assert_eq!(cfg.predecessors(target), &[entry]);
    }
}
