//! The SPIR-V IR: a module of id-addressed objects.
//!
//! Invariants:
//! - every object has a unique id and is discoverable by id;
//! - ids are allocated by a monotonic counter and never reused, so id order
//!   equals creation order;
//! - types and constants are interned by a canonical structural key;
//! - a pointer's storage class is part of its identity;
//! - a function's entry block is `blocks[0]`.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::opcode::{AddressingModel, Capability, MemoryModel, Opcode, StorageClass};

/// A unique identifier for an IR object. Valid ids start at 1; the module
/// header's bound is one past the highest allocated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u32);

impl Id {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub id: Id,
    pub name: String,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    VoidType,
    BoolType,
    IntType {
        bits: u32,
        signed: bool,
    },
    FloatType {
        bits: u32,
    },
    PtrType {
        to: Id,
        storage: StorageClass,
    },
    FuncType {
        ret: Id,
        args: Vec<Id>,
    },
    BoolConstant {
        ty: Id,
        value: bool,
    },
    IntConstant {
        ty: Id,
        value: i64,
    },
    FloatConstant {
        ty: Id,
        bits: u32,
        value: f64,
    },
    Function {
        ty: Id,
        params: Vec<Id>,
        blocks: Vec<Id>,
    },
    FuncParam {
        ty: Id,
    },
    Variable {
        ptr_ty: Id,
        storage: StorageClass,
        init: Option<Id>,
    },
    RuntimeValue {
        ty: Id,
    },
    Block {
        instructions: Vec<Instruction>,
    },
}

impl ObjectKind {
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            ObjectKind::VoidType
                | ObjectKind::BoolType
                | ObjectKind::IntType { .. }
                | ObjectKind::FloatType { .. }
                | ObjectKind::PtrType { .. }
                | ObjectKind::FuncType { .. }
        )
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            ObjectKind::BoolConstant { .. }
                | ObjectKind::IntConstant { .. }
                | ObjectKind::FloatConstant { .. }
        )
    }
}

/// An operand following an instruction's result-type/result pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Id(Id),
    Storage(StorageClass),
    /// Selection/loop control mask; always `None` today.
    ControlNone,
    /// A literal word (switch case values).
    Literal(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Return,
    ReturnValue {
        value: Id,
    },
    Unreachable,
    Branch {
        target: Id,
    },
    BranchConditional {
        condition: Id,
        true_target: Id,
        false_target: Id,
    },
    Switch {
        selector: Id,
        default: Id,
        targets: Vec<(u32, Id)>,
    },
    SelectionMerge {
        merge: Id,
    },
    LoopMerge {
        merge: Id,
        continue_target: Id,
    },
    Variable {
        result_type: Id,
        result: Id,
        storage: StorageClass,
        init: Option<Id>,
    },
    Load {
        result_type: Id,
        result: Id,
        pointer: Id,
    },
    Store {
        pointer: Id,
        value: Id,
    },
    FunctionCall {
        result_type: Id,
        result: Id,
        function: Id,
        args: Vec<Id>,
    },
    Binary {
        op: Opcode,
        result_type: Id,
        result: Id,
        lhs: Id,
        rhs: Id,
    },
    Unary {
        op: Opcode,
        result_type: Id,
        result: Id,
        operand: Id,
    },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Return => Opcode::Return,
            Instruction::ReturnValue { .. } => Opcode::ReturnValue,
            Instruction::Unreachable => Opcode::Unreachable,
            Instruction::Branch { .. } => Opcode::Branch,
            Instruction::BranchConditional { .. } => Opcode::BranchConditional,
            Instruction::Switch { .. } => Opcode::Switch,
            Instruction::SelectionMerge { .. } => Opcode::SelectionMerge,
            Instruction::LoopMerge { .. } => Opcode::LoopMerge,
            Instruction::Variable { .. } => Opcode::Variable,
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Store { .. } => Opcode::Store,
            Instruction::FunctionCall { .. } => Opcode::FunctionCall,
            Instruction::Binary { op, .. } | Instruction::Unary { op, .. } => *op,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode().is_terminator()
    }

    pub fn result(&self) -> Option<Id> {
        match self {
            Instruction::Variable { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::FunctionCall { result, .. }
            | Instruction::Binary { result, .. }
            | Instruction::Unary { result, .. } => Some(*result),
            _ => None,
        }
    }

    pub fn result_type(&self) -> Option<Id> {
        match self {
            Instruction::Variable { result_type, .. }
            | Instruction::Load { result_type, .. }
            | Instruction::FunctionCall { result_type, .. }
            | Instruction::Binary { result_type, .. }
            | Instruction::Unary { result_type, .. } => Some(*result_type),
            _ => None,
        }
    }

    /// Operands after the result-type/result pair; the single encoding both
    /// serializers consume, so text and binary cannot drift apart.
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Instruction::Return | Instruction::Unreachable => vec![],
            Instruction::ReturnValue { value } => vec![Operand::Id(*value)],
            Instruction::Branch { target } => vec![Operand::Id(*target)],
            Instruction::BranchConditional {
                condition,
                true_target,
                false_target,
            } => vec![
                Operand::Id(*condition),
                Operand::Id(*true_target),
                Operand::Id(*false_target),
            ],
            Instruction::Switch {
                selector,
                default,
                targets,
            } => {
                let mut operands = vec![Operand::Id(*selector), Operand::Id(*default)];
                for (literal, target) in targets {
                    operands.push(Operand::Literal(*literal));
                    operands.push(Operand::Id(*target));
                }
                operands
            }
            Instruction::SelectionMerge { merge } => {
                vec![Operand::Id(*merge), Operand::ControlNone]
            }
            Instruction::LoopMerge {
                merge,
                continue_target,
            } => vec![
                Operand::Id(*merge),
                Operand::Id(*continue_target),
                Operand::ControlNone,
            ],
            Instruction::Variable { storage, init, .. } => {
                let mut operands = vec![Operand::Storage(*storage)];
                if let Some(init) = init {
                    operands.push(Operand::Id(*init));
                }
                operands
            }
            Instruction::Load { pointer, .. } => vec![Operand::Id(*pointer)],
            Instruction::Store { pointer, value } => {
                vec![Operand::Id(*pointer), Operand::Id(*value)]
            }
            Instruction::FunctionCall { function, args, .. } => {
                let mut operands = vec![Operand::Id(*function)];
                operands.extend(args.iter().map(|&arg| Operand::Id(arg)));
                operands
            }
            Instruction::Binary { lhs, rhs, .. } => {
                vec![Operand::Id(*lhs), Operand::Id(*rhs)]
            }
            Instruction::Unary { operand, .. } => vec![Operand::Id(*operand)],
        }
    }

    /// Control-flow successor block ids contributed by this instruction.
    pub fn successor_ids(&self) -> Vec<Id> {
        match self {
            Instruction::Branch { target } => vec![*target],
            Instruction::BranchConditional {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            Instruction::Switch {
                default, targets, ..
            } => {
                let mut out = vec![*default];
                out.extend(targets.iter().map(|&(_, target)| target));
                out
            }
            Instruction::SelectionMerge { merge } => vec![*merge],
            Instruction::LoopMerge {
                merge,
                continue_target,
            } => vec![*merge, *continue_target],
            _ => vec![],
        }
    }
}

/// A SPIR-V module: capabilities, a memory model, and the id-ordered object
/// collection everything else hangs off.
#[derive(Debug)]
pub struct Module {
    pub addressing: AddressingModel,
    pub memory: MemoryModel,
    capabilities: Vec<Capability>,
    objects: BTreeMap<Id, Object>,
    type_by_key: FxHashMap<String, Id>,
    const_by_key: FxHashMap<String, Id>,
    next_id: u32,
}

impl Module {
    pub fn new(addressing: AddressingModel, memory: MemoryModel) -> Module {
        Module {
            addressing,
            memory,
            capabilities: Vec::new(),
            objects: BTreeMap::new(),
            type_by_key: FxHashMap::default(),
            const_by_key: FxHashMap::default(),
            next_id: 0,
        }
    }

    pub fn add_capability(&mut self, capability: Capability) {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn fresh_id(&mut self) -> Id {
        self.next_id += 1;
        Id(self.next_id)
    }

    /// One past the highest id allocated so far; the header's bound word.
    pub fn bound(&self) -> u32 {
        self.next_id + 1
    }

    pub fn object(&self, id: Id) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: Id) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    /// All live objects in id order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    /// Remove deleted objects from the id index. Ids are never reused.
    pub fn remove_objects(&mut self, ids: &[Id]) {
        for id in ids {
            self.objects.remove(id);
        }
    }

    fn insert(&mut self, name: impl Into<String>, kind: ObjectKind) -> Id {
        let id = self.fresh_id();
        self.objects.insert(
            id,
            Object {
                id,
                name: name.into(),
                kind,
            },
        );
        id
    }

    // ------------------------------------------------------------------
    // Type interning
    // ------------------------------------------------------------------

    fn intern_type(&mut self, key: String, name: &str, kind: ObjectKind) -> Id {
        if let Some(&id) = self.type_by_key.get(&key) {
            return id;
        }
        let id = self.insert(name, kind);
        self.type_by_key.insert(key, id);
        id
    }

    pub fn type_void(&mut self) -> Id {
        self.intern_type("void".into(), "void", ObjectKind::VoidType)
    }

    pub fn type_bool(&mut self) -> Id {
        self.intern_type("bool".into(), "bool", ObjectKind::BoolType)
    }

    pub fn type_int(&mut self, bits: u32, signed: bool) -> Id {
        let key = if signed {
            format!("int{bits}")
        } else {
            format!("uint{bits}")
        };
        let name = key.clone();
        self.intern_type(key, &name, ObjectKind::IntType { bits, signed })
    }

    pub fn type_float(&mut self, bits: u32) -> Id {
        let key = format!("float{bits}");
        let name = key.clone();
        self.intern_type(key, &name, ObjectKind::FloatType { bits })
    }

    pub fn type_ptr(&mut self, to: Id, storage: StorageClass) -> Id {
        let key = format!("ptr({},{})", self.type_key(to), storage.word());
        self.intern_type(key, "ptr", ObjectKind::PtrType { to, storage })
    }

    /// Function types are named after the first function that interns them.
    pub fn type_func(&mut self, ret: Id, args: Vec<Id>, name: &str) -> Id {
        let mut key = String::from("func(");
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&self.type_key(arg));
        }
        key.push(')');
        key.push_str(&self.type_key(ret));
        self.intern_type(key, name, ObjectKind::FuncType { ret, args })
    }

    /// The canonical structural key of an already-interned type.
    pub fn type_key(&self, id: Id) -> String {
        let obj = self.objects.get(&id).expect("type id is live");
        match &obj.kind {
            ObjectKind::VoidType => "void".into(),
            ObjectKind::BoolType => "bool".into(),
            ObjectKind::IntType { bits, signed } => {
                if *signed {
                    format!("int{bits}")
                } else {
                    format!("uint{bits}")
                }
            }
            ObjectKind::FloatType { bits } => format!("float{bits}"),
            ObjectKind::PtrType { to, storage } => {
                format!("ptr({},{})", self.type_key(*to), storage.word())
            }
            ObjectKind::FuncType { ret, args } => {
                let mut key = String::from("func(");
                for (i, &arg) in args.iter().enumerate() {
                    if i > 0 {
                        key.push(',');
                    }
                    key.push_str(&self.type_key(arg));
                }
                key.push(')');
                key.push_str(&self.type_key(*ret));
                key
            }
            _ => unreachable!("type key requested for a non-type object"),
        }
    }

    // ------------------------------------------------------------------
    // Constant interning
    // ------------------------------------------------------------------

    /// Constants key as `const_<typeKey>_<literal>`; the literal spelling is
    /// sanitised so `.` and `-` cannot collide with key delimiters.
    fn intern_const(&mut self, key: String, name: String, kind: ObjectKind) -> Id {
        if let Some(&id) = self.const_by_key.get(&key) {
            return id;
        }
        let id = self.insert(name, kind);
        self.const_by_key.insert(key, id);
        id
    }

    pub fn const_bool(&mut self, value: bool) -> Id {
        let ty = self.type_bool();
        let literal = if value { "true" } else { "false" };
        let key = format!("const_{}_{literal}", self.type_key(ty));
        self.intern_const(key, literal.into(), ObjectKind::BoolConstant { ty, value })
    }

    pub fn const_int(&mut self, bits: u32, signed: bool, value: i64) -> Id {
        let ty = self.type_int(bits, signed);
        let literal = sanitize_literal(&value.to_string());
        let key = format!("const_{}_{literal}", self.type_key(ty));
        self.intern_const(key, literal, ObjectKind::IntConstant { ty, value })
    }

    pub fn const_float(&mut self, bits: u32, value: f64) -> Id {
        let ty = self.type_float(bits);
        let literal = sanitize_literal(&format!("{value:.6}"));
        let key = format!("const_{}_{literal}", self.type_key(ty));
        self.intern_const(key, literal, ObjectKind::FloatConstant { ty, bits, value })
    }

    // ------------------------------------------------------------------
    // Functions, blocks, and values
    // ------------------------------------------------------------------

    pub fn new_function(&mut self, name: &str, ty: Id) -> Id {
        self.insert(
            name,
            ObjectKind::Function {
                ty,
                params: Vec::new(),
                blocks: Vec::new(),
            },
        )
    }

    pub fn new_func_param(&mut self, func: Id, name: &str, ty: Id) -> Id {
        let id = self.insert(name, ObjectKind::FuncParam { ty });
        let Some(ObjectKind::Function { params, .. }) = self.objects.get_mut(&func).map(|o| &mut o.kind)
        else {
            unreachable!("parameter added to a non-function object");
        };
        params.push(id);
        id
    }

    pub fn new_block(&mut self, func: Id, name: &str) -> Id {
        let id = self.insert(
            name,
            ObjectKind::Block {
                instructions: Vec::new(),
            },
        );
        let Some(ObjectKind::Function { blocks, .. }) = self.objects.get_mut(&func).map(|o| &mut o.kind)
        else {
            unreachable!("block added to a non-function object");
        };
        blocks.push(id);
        id
    }

    pub fn new_variable(&mut self, name: &str, ptr_ty: Id, storage: StorageClass, init: Option<Id>) -> Id {
        self.insert(
            name,
            ObjectKind::Variable {
                ptr_ty,
                storage,
                init,
            },
        )
    }

    pub fn new_runtime_value(&mut self, name: &str, ty: Id) -> Id {
        self.insert(name, ObjectKind::RuntimeValue { ty })
    }

    pub fn push_instruction(&mut self, block: Id, instruction: Instruction) {
        let Some(ObjectKind::Block { instructions }) =
            self.objects.get_mut(&block).map(|o| &mut o.kind)
        else {
            unreachable!("instruction pushed to a non-block object");
        };
        if instructions.last().is_some_and(|last| last.is_terminator()) {
            unreachable!("instruction pushed to a terminated block");
        }
        instructions.push(instruction);
    }

    pub fn block_instructions(&self, block: Id) -> &[Instruction] {
        let Some(ObjectKind::Block { instructions }) = self.objects.get(&block).map(|o| &o.kind)
        else {
            unreachable!("instructions requested for a non-block object");
        };
        instructions
    }

    pub fn is_block_terminated(&self, block: Id) -> bool {
        self.block_instructions(block)
            .last()
            .is_some_and(|last| last.is_terminator())
    }

    pub fn function_blocks(&self, func: Id) -> &[Id] {
        let Some(ObjectKind::Function { blocks, .. }) = self.objects.get(&func).map(|o| &o.kind)
        else {
            unreachable!("blocks requested for a non-function object");
        };
        blocks
    }

    /// All function ids in id order.
    pub fn function_ids(&self) -> Vec<Id> {
        self.objects
            .values()
            .filter(|o| matches!(o.kind, ObjectKind::Function { .. }))
            .map(|o| o.id)
            .collect()
    }

    /// A block's control-flow successors: the terminator's targets plus the
    /// merge/continue blocks named by merge instructions.
    pub fn block_successors(&self, block: Id) -> Vec<Id> {
        let mut out: Vec<Id> = Vec::new();
        for instruction in self.block_instructions(block) {
            for succ in instruction.successor_ids() {
                if !out.contains(&succ) {
                    out.push(succ);
                }
            }
        }
        out
    }
}

fn sanitize_literal(literal: &str) -> String {
    literal.replace('.', "_").replace('-', "n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Module {
        Module::new(AddressingModel::Logical, MemoryModel::Glsl450)
    }

    #[test]
    fn ids_are_monotonic_and_bound_is_one_past() {
        let mut m = module();
        let void = m.type_void();
        let b = m.type_bool();
        assert_eq!(void.value(), 1);
        assert_eq!(b.value(), 2);
        assert_eq!(m.bound(), 3);
    }

    #[test]
    fn types_intern_by_structure() {
        let mut m = module();
        let a = m.type_int(32, true);
        let b = m.type_int(32, true);
        let c = m.type_int(32, false);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let void = m.type_void();
        let f1 = m.type_func(void, vec![a], "func_f");
        let f2 = m.type_func(void, vec![a], "func_g");
        assert_eq!(f1, f2);
        // The first interning wins the name.
        assert_eq!(m.object(f1).unwrap().name, "func_f");
    }

    #[test]
    fn pointer_identity_includes_the_storage_class() {
        let mut m = module();
        let int = m.type_int(32, true);
        let a = m.type_ptr(int, StorageClass::Function);
        let b = m.type_ptr(int, StorageClass::Function);
        let c = m.type_ptr(int, StorageClass::Private);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn constants_intern_by_type_and_literal() {
        let mut m = module();
        let a = m.const_int(32, true, 3);
        let b = m.const_int(32, true, 3);
        let c = m.const_int(32, true, 4);
        let d = m.const_int(32, false, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        let x = m.const_float(32, 1.5);
        let y = m.const_float(32, 1.5);
        assert_eq!(x, y);

        let t = m.const_bool(true);
        let f = m.const_bool(false);
        assert_ne!(t, f);
    }

    #[test]
    fn blocks_belong_to_their_function_in_creation_order() {
        let mut m = module();
        let void = m.type_void();
        let fn_ty = m.type_func(void, vec![], "func_main");
        let func = m.new_function("main", fn_ty);
        let entry = m.new_block(func, "entry");
        let next = m.new_block(func, "merge");
        assert_eq!(m.function_blocks(func), &[entry, next]);
    }

    #[test]
    fn successors_include_merge_edges() {
        let mut m = module();
        let void = m.type_void();
        let fn_ty = m.type_func(void, vec![], "func_main");
        let func = m.new_function("main", fn_ty);
        let entry = m.new_block(func, "entry");
        let true_b = m.new_block(func, "true");
        let false_b = m.new_block(func, "false");
        let merge = m.new_block(func, "merge");
        let bool_ty = m.type_bool();
        let cond = m.new_runtime_value("cond", bool_ty);

        m.push_instruction(entry, Instruction::SelectionMerge { merge });
        m.push_instruction(
            entry,
            Instruction::BranchConditional {
                condition: cond,
                true_target: true_b,
                false_target: false_b,
            },
        );

        assert_eq!(m.block_successors(entry), vec![merge, true_b, false_b]);
    }

    #[test]
    fn removing_objects_cleans_the_index_without_reusing_ids() {
        let mut m = module();
        let void = m.type_void();
        let fn_ty = m.type_func(void, vec![], "func_main");
        let func = m.new_function("main", fn_ty);
        let dead = m.new_block(func, "dead");
        let bound_before = m.bound();
        m.remove_objects(&[dead]);
        assert!(m.object(dead).is_none());
        assert_eq!(m.bound(), bound_before);
        let after = m.new_block(func, "next");
        assert!(after.value() > dead.value());
    }
}
