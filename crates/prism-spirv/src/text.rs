//! The text serializer: human-readable SPIR-V assembly.
//!
//! Emission order is shared with the binary serializer: capabilities, the
//! memory model, types in id order, constants in id order, then functions.
//! Every id-declaring object prints as a symbolic `%kind_name_id` name.

use crate::ir::{Id, Instruction, Module, Object, ObjectKind, Operand};
use crate::opcode::{FunctionControl, Opcode};

pub struct TextPrinter<'m> {
    module: &'m Module,
    out: String,
}

impl<'m> TextPrinter<'m> {
    pub fn new(module: &'m Module) -> TextPrinter<'m> {
        TextPrinter {
            module,
            out: String::new(),
        }
    }

    pub fn print(mut self) -> String {
        for capability in self.module.capabilities() {
            self.out
                .push_str(&format!("OpCapability {capability}\n"));
        }
        self.out.push_str(&format!(
            "OpMemoryModel {} {}\n",
            self.module.addressing, self.module.memory
        ));

        let objects: Vec<&Object> = self.module.objects().collect();
        for obj in objects.iter().filter(|o| o.kind.is_type()) {
            self.emit_type(obj);
        }
        for obj in objects.iter().filter(|o| o.kind.is_constant()) {
            self.emit_constant(obj);
        }
        for obj in objects.iter() {
            if matches!(obj.kind, ObjectKind::Function { .. }) {
                self.emit_function(obj);
            }
        }

        self.out
    }

    fn name_of(&self, id: Id) -> String {
        let Some(obj) = self.module.object(id) else {
            unreachable!("name requested for a dead id {id}");
        };
        let kind = match obj.kind {
            ObjectKind::Function { .. } => "func",
            ObjectKind::Block { .. } => "block",
            _ if obj.kind.is_type() => "type",
            _ if obj.kind.is_constant() => "const",
            _ => "value",
        };
        format!("%{kind}_{}_{}", obj.name, obj.id)
    }

    fn emit_type(&mut self, obj: &Object) {
        let name = self.name_of(obj.id);
        let line = match &obj.kind {
            ObjectKind::VoidType => format!("{name} = OpTypeVoid"),
            ObjectKind::BoolType => format!("{name} = OpTypeBool"),
            ObjectKind::IntType { bits, signed } => {
                format!("{name} = OpTypeInt {bits} {}", u32::from(*signed))
            }
            ObjectKind::FloatType { bits } => format!("{name} = OpTypeFloat {bits}"),
            ObjectKind::PtrType { to, storage } => {
                format!("{name} = OpTypePointer {storage} {}", self.name_of(*to))
            }
            ObjectKind::FuncType { ret, args } => {
                let mut line = format!("{name} = OpTypeFunction {}", self.name_of(*ret));
                for &arg in args {
                    line.push(' ');
                    line.push_str(&self.name_of(arg));
                }
                line
            }
            _ => unreachable!("type emission for a non-type object"),
        };
        self.out.push_str(&line);
        self.out.push('\n');
    }

    fn emit_constant(&mut self, obj: &Object) {
        let name = self.name_of(obj.id);
        let line = match &obj.kind {
            ObjectKind::BoolConstant { ty, value } => {
                let op = if *value {
                    Opcode::ConstantTrue
                } else {
                    Opcode::ConstantFalse
                };
                format!("{name} = {op} {}", self.name_of(*ty))
            }
            ObjectKind::IntConstant { ty, value } => {
                format!("{name} = OpConstant {} {value}", self.name_of(*ty))
            }
            ObjectKind::FloatConstant { ty, value, .. } => {
                format!("{name} = OpConstant {} {value}", self.name_of(*ty))
            }
            _ => unreachable!("constant emission for a non-constant object"),
        };
        self.out.push_str(&line);
        self.out.push('\n');
    }

    fn emit_function(&mut self, obj: &Object) {
        let ObjectKind::Function { ty, params, blocks } = &obj.kind else {
            unreachable!("function emission for a non-function object");
        };
        let Some(ObjectKind::FuncType { ret, .. }) = self.module.object(*ty).map(|o| &o.kind)
        else {
            unreachable!("function whose type is not a function type");
        };

        self.out.push_str(&format!(
            "{} = OpFunction {} {} {}\n",
            self.name_of(obj.id),
            self.name_of(*ret),
            FunctionControl::None,
            self.name_of(*ty),
        ));

        for &param in params {
            let Some(ObjectKind::FuncParam { ty }) = self.module.object(param).map(|o| &o.kind)
            else {
                unreachable!("function parameter that is not a FuncParam object");
            };
            self.out.push_str(&format!(
                "{} = OpFunctionParameter {}\n",
                self.name_of(param),
                self.name_of(*ty),
            ));
        }

        for &block in blocks {
            self.out
                .push_str(&format!("{} = OpLabel\n", self.name_of(block)));
            for instruction in self.module.block_instructions(block) {
                self.emit_instruction(instruction);
            }
        }

        self.out.push_str("OpFunctionEnd\n");
    }

    fn emit_instruction(&mut self, instruction: &Instruction) {
        let mut line = String::new();
        if let Some(result) = instruction.result() {
            line.push_str(&self.name_of(result));
            line.push_str(" = ");
        }
        line.push_str(instruction.opcode().mnemonic());
        if let Some(result_type) = instruction.result_type() {
            line.push(' ');
            line.push_str(&self.name_of(result_type));
        }
        for operand in instruction.operands() {
            line.push(' ');
            match operand {
                Operand::Id(id) => line.push_str(&self.name_of(id)),
                Operand::Storage(storage) => line.push_str(storage.as_str()),
                Operand::ControlNone => line.push_str("None"),
                Operand::Literal(value) => line.push_str(&value.to_string()),
            }
        }
        self.out.push_str(&line);
        self.out.push('\n');
    }
}
