//! The binary serializer: little-endian 32-bit words in the SPIR-V 1.3
//! physical layout.
//!
//! Each instruction's first word is `(word_count << 16) | opcode`, where the
//! word count includes the opcode word itself. The emission order matches
//! the text serializer.

use crate::ir::{Instruction, Module, Object, ObjectKind, Operand};
use crate::opcode::Opcode;

const MAGIC: u32 = 0x0723_0203;
const VERSION_MAJOR: u32 = 1;
const VERSION_MINOR: u32 = 3;

pub struct BinaryPrinter<'m> {
    module: &'m Module,
    words: Vec<u32>,
}

impl<'m> BinaryPrinter<'m> {
    pub fn new(module: &'m Module) -> BinaryPrinter<'m> {
        BinaryPrinter {
            module,
            words: Vec::new(),
        }
    }

    pub fn print(mut self) -> Vec<u8> {
        self.emit_header();

        for capability in self.module.capabilities() {
            self.emit_op(Opcode::Capability, &[capability.word()]);
        }
        self.emit_op(
            Opcode::MemoryModel,
            &[self.module.addressing.word(), self.module.memory.word()],
        );

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

        let mut bytes = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    fn emit_header(&mut self) {
        self.words.push(MAGIC);
        self.words.push((VERSION_MAJOR << 16) | (VERSION_MINOR << 8));
        // Generator magic; zero is allowed.
        self.words.push(0);
        self.words.push(self.module.bound());
        // Instruction schema, reserved.
        self.words.push(0);
    }

    fn emit_op(&mut self, opcode: Opcode, operands: &[u32]) {
        let word_count = 1 + operands.len() as u32;
        self.words.push((word_count << 16) | opcode.word());
        self.words.extend_from_slice(operands);
    }

    fn emit_type(&mut self, obj: &Object) {
        let id = obj.id.value();
        match &obj.kind {
            ObjectKind::VoidType => self.emit_op(Opcode::TypeVoid, &[id]),
            ObjectKind::BoolType => self.emit_op(Opcode::TypeBool, &[id]),
            ObjectKind::IntType { bits, signed } => {
                self.emit_op(Opcode::TypeInt, &[id, *bits, u32::from(*signed)])
            }
            ObjectKind::FloatType { bits } => self.emit_op(Opcode::TypeFloat, &[id, *bits]),
            ObjectKind::PtrType { to, storage } => {
                self.emit_op(Opcode::TypePointer, &[id, storage.word(), to.value()])
            }
            ObjectKind::FuncType { ret, args } => {
                let mut operands = Vec::with_capacity(args.len() + 2);
                operands.push(id);
                operands.push(ret.value());
                operands.extend(args.iter().map(|a| a.value()));
                self.emit_op(Opcode::TypeFunction, &operands);
            }
            _ => unreachable!("type emission for a non-type object"),
        }
    }

    fn emit_constant(&mut self, obj: &Object) {
        let id = obj.id.value();
        match &obj.kind {
            ObjectKind::BoolConstant { ty, value } => {
                let opcode = if *value {
                    Opcode::ConstantTrue
                } else {
                    Opcode::ConstantFalse
                };
                self.emit_op(opcode, &[ty.value(), id]);
            }
            ObjectKind::IntConstant { ty, value } => {
                self.emit_op(Opcode::Constant, &[ty.value(), id, *value as u32]);
            }
            ObjectKind::FloatConstant { ty, bits, value } => match bits {
                32 => self.emit_op(
                    Opcode::Constant,
                    &[ty.value(), id, (*value as f32).to_bits()],
                ),
                64 => {
                    let bits = value.to_bits();
                    let low = (bits & 0xFFFF_FFFF) as u32;
                    let high = (bits >> 32) as u32;
                    self.emit_op(Opcode::Constant, &[ty.value(), id, low, high]);
                }
                _ => unreachable!("float constant of an unsupported width"),
            },
            _ => unreachable!("constant emission for a non-constant object"),
        }
    }

    fn emit_function(&mut self, obj: &Object) {
        let ObjectKind::Function { ty, params, blocks } = &obj.kind else {
            unreachable!("function emission for a non-function object");
        };
        let Some(ObjectKind::FuncType { ret, .. }) = self.module.object(*ty).map(|o| &o.kind)
        else {
            unreachable!("function whose type is not a function type");
        };

        self.emit_op(
            Opcode::Function,
            &[ret.value(), obj.id.value(), 0, ty.value()],
        );

        for &param in params {
            let Some(ObjectKind::FuncParam { ty }) = self.module.object(param).map(|o| &o.kind)
            else {
                unreachable!("function parameter that is not a FuncParam object");
            };
            self.emit_op(Opcode::FunctionParameter, &[ty.value(), param.value()]);
        }

        for &block in blocks {
            self.emit_op(Opcode::Label, &[block.value()]);
            for instruction in self.module.block_instructions(block) {
                self.emit_instruction(instruction);
            }
        }

        self.emit_op(Opcode::FunctionEnd, &[]);
    }

    fn emit_instruction(&mut self, instruction: &Instruction) {
        let mut operands = Vec::new();
        if let Some(result_type) = instruction.result_type() {
            operands.push(result_type.value());
        }
        if let Some(result) = instruction.result() {
            operands.push(result.value());
        }
        for operand in instruction.operands() {
            operands.push(match operand {
                Operand::Id(id) => id.value(),
                Operand::Storage(storage) => storage.word(),
                Operand::ControlNone => 0,
                Operand::Literal(value) => value,
            });
        }
        self.emit_op(instruction.opcode(), &operands);
    }
}
