//! SPIR-V IR, structural rewrite passes, and serializers.

pub mod binary;
pub mod cfg;
pub mod ir;
pub mod opcode;
pub mod rewrite;
pub mod text;

pub use binary::BinaryPrinter;
pub use cfg::Cfg;
pub use ir::{Id, Instruction, Module, Object, ObjectKind, Operand};
pub use opcode::{
    AddressingModel, Capability, FunctionControl, MemoryModel, Opcode, StorageClass,
};
pub use rewrite::rewrite;
pub use text::TextPrinter;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Module {
        let mut m = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
        m.add_capability(Capability::Shader);
        m.add_capability(Capability::Linkage);

        // Interned first so the void type takes id 1, like lowered modules.
        m.type_void();
        let int = m.type_int(32, true);
        let fn_ty = m.type_func(int, vec![int], "func_f");
        let func = m.new_function("f", fn_ty);
        let param = m.new_func_param(func, "x", int);
        let entry = m.new_block(func, "entry");
        let three = m.const_int(32, true, 3);
        let sum = m.new_runtime_value("tmp", int);
        m.push_instruction(
            entry,
            Instruction::Binary {
                op: Opcode::IAdd,
                result_type: int,
                result: sum,
                lhs: param,
                rhs: three,
            },
        );
        m.push_instruction(entry, Instruction::ReturnValue { value: sum });

        let _ = m.const_float(32, 1.5);
        let _ = m.const_bool(true);
        let _ = m.type_ptr(int, StorageClass::Function);

        m
    }

    /// Decode the opcode stream back out of the binary words.
    fn binary_opcodes(bytes: &[u8]) -> Vec<u32> {
        assert_eq!(bytes.len() % 4, 0);
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let mut opcodes = Vec::new();
        let mut i = 5; // header
        while i < words.len() {
            let word_count = (words[i] >> 16) as usize;
            assert!(word_count >= 1, "zero-length instruction word");
            opcodes.push(words[i] & 0xFFFF);
            i += word_count;
        }
        opcodes
    }

    /// Extract the mnemonic stream from the assembly text.
    fn text_mnemonics(text: &str) -> Vec<String> {
        text.lines()
            .map(|line| {
                let rest = match line.split_once(" = ") {
                    Some((_, rest)) => rest,
                    None => line,
                };
                rest.split_whitespace()
                    .next()
                    .expect("non-empty line")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn binary_header_words() {
        let m = sample_module();
        let bound = m.bound();
        let bytes = BinaryPrinter::new(&m).print();
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words[0], 0x0723_0203);
        assert_eq!(words[1], 0x0001_0300);
        assert_eq!(words[2], 0);
        assert_eq!(words[3], bound);
        assert_eq!(words[4], 0);
    }

    #[test]
    fn serializers_agree_on_the_opcode_sequence() {
        let m = sample_module();
        let text = TextPrinter::new(&m).print();
        let bytes = BinaryPrinter::new(&m).print();

        let text_ops = text_mnemonics(&text);
        let binary_ops = binary_opcodes(&bytes);
        assert_eq!(text_ops.len(), binary_ops.len());

        // OpCapability/OpMemoryModel/OpLabel/... names line up one-to-one
        // with the decoded opcode words.
        let expect = |mnemonic: &str, word: u32| {
            assert_eq!(
                text_ops.iter().filter(|m| m.as_str() == mnemonic).count(),
                binary_ops.iter().filter(|&&w| w == word).count(),
                "mismatch for {mnemonic}"
            );
        };
        expect("OpCapability", Opcode::Capability.word());
        expect("OpMemoryModel", Opcode::MemoryModel.word());
        expect("OpTypeFunction", Opcode::TypeFunction.word());
        expect("OpConstant", Opcode::Constant.word());
        expect("OpFunction", Opcode::Function.word());
        expect("OpLabel", Opcode::Label.word());
        expect("OpIAdd", Opcode::IAdd.word());
        expect("OpReturnValue", Opcode::ReturnValue.word());
        expect("OpFunctionEnd", Opcode::FunctionEnd.word());
    }

    #[test]
    fn serializer_output_is_deterministic() {
        let text_a = TextPrinter::new(&sample_module()).print();
        let text_b = TextPrinter::new(&sample_module()).print();
        assert_eq!(text_a, text_b);

        let bin_a = BinaryPrinter::new(&sample_module()).print();
        let bin_b = BinaryPrinter::new(&sample_module()).print();
        assert_eq!(bin_a, bin_b);
    }

    #[test]
    fn text_names_follow_the_kind_name_id_scheme() {
        let m = sample_module();
        let text = TextPrinter::new(&m).print();
        assert!(text.contains("%type_void_1 = OpTypeVoid"), "{text}");
        assert!(text.contains("%type_int32_2 = OpTypeInt 32 1"), "{text}");
        assert!(text.contains("%type_func_f_3 = OpTypeFunction %type_int32_2 %type_int32_2"), "{text}");
        assert!(text.contains("%func_f_4 = OpFunction %type_int32_2 None %type_func_f_3"), "{text}");
        assert!(text.contains("%value_x_5 = OpFunctionParameter %type_int32_2"), "{text}");
        assert!(text.contains("%block_entry_6 = OpLabel"), "{text}");
        assert!(text.contains("OpCapability Shader"), "{text}");
        assert!(text.contains("OpCapability Linkage"), "{text}");
        assert!(text.contains("OpMemoryModel Logical GLSL450"), "{text}");
    }
}
