//! Interned type system using `TypeId` handles for O(1) equality.
//!
//! - `TypeId`: u32 handle to an interned type (Copy, trivial Eq/Hash)
//! - `TypeArena`: per-compilation storage with structural deduplication
//!
//! Composite types are canonicalised by a structural hash key, so two
//! structurally equal types share a `TypeId`. Aliases are the exception:
//! creating an alias always allocates a fresh id, which is what makes a
//! strong alias a distinct identity.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Concrete type identity in the `TypeArena`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(u32);

/// SmallVec for type children - inline up to 4 (covers most params/returns).
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

impl TypeId {
    // Reserved TypeIds for the builtins. These are guaranteed to be interned
    // at these indices by TypeArena::new().
    pub const VOID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const UINT: TypeId = TypeId(3);
    pub const FLOAT32: TypeId = TypeId(4);
    pub const FLOAT64: TypeId = TypeId(5);
    pub const STRING: TypeId = TypeId(6);

    pub const F32X2: TypeId = TypeId(7);
    pub const F32X3: TypeId = TypeId(8);
    pub const F32X4: TypeId = TypeId(9);
    pub const F64X2: TypeId = TypeId(10);
    pub const F64X3: TypeId = TypeId(11);
    pub const F64X4: TypeId = TypeId(12);
    pub const I32X2: TypeId = TypeId(13);
    pub const I32X3: TypeId = TypeId(14);
    pub const I32X4: TypeId = TypeId(15);
    pub const U32X2: TypeId = TypeId(16);
    pub const U32X3: TypeId = TypeId(17);
    pub const U32X4: TypeId = TypeId(18);
    pub const B32X2: TypeId = TypeId(19);
    pub const B32X3: TypeId = TypeId(20);
    pub const B32X4: TypeId = TypeId(21);

    /// First non-reserved index.
    pub const FIRST_DYNAMIC: u32 = 22;

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Capability and layout properties of a type. These gate the checker's
/// operator rules and select opcodes during lowering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeProperties {
    pub size: u32,
    pub align: u32,
    pub signed: bool,
    pub integral: bool,
    pub floating: bool,
    pub has_bit_ops: bool,
    pub has_arithmetic: bool,
    pub has_modulus: bool,
    pub has_logic_ops: bool,
    pub has_compare: bool,
    pub has_equality: bool,
}

#[derive(Debug, Clone)]
pub struct StructField {
    /// Declared field name, or the alias name for embedded fields.
    pub name: String,
    /// Embedded fields have no declared identifier of their own.
    pub embedded: bool,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Bool,
    Int,
    Uint,
    Float32,
    Float64,
    Str,
    Vector {
        component: TypeId,
        width: u8,
        props: TypeProperties,
    },
    Func {
        params: TypeIdVec,
        returns: TypeIdVec,
    },
    Array {
        length: i64,
        elem: TypeId,
    },
    Tuple {
        elems: TypeIdVec,
    },
    Struct {
        fields: Vec<StructField>,
        by_name: FxHashMap<String, usize>,
    },
    StrongAlias {
        name: String,
        under: TypeId,
    },
    WeakAlias {
        name: String,
        under: TypeId,
    },
}

pub struct TypeArena {
    types: Vec<TypeKind>,
    interned: FxHashMap<String, TypeId>,
}

impl TypeArena {
    pub fn new() -> TypeArena {
        let mut arena = TypeArena {
            types: Vec::with_capacity(TypeId::FIRST_DYNAMIC as usize),
            interned: FxHashMap::default(),
        };

        arena.types.push(TypeKind::Void);
        arena.types.push(TypeKind::Bool);
        arena.types.push(TypeKind::Int);
        arena.types.push(TypeKind::Uint);
        arena.types.push(TypeKind::Float32);
        arena.types.push(TypeKind::Float64);
        arena.types.push(TypeKind::Str);

        let float = TypeProperties {
            signed: true,
            floating: true,
            has_arithmetic: true,
            has_compare: true,
            has_equality: true,
            ..Default::default()
        };
        let int = TypeProperties {
            signed: true,
            integral: true,
            has_bit_ops: true,
            has_arithmetic: true,
            has_modulus: true,
            has_compare: true,
            has_equality: true,
            ..Default::default()
        };
        let uint = TypeProperties {
            integral: true,
            has_bit_ops: true,
            has_arithmetic: true,
            has_modulus: true,
            has_compare: true,
            has_equality: true,
            ..Default::default()
        };
        let boolean = TypeProperties {
            has_compare: true,
            has_equality: true,
            ..Default::default()
        };

        let vector = |component, width, scalar_size, base: TypeProperties| {
            let size = scalar_size * width as u32;
            let align = if width == 2 { size } else { 16 };
            TypeKind::Vector {
                component,
                width,
                props: TypeProperties {
                    size,
                    align,
                    ..base
                },
            }
        };

        for width in 2..=4u8 {
            arena.types.push(vector(TypeId::FLOAT32, width, 4, float));
        }
        for width in 2..=4u8 {
            arena.types.push(vector(TypeId::FLOAT64, width, 8, float));
        }
        for width in 2..=4u8 {
            arena.types.push(vector(TypeId::INT, width, 4, int));
        }
        for width in 2..=4u8 {
            arena.types.push(vector(TypeId::UINT, width, 4, uint));
        }
        for width in 2..=4u8 {
            arena.types.push(vector(TypeId::BOOL, width, 4, boolean));
        }

        debug_assert_eq!(arena.types.len() as u32, TypeId::FIRST_DYNAMIC);
        arena
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    /// Look up a builtin type by surface name.
    pub fn builtin_by_name(&self, name: &str) -> Option<TypeId> {
        Some(match name {
            "bool" => TypeId::BOOL,
            "int" => TypeId::INT,
            "uint" => TypeId::UINT,
            "float32" => TypeId::FLOAT32,
            "float64" => TypeId::FLOAT64,
            "string" => TypeId::STRING,
            "f32x2" => TypeId::F32X2,
            "f32x3" => TypeId::F32X3,
            "f32x4" => TypeId::F32X4,
            "f64x2" => TypeId::F64X2,
            "f64x3" => TypeId::F64X3,
            "f64x4" => TypeId::F64X4,
            "i32x2" => TypeId::I32X2,
            "i32x3" => TypeId::I32X3,
            "i32x4" => TypeId::I32X4,
            "u32x2" => TypeId::U32X2,
            "u32x3" => TypeId::U32X3,
            "u32x4" => TypeId::U32X4,
            "b32x2" => TypeId::B32X2,
            "b32x3" => TypeId::B32X3,
            "b32x4" => TypeId::B32X4,
            _ => return None,
        })
    }

    pub fn properties(&self, id: TypeId) -> TypeProperties {
        match self.kind(id) {
            TypeKind::Void | TypeKind::Str => TypeProperties::default(),
            TypeKind::Bool => TypeProperties {
                size: 1,
                align: 4,
                has_logic_ops: true,
                has_equality: true,
                ..Default::default()
            },
            TypeKind::Int => TypeProperties {
                size: 4,
                align: 4,
                signed: true,
                integral: true,
                has_bit_ops: true,
                has_arithmetic: true,
                has_modulus: true,
                has_compare: true,
                has_equality: true,
                ..Default::default()
            },
            TypeKind::Uint => TypeProperties {
                size: 4,
                align: 4,
                integral: true,
                has_bit_ops: true,
                has_arithmetic: true,
                has_modulus: true,
                has_compare: true,
                has_equality: true,
                ..Default::default()
            },
            TypeKind::Float32 => TypeProperties {
                size: 4,
                align: 4,
                signed: true,
                floating: true,
                has_arithmetic: true,
                has_compare: true,
                has_equality: true,
                ..Default::default()
            },
            TypeKind::Float64 => TypeProperties {
                size: 8,
                align: 8,
                signed: true,
                floating: true,
                has_arithmetic: true,
                has_compare: true,
                has_equality: true,
                ..Default::default()
            },
            TypeKind::Vector { props, .. } => *props,
            TypeKind::Array { length, elem } => {
                let elem = self.properties(*elem);
                TypeProperties {
                    size: elem.size * (*length).max(0) as u32,
                    align: elem.align,
                    ..Default::default()
                }
            }
            TypeKind::Tuple { elems } => {
                let mut size = 0;
                let mut align = 0;
                for &elem in elems {
                    let p = self.properties(elem);
                    size += p.size;
                    align = align.max(p.align);
                }
                TypeProperties {
                    size,
                    align,
                    ..Default::default()
                }
            }
            TypeKind::Struct { fields, .. } => {
                let mut size = 0;
                let mut align = 0;
                for field in fields {
                    let p = self.properties(field.ty);
                    size += p.size;
                    align = align.max(p.align);
                }
                TypeProperties {
                    size,
                    align,
                    ..Default::default()
                }
            }
            TypeKind::Func { .. } => TypeProperties::default(),
            TypeKind::StrongAlias { under, .. } | TypeKind::WeakAlias { under, .. } => {
                self.properties(*under)
            }
        }
    }

    /// Unwrap aliases. Weak aliases always unwrap; strong aliases only when
    /// `resolve_strong` is set.
    pub fn resolve(&self, id: TypeId, resolve_strong: bool) -> TypeId {
        match self.kind(id) {
            TypeKind::StrongAlias { under, .. } => {
                if resolve_strong {
                    self.resolve(*under, resolve_strong)
                } else {
                    id
                }
            }
            TypeKind::WeakAlias { under, .. } => self.resolve(*under, resolve_strong),
            _ => id,
        }
    }

    /// Alias-aware equality: weak aliases compare by underlying type, strong
    /// aliases only by identity.
    pub fn equal(&self, lhs: TypeId, rhs: TypeId) -> bool {
        self.resolve(lhs, false) == self.resolve(rhs, false)
    }

    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Void => "void".into(),
            TypeKind::Bool => "bool".into(),
            TypeKind::Int => "int".into(),
            TypeKind::Uint => "uint".into(),
            TypeKind::Float32 => "float32".into(),
            TypeKind::Float64 => "float64".into(),
            TypeKind::Str => "string".into(),
            TypeKind::Vector {
                component, width, ..
            } => {
                let prefix = match *component {
                    TypeId::FLOAT32 => "f32",
                    TypeId::FLOAT64 => "f64",
                    TypeId::INT => "i32",
                    TypeId::UINT => "u32",
                    TypeId::BOOL => "b32",
                    _ => unreachable!("vector of a non-scalar component"),
                };
                format!("{prefix}x{width}")
            }
            TypeKind::Func { params, returns } => {
                let mut out = String::from("func(");
                for (i, &p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&self.display(p));
                }
                out.push(')');
                if !returns.is_empty() {
                    out.push('(');
                    for (i, &r) in returns.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        out.push_str(&self.display(r));
                    }
                    out.push(')');
                }
                out
            }
            TypeKind::Array { length, elem } => {
                format!("[{length}]{}", self.display(*elem))
            }
            TypeKind::Tuple { elems } => {
                let mut out = String::from("(");
                for (i, &e) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&self.display(e));
                }
                out.push(')');
                out
            }
            TypeKind::Struct { fields, .. } => {
                let mut out = String::from("struct{");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&self.display(field.ty));
                }
                out.push('}');
                out
            }
            TypeKind::StrongAlias { name, .. } => name.clone(),
            TypeKind::WeakAlias { name, under } => {
                format!("{name}={}", self.display(*under))
            }
        }
    }

    /// Structural key used for interning. Aliases key by name so composites
    /// built over them stay distinct from composites over the underlying
    /// type.
    pub fn hash_key(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::StrongAlias { name, .. } => name.clone(),
            _ => self.display(id),
        }
    }

    fn intern(&mut self, key: String, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        self.interned.insert(key, id);
        id
    }

    pub fn intern_func(&mut self, params: TypeIdVec, returns: TypeIdVec) -> TypeId {
        let mut key = String::from("func(");
        for (i, &p) in params.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&self.hash_key(p));
        }
        key.push(')');
        if !returns.is_empty() {
            key.push('(');
            for (i, &r) in returns.iter().enumerate() {
                if i > 0 {
                    key.push(',');
                }
                key.push_str(&self.hash_key(r));
            }
            key.push(')');
        }
        self.intern(key, TypeKind::Func { params, returns })
    }

    pub fn intern_array(&mut self, length: i64, elem: TypeId) -> TypeId {
        let key = format!("[{length}]{}", self.hash_key(elem));
        self.intern(key, TypeKind::Array { length, elem })
    }

    pub fn intern_tuple(&mut self, elems: TypeIdVec) -> TypeId {
        let mut key = String::from("(");
        for (i, &e) in elems.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&self.hash_key(e));
        }
        key.push(')');
        self.intern(key, TypeKind::Tuple { elems })
    }

    pub fn intern_struct(&mut self, fields: Vec<StructField>) -> TypeId {
        let mut key = String::from("struct{");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&self.hash_key(field.ty));
        }
        key.push('}');
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        self.intern(key, TypeKind::Struct { fields, by_name })
    }

    /// Aliases are never deduplicated: each declaration is its own identity.
    pub fn alias_strong(&mut self, name: String, under: TypeId) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeKind::StrongAlias { name, under });
        id
    }

    pub fn alias_weak(&mut self, name: String, under: TypeId) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeKind::WeakAlias { name, under });
        id
    }

    /// Field lookup on a struct, searching embedded strong-alias struct
    /// fields recursively.
    pub fn find_struct_field(&self, struct_id: TypeId, name: &str) -> Option<TypeId> {
        let TypeKind::Struct { fields, by_name } = self.kind(struct_id) else {
            return None;
        };
        if let Some(&index) = by_name.get(name) {
            return Some(fields[index].ty);
        }
        for field in fields {
            if !field.embedded {
                continue;
            }
            if !matches!(self.kind(field.ty), TypeKind::StrongAlias { .. }) {
                continue;
            }
            let under = self.resolve(field.ty, true);
            if matches!(self.kind(under), TypeKind::Struct { .. }) {
                if let Some(found) = self.find_struct_field(under, name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// The vector builtin for a component type and width, if there is one.
    pub fn vector_of(&self, component: TypeId, width: usize) -> Option<TypeId> {
        let base = match component {
            TypeId::FLOAT32 => TypeId::F32X2,
            TypeId::FLOAT64 => TypeId::F64X2,
            TypeId::INT => TypeId::I32X2,
            TypeId::UINT => TypeId::U32X2,
            TypeId::BOOL => TypeId::B32X2,
            _ => return None,
        };
        match width {
            2 | 3 | 4 => Some(TypeId(base.0 + (width as u32 - 2))),
            _ => None,
        }
    }

    /// The boolean-like result type of a comparison at a vector width.
    pub fn bool_by_width(&self, width: usize) -> TypeId {
        match width {
            1 => TypeId::BOOL,
            2 => TypeId::B32X2,
            3 => TypeId::B32X3,
            4 => TypeId::B32X4,
            _ => unreachable!("unsupported vector width"),
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn composite_interning_is_structural() {
        let mut arena = TypeArena::new();
        let a = arena.intern_func(smallvec![TypeId::INT], smallvec![TypeId::BOOL]);
        let b = arena.intern_func(smallvec![TypeId::INT], smallvec![TypeId::BOOL]);
        assert_eq!(a, b);

        let c = arena.intern_array(3, TypeId::FLOAT32);
        let d = arena.intern_array(3, TypeId::FLOAT32);
        let e = arena.intern_array(4, TypeId::FLOAT32);
        assert_eq!(c, d);
        assert_ne!(c, e);
    }

    #[test]
    fn aliases_are_never_interned() {
        let mut arena = TypeArena::new();
        let a = arena.alias_strong("Celsius".into(), TypeId::FLOAT32);
        let b = arena.alias_strong("Celsius".into(), TypeId::FLOAT32);
        assert_ne!(a, b);
    }

    #[test]
    fn strong_alias_is_a_distinct_identity() {
        let mut arena = TypeArena::new();
        let strong = arena.alias_strong("Celsius".into(), TypeId::FLOAT32);
        assert!(!arena.equal(strong, TypeId::FLOAT32));
        assert!(arena.equal(strong, strong));
        assert_eq!(arena.resolve(strong, true), TypeId::FLOAT32);
    }

    #[test]
    fn weak_alias_compares_by_underlying() {
        let mut arena = TypeArena::new();
        let weak = arena.alias_weak("Celsius".into(), TypeId::FLOAT32);
        assert!(arena.equal(weak, TypeId::FLOAT32));
        assert_eq!(arena.display(weak), "Celsius=float32");
    }

    #[test]
    fn weak_alias_over_strong_alias_keeps_strong_identity() {
        let mut arena = TypeArena::new();
        let strong = arena.alias_strong("Meters".into(), TypeId::FLOAT32);
        let weak = arena.alias_weak("Distance".into(), strong);
        assert!(arena.equal(weak, strong));
        assert!(!arena.equal(weak, TypeId::FLOAT32));
    }

    #[test]
    fn vector_properties_match_the_builtin_tables() {
        let arena = TypeArena::new();
        let f32x3 = arena.properties(TypeId::F32X3);
        assert_eq!((f32x3.size, f32x3.align), (12, 16));
        assert!(f32x3.floating && f32x3.has_arithmetic && !f32x3.has_bit_ops);

        let i32x2 = arena.properties(TypeId::I32X2);
        assert_eq!((i32x2.size, i32x2.align), (8, 8));
        assert!(i32x2.integral && i32x2.has_bit_ops && i32x2.has_modulus);

        let b32x4 = arena.properties(TypeId::B32X4);
        assert!(b32x4.has_equality && !b32x4.has_arithmetic && !b32x4.has_logic_ops);
    }

    #[test]
    fn embedded_struct_field_lookup() {
        let mut arena = TypeArena::new();
        let base = arena.intern_struct(vec![StructField {
            name: "depth".into(),
            embedded: false,
            ty: TypeId::FLOAT32,
        }]);
        let base_alias = arena.alias_strong("Base".into(), base);
        let outer = arena.intern_struct(vec![
            StructField {
                name: "x".into(),
                embedded: false,
                ty: TypeId::FLOAT32,
            },
            StructField {
                name: "Base".into(),
                embedded: true,
                ty: base_alias,
            },
        ]);
        assert_eq!(arena.find_struct_field(outer, "x"), Some(TypeId::FLOAT32));
        assert_eq!(arena.find_struct_field(outer, "depth"), Some(TypeId::FLOAT32));
        assert_eq!(arena.find_struct_field(outer, "Base"), Some(base_alias));
        assert_eq!(arena.find_struct_field(outer, "missing"), None);
    }

    #[test]
    fn display_formats() {
        let mut arena = TypeArena::new();
        let f = arena.intern_func(
            smallvec![TypeId::INT, TypeId::FLOAT32],
            smallvec![TypeId::BOOL],
        );
        assert_eq!(arena.display(f), "func(int,float32)(bool)");
        let t = arena.intern_tuple(smallvec![TypeId::INT, TypeId::INT]);
        assert_eq!(arena.display(t), "(int,int)");
        assert_eq!(arena.display(TypeId::F64X4), "f64x4");
    }
}
