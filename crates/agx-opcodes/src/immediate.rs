//! Immediate operand descriptors
//!
//! An immediate is any non-register operand carried in the instruction word:
//! constants, mode selectors, branch targets. Opcodes refer to immediates by
//! name through [`ImmediateRef`]; the registry resolves the reference.

use std::fmt;

/// Prefix used when spelling enum and block types for generated C
pub const C_PREFIX: &str = "agx";

/// Names of the AGX immediates
///
/// Shared by the table and the family generators.
pub mod names {
    pub const FORMAT: &str = "format";
    pub const IMM: &str = "imm";
    pub const WRITEOUT: &str = "writeout";
    pub const INDEX: &str = "index";
    pub const COMPONENT: &str = "component";
    pub const CHANNELS: &str = "channels";
    pub const TRUTH_TABLE: &str = "truth_table";
    pub const ROUND: &str = "round";
    pub const SHIFT: &str = "shift";
    pub const MASK: &str = "mask";
    pub const BFI_MASK: &str = "bfi_mask";
    pub const LOD_MODE: &str = "lod_mode";
    pub const PIXEL_OFFSET: &str = "pixel_offset";
    pub const STACK_SIZE: &str = "stack_size";
    pub const EXPLICIT_COORDS: &str = "explicit_coords";
    pub const DIM: &str = "dim";
    pub const GATHER: &str = "gather";
    pub const OFFSET: &str = "offset";
    pub const SHADOW: &str = "shadow";
    pub const SPARSE: &str = "sparse";
    pub const QUERY_LOD: &str = "query_lod";
    pub const COHERENT: &str = "coherent";
    pub const SCOREBOARD: &str = "scoreboard";
    pub const ICOND: &str = "icond";
    pub const FCOND: &str = "fcond";
    pub const NEST: &str = "nest";
    pub const INVERT_COND: &str = "invert_cond";
    pub const TARGET: &str = "target";
    pub const ZS: &str = "zs";
    pub const SR: &str = "sr";
    pub const ATOMIC_OPC: &str = "atomic_opc";
    pub const INTERPOLATION: &str = "interpolation";
    pub const SIMD_OP: &str = "simd_op";
}

// ================================================================================================
// Native Types
// ================================================================================================

/// Storage representation of an immediate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum NativeType {
    /// 32-bit unsigned
    #[default]
    U32,
    /// 64-bit unsigned
    U64,
    /// Signed 16-bit
    I16,
    Bool,
    /// Value of the named enum
    ///
    /// The enum may be declared in the registry (and then exposes its
    /// members) or live in the consumer's headers.
    Enum(String),
    /// Opaque reference to a control-flow block
    BlockRef,
}

impl NativeType {
    /// Enum-of-`name` type
    pub fn enum_of(name: impl Into<String>) -> Self {
        NativeType::Enum(name.into())
    }

    /// Name of the enum this type denotes, if any
    pub fn enum_name(&self) -> Option<&str> {
        match self {
            NativeType::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// C spelling of the type, as emitted into generated headers
    pub fn c_type(&self) -> String {
        match self {
            NativeType::U32 => "uint32_t".to_string(),
            NativeType::U64 => "uint64_t".to_string(),
            NativeType::I16 => "int16_t".to_string(),
            NativeType::Bool => "bool".to_string(),
            NativeType::Enum(name) => format!("enum {}_{}", C_PREFIX, name),
            NativeType::BlockRef => format!("{}_block *", C_PREFIX),
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::U32 => write!(f, "u32"),
            NativeType::U64 => write!(f, "u64"),
            NativeType::I16 => write!(f, "i16"),
            NativeType::Bool => write!(f, "bool"),
            NativeType::Enum(name) => write!(f, "enum-of-{}", name),
            NativeType::BlockRef => write!(f, "block"),
        }
    }
}

// ================================================================================================
// Immediates
// ================================================================================================

/// A declared immediate operand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Immediate {
    name: String,
    native_type: NativeType,
}

impl Immediate {
    pub(crate) fn new(name: impl Into<String>, native_type: NativeType) -> Self {
        Self {
            name: name.into(),
            native_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_type(&self) -> &NativeType {
        &self.native_type
    }

    /// Does the immediate hold an enum value?
    pub fn is_enum(&self) -> bool {
        self.native_type.enum_name().is_some()
    }
}

/// Reference from an opcode to an immediate, by name
///
/// References are resolved when the opcode is declared, so a reference to an
/// undeclared immediate is rejected at that point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ImmediateRef(String);

impl ImmediateRef {
    /// Refer to an immediate by name
    pub fn named(name: impl Into<String>) -> Self {
        ImmediateRef(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImmediateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImmediateRef {
    fn from(name: &str) -> Self {
        ImmediateRef(name.to_string())
    }
}

impl From<String> for ImmediateRef {
    fn from(name: String) -> Self {
        ImmediateRef(name)
    }
}

impl From<&ImmediateRef> for ImmediateRef {
    fn from(imm: &ImmediateRef) -> Self {
        imm.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_type_is_u32() {
        assert_eq!(NativeType::default(), NativeType::U32);
        assert_eq!(NativeType::default().c_type(), "uint32_t");
    }

    #[test]
    fn c_type_spelling() {
        assert_eq!(NativeType::U64.c_type(), "uint64_t");
        assert_eq!(NativeType::I16.c_type(), "int16_t");
        assert_eq!(NativeType::Bool.c_type(), "bool");
        assert_eq!(NativeType::enum_of("dim").c_type(), "enum agx_dim");
        assert_eq!(NativeType::BlockRef.c_type(), "agx_block *");
    }

    #[test]
    fn enum_type_reports_its_name() {
        let ty = NativeType::enum_of("simd_op");
        assert_eq!(ty.enum_name(), Some("simd_op"));
        assert_eq!(ty.to_string(), "enum-of-simd_op");
        assert_eq!(NativeType::Bool.enum_name(), None);
    }

    #[test]
    fn refs_compare_by_name() {
        assert_eq!(ImmediateRef::named("mask"), ImmediateRef::from("mask"));
        assert_ne!(ImmediateRef::named("mask"), ImmediateRef::from("bfi_mask"));
    }
}
