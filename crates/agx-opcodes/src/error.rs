//! Error types for registry construction
//!
//! Every failure here is a defect in the declarative table itself. Builders
//! return them instead of panicking so the initialising process can report
//! the offending declaration and stop.

use std::fmt;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Which name table a duplicate was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Opcode names
    Opcode,
    /// Immediate names (enums share this table)
    Immediate,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Opcode => write!(f, "opcode"),
            Namespace::Immediate => write!(f, "immediate"),
        }
    }
}

/// Errors raised while declaring immediates, enums, and opcodes
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Name already declared in the same namespace
    #[error("duplicate {namespace} name '{name}'")]
    DuplicateName { namespace: Namespace, name: String },

    /// Enum lists the same integer code twice
    #[error("enum '{name}' declares code {code} more than once")]
    DuplicateEnumCode { name: String, code: u32 },

    /// Variable arity on an opcode that has a machine encoding
    #[error("opcode '{opcode}' has a machine encoding but variable arity")]
    InvalidArity { opcode: String },

    /// Short and long encoding lengths break the growth quantum
    #[error("extensible encoding {short_length} -> {long_length} must grow by exactly {expected}")]
    EncodingInvariant {
        short_length: u8,
        long_length: u8,
        expected: u8,
    },

    /// Schedule class tag outside the closed set
    #[error("invalid schedule class '{0}'")]
    InvalidScheduleClass(String),

    /// Opcode references an immediate that was never declared
    #[error("opcode '{opcode}' references unknown immediate '{immediate}'")]
    UnknownImmediate { opcode: String, immediate: String },

    /// Generator field does not fit its bit width
    #[error("opcode '{opcode}': field {field} = {value} does not fit in {bits} bits")]
    FieldOverflow {
        opcode: String,
        field: &'static str,
        value: u64,
        bits: u32,
    },

    /// Snapshot enum that no immediate of the same name carries
    #[error("enum '{name}' is not carried by an immediate of the same name")]
    OrphanEnum { name: String },

    /// Snapshot field disagrees with the value derived from the rebuilt table
    #[error("{record}: recorded {field} does not match the rebuilt table")]
    DerivedFieldMismatch { record: String, field: &'static str },

    /// Snapshot (de)serialisation failed
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Create a duplicate-name error
    pub fn duplicate(namespace: Namespace, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            namespace,
            name: name.into(),
        }
    }

    /// Create an unknown-immediate error
    pub fn unknown_immediate(opcode: impl Into<String>, immediate: impl Into<String>) -> Self {
        Self::UnknownImmediate {
            opcode: opcode.into(),
            immediate: immediate.into(),
        }
    }

    /// Check that `value` fits in `bits` bits, naming the field on failure
    pub fn check_field(opcode: &str, field: &'static str, value: u64, bits: u32) -> Result<u64> {
        if value >> bits != 0 {
            return Err(Self::FieldOverflow {
                opcode: opcode.to_string(),
                field,
                value,
                bits,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_field_accepts_values_in_range() {
        assert_eq!(RegistryError::check_field("ffs", "subcode", 3, 2).unwrap(), 3);
        assert_eq!(RegistryError::check_field("floor", "subcode", 0, 14).unwrap(), 0);
    }

    #[test]
    fn check_field_rejects_overflow() {
        let err = RegistryError::check_field("bad", "subcode", 4, 2).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::FieldOverflow {
                field: "subcode",
                value: 4,
                bits: 2,
                ..
            }
        ));
    }

    #[test]
    fn messages_name_the_declaration() {
        let err = RegistryError::duplicate(Namespace::Opcode, "fadd");
        assert_eq!(err.to_string(), "duplicate opcode name 'fadd'");

        let err = RegistryError::unknown_immediate("iadd", "shift");
        assert_eq!(err.to_string(), "opcode 'iadd' references unknown immediate 'shift'");
    }
}
