//! Serialisable view of a finished registry
//!
//! The snapshot is what code generators read: every opcode in declaration
//! order with its operands, flags, and encoding facts, plus the immediates
//! and enums they reference.
//!
//! # Formats
//!
//! - **JSON**: pretty-printed via [`TableSnapshot::to_json`], for generators and review
//!
//! A snapshot can be turned back into a [`Registry`]; the rebuild runs every
//! declaration through the builder again, so a hand-edited snapshot is held
//! to the same rules as the table source. Every enum must be carried by the
//! immediate of the same name, and the derived fields (`c_type`,
//! `immediate_mask`, `extensible`) must agree with the rebuilt table.

use crate::encoding::Encoding;
use crate::error::{Namespace, RegistryError, Result};
use crate::immediate::NativeType;
use crate::opcode::{Arity, OpcodeDesc, ScheduleClass};
use crate::registry::{Registry, RegistryBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Complete opcode table package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSnapshot {
    /// All immediates in declaration order (enum-backed ones included)
    pub immediates: Vec<SerializedImmediate>,
    /// Enums declared in the registry
    #[serde(default)]
    pub enums: Vec<SerializedEnum>,
    /// Opcodes in declaration order
    pub opcodes: Vec<SerializedOpcode>,
}

/// Serializable immediate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedImmediate {
    pub name: String,
    pub native_type: NativeType,
    /// C spelling; derived from `native_type` and checked on load
    pub c_type: String,
}

/// Serializable enum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedEnum {
    pub name: String,
    /// `(code, label)` in ascending code order
    pub members: Vec<(u32, String)>,
}

/// Serializable encoding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedEncoding {
    pub exact: u64,
    pub short_length: u8,
    pub long_length: u8,
    /// Derived from the lengths; checked on load
    pub extensible: bool,
}

impl From<&Encoding> for SerializedEncoding {
    fn from(encoding: &Encoding) -> Self {
        Self {
            exact: encoding.exact(),
            short_length: encoding.short_length(),
            long_length: encoding.long_length(),
            extensible: encoding.extensible(),
        }
    }
}

/// Serializable opcode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedOpcode {
    pub name: String,
    /// 0 when variable
    pub dests: u32,
    pub variable_dests: bool,
    /// 0 when variable
    pub srcs: u32,
    pub variable_srcs: bool,
    /// Immediate names in operand order
    pub imms: Vec<String>,
    /// Bit `i` set for the `i`-th declared immediate
    ///
    /// Derived; checked on load when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate_mask: Option<u64>,
    pub is_float: bool,
    pub can_eliminate: bool,
    pub can_reorder: bool,
    pub schedule_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<SerializedEncoding>,
}

fn serialized_arity(arity: Arity) -> (u32, bool) {
    (arity.count(), arity.is_variable())
}

fn parsed_arity(count: u32, variable: bool) -> Arity {
    if variable {
        Arity::Variable
    } else {
        Arity::Fixed(count)
    }
}

impl TableSnapshot {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn enum_members(&self, name: &str) -> Option<&SerializedEnum> {
        self.enums.iter().find(|e| e.name == name)
    }
}

impl Registry {
    /// Capture the registry for serialisation
    pub fn snapshot(&self) -> TableSnapshot {
        let immediates = self
            .immediates()
            .map(|imm| SerializedImmediate {
                name: imm.name().to_string(),
                native_type: imm.native_type().clone(),
                c_type: imm.native_type().c_type(),
            })
            .collect();

        let enums = self
            .enums()
            .map(|e| SerializedEnum {
                name: e.name().to_string(),
                members: e.members().map(|(code, label)| (code, label.to_string())).collect(),
            })
            .collect();

        let opcodes = self
            .opcodes()
            .map(|op| {
                let (dests, variable_dests) = serialized_arity(op.dests());
                let (srcs, variable_srcs) = serialized_arity(op.srcs());
                SerializedOpcode {
                    name: op.name().to_string(),
                    dests,
                    variable_dests,
                    srcs,
                    variable_srcs,
                    imms: op.imms().iter().map(|imm| imm.name().to_string()).collect(),
                    immediate_mask: self.immediate_mask(op),
                    is_float: op.is_float(),
                    can_eliminate: op.can_eliminate(),
                    can_reorder: op.can_reorder(),
                    schedule_class: op.schedule_class().to_string(),
                    encoding: op.encoding().map(SerializedEncoding::from),
                }
            })
            .collect();

        TableSnapshot {
            immediates,
            enums,
            opcodes,
        }
    }

    /// Rebuild a registry from a snapshot, validating every declaration
    pub fn from_snapshot(snapshot: &TableSnapshot) -> Result<Registry> {
        let mut enum_names = HashSet::new();
        if let Some(repeated) = snapshot.enums.iter().find(|e| !enum_names.insert(e.name.as_str())) {
            return Err(RegistryError::duplicate(Namespace::Immediate, repeated.name.as_str()));
        }

        let mut builder = RegistryBuilder::new();
        let mut carried = HashSet::new();

        for imm in &snapshot.immediates {
            let own_enum = imm
                .native_type
                .enum_name()
                .filter(|name| *name == imm.name)
                .and_then(|name| snapshot.enum_members(name));

            match own_enum {
                Some(e) => {
                    builder.declare_enum(&e.name, e.members.iter().map(|(code, label)| (*code, label.as_str())))?;
                    carried.insert(e.name.as_str());
                }
                None => {
                    builder.declare_immediate(&imm.name, imm.native_type.clone())?;
                }
            }
        }

        if let Some(orphan) = snapshot.enums.iter().find(|e| !carried.contains(e.name.as_str())) {
            return Err(RegistryError::OrphanEnum {
                name: orphan.name.clone(),
            });
        }

        for op in &snapshot.opcodes {
            let mut desc = OpcodeDesc::new(op.name.as_str())
                .dests(parsed_arity(op.dests, op.variable_dests))
                .srcs(parsed_arity(op.srcs, op.variable_srcs))
                .imms(op.imms.iter().map(String::as_str))
                .float(op.is_float)
                .can_eliminate(op.can_eliminate)
                .can_reorder(op.can_reorder)
                .schedule(ScheduleClass::from_str(&op.schedule_class)?);

            if let Some(enc) = op.encoding {
                desc = desc.encode_ext(enc.exact, enc.short_length, enc.long_length);
            }
            builder.declare_opcode(desc)?;
        }

        let registry = builder.finish();
        check_derived_fields(snapshot, &registry.snapshot())?;
        Ok(registry)
    }
}

fn mismatch(record: &str, field: &'static str) -> RegistryError {
    RegistryError::DerivedFieldMismatch {
        record: record.to_string(),
        field,
    }
}

/// Compare the derived fields of a loaded snapshot with a fresh one
///
/// Both list the same records in the same order.
fn check_derived_fields(loaded: &TableSnapshot, rebuilt: &TableSnapshot) -> Result<()> {
    for (imm, fresh) in loaded.immediates.iter().zip(&rebuilt.immediates) {
        if imm.c_type != fresh.c_type {
            return Err(mismatch(&imm.name, "c_type"));
        }
    }

    for (op, fresh) in loaded.opcodes.iter().zip(&rebuilt.opcodes) {
        if op.immediate_mask.is_some() && op.immediate_mask != fresh.immediate_mask {
            return Err(mismatch(&op.name, "immediate_mask"));
        }
        let extensible = op.encoding.map(|enc| enc.extensible);
        if extensible != fresh.encoding.map(|enc| enc.extensible) {
            return Err(mismatch(&op.name, "extensible"));
        }
    }

    Ok(())
}
