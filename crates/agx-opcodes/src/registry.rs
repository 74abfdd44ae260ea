//! Registry builder and frozen opcode table
//!
//! All declarations go through [`RegistryBuilder`], which checks every
//! invariant before inserting anything. [`RegistryBuilder::finish`] turns the
//! builder into a [`Registry`]: an immutable, cheaply clonable handle that is
//! the only thing consumers see.
//!
//! # Example
//!
//! ```
//! use agx_opcodes::{NativeType, OpcodeDesc, RegistryBuilder};
//!
//! # fn main() -> agx_opcodes::Result<()> {
//! let mut builder = RegistryBuilder::new();
//! let shift = builder.declare_immediate("shift", NativeType::default())?;
//! builder.declare_opcode(OpcodeDesc::new("iadd").encode(0x0E, 8).srcs(2).imm(&shift))?;
//!
//! let registry = builder.finish();
//! let iadd = registry.opcode("iadd").unwrap();
//! assert!(!iadd.encoding().unwrap().extensible());
//! # Ok(())
//! # }
//! ```

use crate::enums::EnumDef;
use crate::error::{Namespace, RegistryError, Result};
use crate::immediate::{Immediate, ImmediateRef, NativeType};
use crate::opcode::{Opcode, OpcodeDesc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn rejected(err: RegistryError) -> RegistryError {
    warn!(error = %err, "declaration rejected");
    err
}

#[derive(Debug, Default)]
struct Tables {
    immediates: Vec<Immediate>,
    immediate_index: HashMap<String, usize>,
    enums: Vec<EnumDef>,
    enum_index: HashMap<String, usize>,
    opcodes: Vec<Opcode>,
    opcode_index: HashMap<String, usize>,
}

// ================================================================================================
// Builder
// ================================================================================================

/// Mutable registry, populated during initialisation
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tables: Tables,
}

impl RegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plain immediate
    ///
    /// Immediates and enums share one namespace.
    pub fn declare_immediate(&mut self, name: &str, native_type: NativeType) -> Result<ImmediateRef> {
        if self.tables.immediate_index.contains_key(name) {
            return Err(rejected(RegistryError::duplicate(Namespace::Immediate, name)));
        }

        debug!(immediate = name, ty = %native_type, "declared immediate");
        self.insert_immediate(Immediate::new(name, native_type));
        Ok(ImmediateRef::named(name))
    }

    /// Declare an enum and the immediate of the same name that carries it
    ///
    /// Either both halves are inserted or neither is.
    pub fn declare_enum<S: Into<String>>(
        &mut self,
        name: &str,
        members: impl IntoIterator<Item = (u32, S)>,
    ) -> Result<ImmediateRef> {
        let def = EnumDef::new(name, members).map_err(rejected)?;

        if self.tables.immediate_index.contains_key(name) {
            return Err(rejected(RegistryError::duplicate(Namespace::Immediate, name)));
        }

        debug!(enum_name = name, members = def.len(), "declared enum");
        self.tables
            .enum_index
            .insert(name.to_string(), self.tables.enums.len());
        self.tables.enums.push(def);
        self.insert_immediate(Immediate::new(name, NativeType::enum_of(name)));
        Ok(ImmediateRef::named(name))
    }

    /// Validate and append one opcode
    pub fn declare_opcode(&mut self, desc: OpcodeDesc) -> Result<()> {
        if self.tables.opcode_index.contains_key(&desc.name) {
            return Err(rejected(RegistryError::duplicate(Namespace::Opcode, desc.name)));
        }

        let encoding = desc.validate().map_err(rejected)?;

        if let Some(missing) = desc
            .imms
            .iter()
            .find(|imm| !self.tables.immediate_index.contains_key(imm.name()))
        {
            return Err(rejected(RegistryError::unknown_immediate(&desc.name, missing.name())));
        }

        debug!(
            opcode = desc.name.as_str(),
            dests = %desc.dests,
            srcs = %desc.srcs,
            schedule = %desc.schedule_class,
            pseudo = encoding.is_none(),
            "declared opcode"
        );

        let opcode = Opcode {
            name: desc.name,
            dests: desc.dests,
            srcs: desc.srcs,
            imms: desc.imms,
            is_float: desc.is_float,
            can_eliminate: desc.can_eliminate,
            can_reorder: desc.can_reorder,
            schedule_class: desc.schedule_class,
            encoding,
        };
        self.tables
            .opcode_index
            .insert(opcode.name.clone(), self.tables.opcodes.len());
        self.tables.opcodes.push(opcode);
        Ok(())
    }

    /// Declare a sequence of opcodes in order, stopping at the first failure
    pub fn declare_all(&mut self, descs: impl IntoIterator<Item = OpcodeDesc>) -> Result<()> {
        descs.into_iter().try_for_each(|desc| self.declare_opcode(desc))
    }

    /// Is the name taken in the immediate/enum namespace?
    pub fn has_immediate(&self, name: &str) -> bool {
        self.tables.immediate_index.contains_key(name)
    }

    pub fn has_opcode(&self, name: &str) -> bool {
        self.tables.opcode_index.contains_key(name)
    }

    /// Freeze the tables
    pub fn finish(self) -> Registry {
        info!(
            opcodes = self.tables.opcodes.len(),
            immediates = self.tables.immediates.len(),
            enums = self.tables.enums.len(),
            "opcode registry finished"
        );
        Registry {
            tables: Arc::new(self.tables),
        }
    }

    fn insert_immediate(&mut self, immediate: Immediate) {
        self.tables
            .immediate_index
            .insert(immediate.name().to_string(), self.tables.immediates.len());
        self.tables.immediates.push(immediate);
    }
}

// ================================================================================================
// Frozen Registry
// ================================================================================================

/// An immediate together with its enum members, when it has any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedImmediate<'a> {
    pub immediate: &'a Immediate,
    /// Present when the immediate's enum is declared in this registry
    pub enum_def: Option<&'a EnumDef>,
}

/// Immutable opcode table
///
/// Clones share the same tables.
#[derive(Debug, Clone)]
pub struct Registry {
    tables: Arc<Tables>,
}

impl Registry {
    /// Opcodes in declaration order
    pub fn opcodes(&self) -> impl ExactSizeIterator<Item = &Opcode> {
        self.tables.opcodes.iter()
    }

    pub fn opcode(&self, name: &str) -> Option<&Opcode> {
        self.opcode_index(name).map(|index| &self.tables.opcodes[index])
    }

    /// Position of the opcode in declaration order
    pub fn opcode_index(&self, name: &str) -> Option<usize> {
        self.tables.opcode_index.get(name).copied()
    }

    pub fn num_opcodes(&self) -> usize {
        self.tables.opcodes.len()
    }

    /// Immediates (enum-backed ones included) in declaration order
    pub fn immediates(&self) -> impl ExactSizeIterator<Item = &Immediate> {
        self.tables.immediates.iter()
    }

    pub fn immediate(&self, name: &str) -> Option<&Immediate> {
        self.immediate_index(name).map(|index| &self.tables.immediates[index])
    }

    /// Position of the immediate in declaration order
    pub fn immediate_index(&self, name: &str) -> Option<usize> {
        self.tables.immediate_index.get(name).copied()
    }

    /// Enums in declaration order
    pub fn enums(&self) -> impl ExactSizeIterator<Item = &EnumDef> {
        self.tables.enums.iter()
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.tables.enum_index.get(name).map(|&index| &self.tables.enums[index])
    }

    /// Resolve an opcode's immediate reference
    pub fn resolve(&self, imm: &ImmediateRef) -> Option<ResolvedImmediate<'_>> {
        let immediate = self.immediate(imm.name())?;
        let enum_def = immediate
            .native_type()
            .enum_name()
            .and_then(|name| self.enum_def(name));
        Some(ResolvedImmediate { immediate, enum_def })
    }

    /// Resolve all immediates of an opcode, in operand order
    ///
    /// Yields one entry per reference. Opcodes declared through the builder
    /// only reference declared immediates, so every entry is `Some`.
    pub fn resolve_all<'a>(
        &'a self,
        opcode: &'a Opcode,
    ) -> impl ExactSizeIterator<Item = Option<ResolvedImmediate<'a>>> + 'a {
        opcode.imms().iter().map(move |imm| self.resolve(imm))
    }

    /// Flag word with bit `i` set when the opcode takes the `i`-th declared immediate
    ///
    /// Returns `None` if one of the immediates sits beyond bit 63.
    pub fn immediate_mask(&self, opcode: &Opcode) -> Option<u64> {
        opcode.imms().iter().try_fold(0u64, |mask, imm| {
            let index = self.immediate_index(imm.name())?;
            let bit = 1u64.checked_shl(u32::try_from(index).ok()?)?;
            Some(mask | bit)
        })
    }

    /// Largest fixed source count
    pub fn max_srcs(&self) -> u32 {
        self.opcodes().map(|op| op.srcs().count()).max().unwrap_or(0)
    }

    /// Largest fixed destination count
    pub fn max_dests(&self) -> u32 {
        self.opcodes().map(|op| op.dests().count()).max().unwrap_or(0)
    }
}
