//! Opcode descriptors
//!
//! [`OpcodeDesc`] is the declaration form: every option with its default,
//! set through chained builder methods. The registry validates a descriptor
//! as a whole and freezes it into an [`Opcode`].

use crate::encoding::{Encoding, EncodingSpec};
use crate::error::{RegistryError, Result};
use crate::immediate::ImmediateRef;
use std::fmt;
use std::str::FromStr;

// ================================================================================================
// Arity
// ================================================================================================

/// Operand count of one side of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Known, fixed count
    Fixed(u32),
    /// Count only known at a later compilation stage
    Variable,
}

impl Arity {
    /// Count for table purposes; variable arity reports 0
    pub const fn count(self) -> u32 {
        match self {
            Arity::Fixed(n) => n,
            Arity::Variable => 0,
        }
    }

    pub const fn is_variable(self) -> bool {
        matches!(self, Arity::Variable)
    }
}

impl From<u32> for Arity {
    fn from(count: u32) -> Self {
        Arity::Fixed(count)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variable => write!(f, "variable"),
        }
    }
}

// ================================================================================================
// Schedule Class
// ================================================================================================

/// Ordering hint consumed by the instruction scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScheduleClass {
    /// Free to move
    #[default]
    None,
    Load,
    Store,
    Atomic,
    /// Ordered against every memory access
    Barrier,
    /// Ordered against coverage and tilebuffer access
    Coverage,
    /// Must stay at the top of its block
    Preload,
    /// Never moved
    Invalid,
}

impl ScheduleClass {
    /// Every schedule class, in tag order
    pub const ALL: [ScheduleClass; 8] = [
        ScheduleClass::None,
        ScheduleClass::Load,
        ScheduleClass::Store,
        ScheduleClass::Atomic,
        ScheduleClass::Barrier,
        ScheduleClass::Coverage,
        ScheduleClass::Preload,
        ScheduleClass::Invalid,
    ];

    /// Tag used in the generated tables
    pub const fn as_str(self) -> &'static str {
        match self {
            ScheduleClass::None => "none",
            ScheduleClass::Load => "load",
            ScheduleClass::Store => "store",
            ScheduleClass::Atomic => "atomic",
            ScheduleClass::Barrier => "barrier",
            ScheduleClass::Coverage => "coverage",
            ScheduleClass::Preload => "preload",
            ScheduleClass::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ScheduleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleClass {
    type Err = RegistryError;

    fn from_str(tag: &str) -> Result<Self> {
        ScheduleClass::ALL
            .into_iter()
            .find(|class| class.as_str() == tag)
            .ok_or_else(|| RegistryError::InvalidScheduleClass(tag.to_string()))
    }
}

// ================================================================================================
// Declaration
// ================================================================================================

/// Declaration of one opcode, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeDesc {
    pub name: String,
    /// Absent for pseudo-instructions with no machine form
    pub encoding: Option<EncodingSpec>,
    /// Defaults to one destination
    pub dests: Arity,
    /// Defaults to no sources
    pub srcs: Arity,
    /// Immediates in operand order
    pub imms: Vec<ImmediateRef>,
    pub is_float: bool,
    /// Defaults to true
    pub can_eliminate: bool,
    /// Defaults to true
    pub can_reorder: bool,
    pub schedule_class: ScheduleClass,
}

impl OpcodeDesc {
    /// Pseudo-op with default options
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: None,
            dests: Arity::Fixed(1),
            srcs: Arity::Fixed(0),
            imms: Vec::new(),
            is_float: false,
            can_eliminate: true,
            can_reorder: true,
            schedule_class: ScheduleClass::None,
        }
    }

    pub fn encoding(mut self, encoding: EncodingSpec) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Single-length encoding
    pub fn encode(self, exact: u64, length: u8) -> Self {
        self.encoding(EncodingSpec::fixed(exact, length))
    }

    /// Extensible encoding
    pub fn encode_ext(self, exact: u64, short_length: u8, long_length: u8) -> Self {
        self.encoding(EncodingSpec::extensible(exact, short_length, long_length))
    }

    pub fn dests(mut self, dests: impl Into<Arity>) -> Self {
        self.dests = dests.into();
        self
    }

    pub fn srcs(mut self, srcs: impl Into<Arity>) -> Self {
        self.srcs = srcs.into();
        self
    }

    /// Replace the immediate list
    pub fn imms<I, R>(mut self, imms: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ImmediateRef>,
    {
        self.imms = imms.into_iter().map(Into::into).collect();
        self
    }

    /// Append one immediate
    pub fn imm(mut self, imm: impl Into<ImmediateRef>) -> Self {
        self.imms.push(imm.into());
        self
    }

    pub fn float(mut self, is_float: bool) -> Self {
        self.is_float = is_float;
        self
    }

    pub fn can_eliminate(mut self, can_eliminate: bool) -> Self {
        self.can_eliminate = can_eliminate;
        self
    }

    /// Shorthand for `can_eliminate(false)`
    pub fn side_effects(self) -> Self {
        self.can_eliminate(false)
    }

    pub fn can_reorder(mut self, can_reorder: bool) -> Self {
        self.can_reorder = can_reorder;
        self
    }

    pub fn schedule(mut self, schedule_class: ScheduleClass) -> Self {
        self.schedule_class = schedule_class;
        self
    }

    /// Check everything that does not need registry state
    ///
    /// Returns the validated encoding, if any.
    pub fn validate(&self) -> Result<Option<Encoding>> {
        let encoding = self.encoding.map(Encoding::try_from).transpose()?;

        if encoding.is_some() && (self.dests.is_variable() || self.srcs.is_variable()) {
            return Err(RegistryError::InvalidArity {
                opcode: self.name.clone(),
            });
        }

        Ok(encoding)
    }
}

// ================================================================================================
// Frozen Opcode
// ================================================================================================

/// A validated opcode as stored in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub(crate) name: String,
    pub(crate) dests: Arity,
    pub(crate) srcs: Arity,
    pub(crate) imms: Vec<ImmediateRef>,
    pub(crate) is_float: bool,
    pub(crate) can_eliminate: bool,
    pub(crate) can_reorder: bool,
    pub(crate) schedule_class: ScheduleClass,
    pub(crate) encoding: Option<Encoding>,
}

impl Opcode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dests(&self) -> Arity {
        self.dests
    }

    pub fn srcs(&self) -> Arity {
        self.srcs
    }

    /// Immediates in operand order
    pub fn imms(&self) -> &[ImmediateRef] {
        &self.imms
    }

    pub fn is_float(&self) -> bool {
        self.is_float
    }

    /// May an unused result be dropped?
    pub fn can_eliminate(&self) -> bool {
        self.can_eliminate
    }

    pub fn can_reorder(&self) -> bool {
        self.can_reorder
    }

    pub fn schedule_class(&self) -> ScheduleClass {
        self.schedule_class
    }

    pub fn encoding(&self) -> Option<&Encoding> {
        self.encoding.as_ref()
    }

    /// Pseudo-instructions have no machine encoding
    pub fn is_pseudo(&self) -> bool {
        self.encoding.is_none()
    }

    pub fn takes_immediate(&self, name: &str) -> bool {
        self.imms.iter().any(|imm| imm.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let desc = OpcodeDesc::new("mov");
        assert_eq!(desc.dests, Arity::Fixed(1));
        assert_eq!(desc.srcs, Arity::Fixed(0));
        assert!(desc.imms.is_empty());
        assert!(!desc.is_float);
        assert!(desc.can_eliminate);
        assert!(desc.can_reorder);
        assert_eq!(desc.schedule_class, ScheduleClass::None);
        assert!(desc.encoding.is_none());
    }

    #[test]
    fn variable_arity_counts_as_zero() {
        assert_eq!(Arity::Variable.count(), 0);
        assert!(Arity::Variable.is_variable());
        assert_eq!(Arity::from(3).count(), 3);
        assert!(!Arity::Fixed(0).is_variable());
    }

    #[test]
    fn schedule_class_round_trips_through_tags() {
        for class in ScheduleClass::ALL {
            assert_eq!(class.as_str().parse::<ScheduleClass>().unwrap(), class);
        }
    }

    #[test]
    fn unknown_schedule_class_is_rejected() {
        let err = "sometimes".parse::<ScheduleClass>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidScheduleClass(tag) if tag == "sometimes"));
    }

    #[test]
    fn encoded_opcodes_need_fixed_arity() {
        let desc = OpcodeDesc::new("collect").srcs(Arity::Variable).encode(0x3E, 6);
        assert!(matches!(desc.validate(), Err(RegistryError::InvalidArity { .. })));

        let desc = OpcodeDesc::new("collect").srcs(Arity::Variable);
        assert_eq!(desc.validate().unwrap(), None);
    }

    #[test]
    fn validate_checks_encoding() {
        let desc = OpcodeDesc::new("fadd").encode_ext(0x2A, 4, 6).srcs(2).float(true);
        let enc = desc.validate().unwrap().unwrap();
        assert!(enc.extensible());

        let desc = OpcodeDesc::new("broken").encode_ext(0x2A, 4, 10);
        assert!(matches!(desc.validate(), Err(RegistryError::EncodingInvariant { .. })));
    }

    #[test]
    fn immediates_keep_operand_order() {
        let desc = OpcodeDesc::new("icmp").imms(["icond", "invert_cond"]).imm("nest");
        let names: Vec<&str> = desc.imms.iter().map(ImmediateRef::name).collect();
        assert_eq!(names, vec!["icond", "invert_cond", "nest"]);
    }
}
