//! Closed integer-to-label enums used as immediate value domains

use crate::error::{RegistryError, Result};
use crate::immediate::C_PREFIX;
use std::collections::BTreeMap;

/// A named, closed mapping from small codes to labels
///
/// Codes need not be contiguous. Iteration is in ascending code order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    members: BTreeMap<u32, String>,
}

impl EnumDef {
    /// Build an enum, rejecting repeated codes
    pub fn new<S: Into<String>>(name: impl Into<String>, members: impl IntoIterator<Item = (u32, S)>) -> Result<Self> {
        let name = name.into();
        let mut map = BTreeMap::new();
        for (code, label) in members {
            if map.insert(code, label.into()).is_some() {
                return Err(RegistryError::DuplicateEnumCode { name, code });
            }
        }
        Ok(Self { name, members: map })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in ascending code order
    pub fn members(&self) -> impl Iterator<Item = (u32, &str)> {
        self.members.iter().map(|(code, label)| (*code, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Label for a code
    pub fn label(&self, code: u32) -> Option<&str> {
        self.members.get(&code).map(String::as_str)
    }

    /// Code for a label
    pub fn code(&self, label: &str) -> Option<u32> {
        self.members()
            .find_map(|(code, member)| (member == label).then_some(code))
    }

    /// C enumerator for a code, e.g. `AGX_DIM_2D_ARRAY`
    ///
    /// Characters that cannot appear in a C identifier become `_`.
    pub fn c_constant(&self, code: u32) -> Option<String> {
        let label = self.label(code)?;
        let ident: String = format!("{}_{}_{}", C_PREFIX, self.name, label)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        Some(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gather() -> EnumDef {
        EnumDef::new(
            "gather",
            [(0b000, "none"), (0b001, "r"), (0b011, "g"), (0b101, "b"), (0b111, "a")],
        )
        .unwrap()
    }

    #[test]
    fn sparse_codes_are_kept() {
        let e = gather();
        assert_eq!(e.len(), 5);
        assert_eq!(e.label(0b101), Some("b"));
        assert_eq!(e.label(0b010), None);
        assert_eq!(e.code("a"), Some(0b111));
    }

    #[test]
    fn members_iterate_by_code() {
        let e = EnumDef::new("x", [(9, "nine"), (1, "one"), (4, "four")]).unwrap();
        let codes: Vec<u32> = e.members().map(|(code, _)| code).collect();
        assert_eq!(codes, vec![1, 4, 9]);
    }

    #[test]
    fn repeated_code_is_rejected() {
        let err = EnumDef::new("bad", [(0, "a"), (0, "b")]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEnumCode { code: 0, .. }));
    }

    #[test]
    fn c_constant_is_an_identifier() {
        let e = EnumDef::new("sr", [(0, "threadgroup_position_in_grid.x")]).unwrap();
        assert_eq!(e.c_constant(0).as_deref(), Some("AGX_SR_THREADGROUP_POSITION_IN_GRID_X"));
        assert_eq!(gather().c_constant(1).as_deref(), Some("AGX_GATHER_R"));
        assert_eq!(gather().c_constant(2), None);
    }
}
