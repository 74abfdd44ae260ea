//! Opcode family generators
//!
//! Each generator expands one conceptual operation into fully formed
//! [`OpcodeDesc`] values composed from shared bit fields. Generators never
//! touch a registry: feed their output through
//! [`RegistryBuilder::declare_all`](crate::RegistryBuilder::declare_all) so
//! every opcode passes the same validation as a hand-written one.

use crate::error::{RegistryError, Result};
use crate::immediate::names as imm;
use crate::opcode::{OpcodeDesc, ScheduleClass};

/// Marks the long form of an ALU word
pub const L: u64 = 1 << 15;

// ================================================================================================
// Unary ALU Families
// ================================================================================================

/// Base opcode shared by the floating-point unary operations
pub const FUNOP_BASE: u64 = 0x0A;
/// Position of the floating-point unary sub-code
pub const FUNOP_SHIFT: u32 = 28;
/// Width of the floating-point unary sub-code field
pub const FUNOP_BITS: u32 = 14;
/// Mask covering the floating-point unary sub-code field
pub const FUNOP_MASK: u64 = ((1 << FUNOP_BITS) - 1) << FUNOP_SHIFT;

/// Base opcode shared by the integer unary operations
pub const IUNOP_BASE: u64 = 0x3E;
/// Position of the integer unary sub-code
pub const IUNOP_SHIFT: u32 = 26;
/// Width of the integer unary sub-code field
pub const IUNOP_BITS: u32 = 2;

/// Single-source floating-point operation sharing the funop word layout
pub fn funop(name: &str, subcode: u64) -> Result<OpcodeDesc> {
    let subcode = RegistryError::check_field(name, "subcode", subcode, FUNOP_BITS)?;
    Ok(OpcodeDesc::new(name)
        .encode_ext(FUNOP_BASE | (subcode << FUNOP_SHIFT), 4, 6)
        .srcs(1)
        .float(true))
}

/// Single-source integer operation with a 2-bit sub-code
pub fn iunop(name: &str, subcode: u64) -> Result<OpcodeDesc> {
    let subcode = RegistryError::check_field(name, "subcode", subcode, IUNOP_BITS)?;
    Ok(OpcodeDesc::new(name)
        .encode(IUNOP_BASE | (subcode << IUNOP_SHIFT), 6)
        .srcs(1))
}

// ================================================================================================
// Subgroup Reductions
// ================================================================================================

/// Base of the subgroup operation word, without the long-form bit
pub const SUBGROUP_BASE: u64 = 0b0110_1111;
/// Position of the 3-bit operation-class selector
pub const SUBGROUP_SHIFT: u32 = 29;

/// Kind of subgroup operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubgroupOp {
    QuadReduce,
    SimdReduce,
    QuadPrefix,
    SimdPrefix,
}

impl SubgroupOp {
    pub const ALL: [SubgroupOp; 4] = [
        SubgroupOp::QuadReduce,
        SubgroupOp::SimdReduce,
        SubgroupOp::QuadPrefix,
        SubgroupOp::SimdPrefix,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SubgroupOp::QuadReduce => "quad_reduce",
            SubgroupOp::SimdReduce => "simd_reduce",
            SubgroupOp::QuadPrefix => "quad_prefix",
            SubgroupOp::SimdPrefix => "simd_prefix",
        }
    }

    /// Operation-class selector
    pub const fn selector(self) -> u64 {
        match self {
            SubgroupOp::QuadReduce => 0x0,
            SubgroupOp::SimdReduce => 0x1,
            SubgroupOp::QuadPrefix => 0x2,
            SubgroupOp::SimdPrefix => 0x3,
        }
    }
}

/// Subgroup operation with an explicit selector
///
/// The reduction operator itself is chosen by the `simd_op` immediate.
pub fn subgroup_op(name: &str, selector: u64) -> Result<OpcodeDesc> {
    let selector = RegistryError::check_field(name, "selector", selector, 3)?;
    Ok(OpcodeDesc::new(name)
        .encode(SUBGROUP_BASE | L | (selector << SUBGROUP_SHIFT), 6)
        .srcs(1)
        .imm(imm::SIMD_OP))
}

/// The four subgroup reduce/prefix opcodes
pub fn subgroup_ops() -> Result<Vec<OpcodeDesc>> {
    SubgroupOp::ALL
        .into_iter()
        .map(|op| subgroup_op(op.name(), op.selector()))
        .collect()
}

// ================================================================================================
// Shuffle / Ballot Grid
// ================================================================================================

/// Lanes a shuffle or ballot spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Quad,
    Simd,
}

impl Window {
    pub const ALL: [Window; 2] = [Window::Quad, Window::Simd];

    /// Name prefix; the full-SIMD window is unprefixed
    pub const fn prefix(self) -> &'static str {
        match self {
            Window::Quad => "quad_",
            Window::Simd => "",
        }
    }

    pub const fn bit(self) -> u64 {
        match self {
            Window::Quad => 0,
            Window::Simd => 1,
        }
    }
}

/// Lane selection rule of a shuffle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shuffle {
    Index,
    Xor,
    Up,
    Down,
}

impl Shuffle {
    pub const ALL: [Shuffle; 4] = [Shuffle::Index, Shuffle::Xor, Shuffle::Up, Shuffle::Down];

    pub const fn suffix(self) -> &'static str {
        match self {
            Shuffle::Index => "",
            Shuffle::Xor => "_xor",
            Shuffle::Up => "_up",
            Shuffle::Down => "_down",
        }
    }

    pub const fn selector(self) -> u64 {
        match self {
            Shuffle::Index => 0,
            Shuffle::Xor => 1,
            Shuffle::Up => 2,
            Shuffle::Down => 3,
        }
    }
}

/// Operand type of a compare-and-ballot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareKind {
    Float,
    Integer,
}

impl CompareKind {
    pub const ALL: [CompareKind; 2] = [CompareKind::Float, CompareKind::Integer];

    pub const fn letter(self) -> &'static str {
        match self {
            CompareKind::Float => "f",
            CompareKind::Integer => "i",
        }
    }

    pub const fn bit(self) -> u64 {
        match self {
            CompareKind::Float => 0,
            CompareKind::Integer => 1,
        }
    }

    /// Immediate holding the condition code
    pub const fn condition(self) -> &'static str {
        match self {
            CompareKind::Float => imm::FCOND,
            CompareKind::Integer => imm::ICOND,
        }
    }
}

/// Exact bits of a shuffle
pub const fn shuffle_exact(window: Window, shuffle: Shuffle) -> u64 {
    SUBGROUP_BASE | (window.bit() << 26) | (shuffle.selector() << 38)
}

/// Exact bits of a compare-and-ballot
pub const fn compare_ballot_exact(window: Window, kind: CompareKind) -> u64 {
    0b010_0010 | (kind.bit() << 4) | (window.bit() << 48)
}

/// Shuffles, ballots, and compare-ballots for one window
///
/// Order: the four shuffles, the ballot pseudo-op, then the float and
/// integer compare-ballots.
pub fn window_ops(window: Window) -> Vec<OpcodeDesc> {
    let prefix = window.prefix();
    let shuffles = Shuffle::ALL.into_iter().map(|shuffle| {
        OpcodeDesc::new(format!("{}shuffle{}", prefix, shuffle.suffix()))
            .encode(shuffle_exact(window, shuffle), 6)
            .srcs(2)
    });

    // Pseudo-instruction ballotting a boolean
    let ballot = OpcodeDesc::new(format!("{}ballot", prefix)).srcs(1);

    let compares = CompareKind::ALL.into_iter().map(|kind| {
        OpcodeDesc::new(format!("{}cmp_{}ballot", kind.letter(), prefix))
            .encode(compare_ballot_exact(window, kind), 8)
            .srcs(2)
            .imms([kind.condition(), imm::INVERT_COND])
    });

    shuffles.chain(std::iter::once(ballot)).chain(compares).collect()
}

/// The full window × operation grid
pub fn shuffle_ballot_grid() -> Vec<OpcodeDesc> {
    Window::ALL.into_iter().flat_map(window_ops).collect()
}

// ================================================================================================
// Memory Barriers
// ================================================================================================

/// Common base of every memory barrier word
pub const BARRIER_BASE: u64 = 0xF5;

/// Memory barrier from three opaque fields
///
/// `a` sits at bit 10, `b` at bit 8, `c` at bit 12. What the fields select is
/// not known; the named variants are kept distinct rather than decoded.
pub fn memory_barrier(name: &str, a: u64, b: u64, c: u64) -> Result<OpcodeDesc> {
    let a = RegistryError::check_field(name, "a", a, 2)?;
    let b = RegistryError::check_field(name, "b", b, 2)?;
    let c = RegistryError::check_field(name, "c", c, 4)?;
    Ok(OpcodeDesc::new(name)
        .encode(BARRIER_BASE | (a << 10) | (b << 8) | (c << 12), 2)
        .dests(0)
        .srcs(0)
        .side_effects()
        .schedule(ScheduleClass::Barrier))
}

/// Barrier variants observed in compiled shaders, as `(name, a, b, c)`
pub const MEMORY_BARRIERS: [(&str, u64, u64, u64); 12] = [
    ("memory_barrier", 1, 2, 9),
    ("image_barrier_1", 2, 2, 10),
    ("image_barrier_2", 3, 2, 10),
    ("image_barrier_3", 2, 1, 10),
    ("image_barrier_4", 3, 1, 10),
    ("flush_memory_to_texture", 0, 0, 4),
    ("memory_barrier_2", 2, 2, 9),
    ("memory_barrier_3", 2, 1, 9),
    ("unknown_barrier_1", 0, 3, 3),
    ("unknown_barrier_2", 0, 3, 0),
    // Seen with device-scope memory barriers
    ("device_barrier_1", 3, 1, 9),
    ("device_barrier_2", 3, 2, 9),
];

pub fn memory_barriers() -> Result<Vec<OpcodeDesc>> {
    MEMORY_BARRIERS
        .iter()
        .map(|&(name, a, b, c)| memory_barrier(name, a, b, c))
        .collect()
}

// ================================================================================================
// Control Flow
// ================================================================================================

/// Structured control-flow construct driven by a compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFlow {
    If,
    Else,
    While,
}

impl ControlFlow {
    pub const ALL: [ControlFlow; 3] = [ControlFlow::If, ControlFlow::Else, ControlFlow::While];

    pub const fn keyword(self) -> &'static str {
        match self {
            ControlFlow::If => "if",
            ControlFlow::Else => "else",
            ControlFlow::While => "while",
        }
    }

    pub const fn selector(self) -> u64 {
        match self {
            ControlFlow::If => 0,
            ControlFlow::Else => 1,
            ControlFlow::While => 2,
        }
    }
}

/// `if_icmp` .. `while_fcmp`: integer variants first, then float
pub fn control_flow_compares() -> Vec<OpcodeDesc> {
    [CompareKind::Integer, CompareKind::Float]
        .into_iter()
        .flat_map(|kind| {
            ControlFlow::ALL.into_iter().map(move |cf| {
                let type_bits = match kind {
                    CompareKind::Float => 0x0,
                    CompareKind::Integer => 0x10,
                };
                let schedule = match cf {
                    ControlFlow::Else => ScheduleClass::Preload,
                    ControlFlow::If | ControlFlow::While => ScheduleClass::Invalid,
                };
                OpcodeDesc::new(format!("{}_{}cmp", cf.keyword(), kind.letter()))
                    .encode(0x42 | type_bits | (cf.selector() << 9), 6)
                    .dests(0)
                    .srcs(2)
                    .side_effects()
                    .imms([imm::NEST, kind.condition(), imm::INVERT_COND, imm::TARGET])
                    .float(kind == CompareKind::Float)
                    .schedule(schedule)
            })
        })
        .collect()
}

/// Jumps taken when any, none, or none-after-this lane is active
pub fn exec_jumps() -> Vec<OpcodeDesc> {
    [("any", 0xC000), ("none", 0xC020), ("none_after", 0xC020)]
        .into_iter()
        .map(|(name, exact)| {
            OpcodeDesc::new(format!("jmp_exec_{}", name))
                .encode(exact, 6)
                .dests(0)
                .srcs(0)
                .side_effects()
                .schedule(ScheduleClass::Invalid)
                .imm(imm::TARGET)
        })
        .collect()
}

/// Compare-and-break pseudo-ops, integer then float
pub fn break_compares() -> Vec<OpcodeDesc> {
    [CompareKind::Integer, CompareKind::Float]
        .into_iter()
        .map(|kind| {
            OpcodeDesc::new(format!("break_if_{}cmp", kind.letter()))
                .dests(0)
                .srcs(2)
                .imms([imm::NEST, imm::INVERT_COND, kind.condition(), imm::TARGET])
                .side_effects()
                .schedule(ScheduleClass::Invalid)
        })
        .collect()
}

// ================================================================================================
// Special Registers And State
// ================================================================================================

/// `get_sr` and its coverage/barrier-ordered twins
///
/// Only the unordered form may be reordered.
pub fn special_register_reads() -> Vec<OpcodeDesc> {
    [
        ("", ScheduleClass::None),
        ("_coverage", ScheduleClass::Coverage),
        ("_barrier", ScheduleClass::Barrier),
    ]
    .into_iter()
    .map(|(suffix, schedule)| {
        OpcodeDesc::new(format!("get_sr{}", suffix))
            .encode(0x72, 4)
            .dests(1)
            .imm(imm::SR)
            .schedule(schedule)
            .can_reorder(schedule == ScheduleClass::None)
    })
    .collect()
}

/// Texture and sampler descriptor stores; sources are base and offset
pub fn state_stores() -> Vec<OpcodeDesc> {
    [("tex", 1u64 << 6), ("sampler", 0)]
        .into_iter()
        .map(|(kind, bit)| {
            OpcodeDesc::new(format!("{}_state_store", kind))
                .encode(0b1010_1101 | bit | (1 << 20), 8)
                .dests(0)
                .srcs(2)
                .imms([imm::IMM, imm::SCOREBOARD])
                .side_effects()
                .schedule(ScheduleClass::Store)
        })
        .collect()
}

/// Texture loads (reorderable) and image loads (ordered, with coherency)
///
/// Sources are coordinates, LOD, bindless base, texture, sampler, and
/// shadow/offset.
pub fn texture_image_loads() -> Vec<OpcodeDesc> {
    [("texture", true), ("image", false)]
        .into_iter()
        .map(|(memory, can_reorder)| {
            let desc = OpcodeDesc::new(format!("{}_load", memory))
                .encode_ext(0x71, 8, 10)
                .srcs(6)
                .imms([
                    imm::DIM,
                    imm::LOD_MODE,
                    imm::MASK,
                    imm::SCOREBOARD,
                    imm::OFFSET,
                    imm::SPARSE,
                ])
                .can_reorder(can_reorder);
            if can_reorder {
                desc
            } else {
                desc.imm(imm::COHERENT).schedule(ScheduleClass::Load)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingSpec;
    use std::collections::HashSet;

    fn exact(desc: &OpcodeDesc) -> u64 {
        desc.encoding.expect("encoded").exact
    }

    #[test]
    fn floor_uses_the_base_value() {
        let floor = funop("floor", 0b000000).unwrap();
        assert_eq!(floor.encoding, Some(EncodingSpec::extensible(0x0A, 4, 6)));
        let enc = floor.validate().unwrap().unwrap();
        assert_eq!(enc.exact(), 0x0A);
        assert_eq!(enc.short_length(), 4);
        assert_eq!(enc.long_length(), 6);
        assert!(enc.extensible());
        assert!(floor.is_float);
        assert_eq!(floor.srcs.count(), 1);
    }

    #[test]
    fn funop_subcode_lands_under_the_mask() {
        let rcp = funop("rcp", 0b001000).unwrap();
        assert_eq!(exact(&rcp), 0x0A | (0b001000 << 28));
        assert_eq!(exact(&rcp) & FUNOP_MASK, 0b001000 << 28);
        assert!(funop("too_wide", 1 << 14).is_err());
    }

    #[test]
    fn iunop_rejects_wide_subcodes() {
        let ffs = iunop("ffs", 0b11).unwrap();
        assert_eq!(exact(&ffs), 0x3E | (0b11 << 26));
        assert_eq!(ffs.encoding.unwrap().long_length, None);
        assert!(!ffs.is_float);

        let err = iunop("bad", 4).unwrap_err();
        assert!(matches!(err, RegistryError::FieldOverflow { value: 4, bits: 2, .. }));
    }

    #[test]
    fn subgroup_ops_take_the_operator_immediate() {
        let ops = subgroup_ops().unwrap();
        let names: Vec<&str> = ops.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, ["quad_reduce", "simd_reduce", "quad_prefix", "simd_prefix"]);

        for (op, selector) in ops.iter().zip(0u64..) {
            assert_eq!(exact(op), 0b0110_1111 | L | (selector << 29));
            assert_eq!(op.imms.len(), 1);
            assert_eq!(op.imms[0].name(), imm::SIMD_OP);
        }
        assert!(subgroup_op("wide", 8).is_err());
    }

    #[test]
    fn shuffle_ballot_grid_is_exact() {
        let grid = shuffle_ballot_grid();
        assert_eq!(grid.len(), 14);

        let unique: HashSet<&str> = grid.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(unique.len(), grid.len());

        let shuffles: Vec<_> = grid.iter().filter(|op| op.name.contains("shuffle")).collect();
        let ballots: Vec<_> = grid.iter().filter(|op| op.encoding.is_none()).collect();
        let compares: Vec<_> = grid.iter().filter(|op| op.name.contains("cmp_")).collect();
        assert_eq!(shuffles.len(), 2 * 4);
        assert_eq!(ballots.len(), 2);
        assert_eq!(compares.len(), 2 * 2);

        let expected = [
            ("quad_shuffle", 0b0110_1111u64),
            ("quad_shuffle_xor", 0b0110_1111 | (1 << 38)),
            ("quad_shuffle_up", 0b0110_1111 | (2 << 38)),
            ("quad_shuffle_down", 0b0110_1111 | (3 << 38)),
            ("fcmp_quad_ballot", 0b010_0010),
            ("icmp_quad_ballot", 0b010_0010 | (1 << 4)),
            ("shuffle", 0b0110_1111 | (1 << 26)),
            ("shuffle_xor", 0b0110_1111 | (1 << 26) | (1 << 38)),
            ("shuffle_up", 0b0110_1111 | (1 << 26) | (2 << 38)),
            ("shuffle_down", 0b0110_1111 | (1 << 26) | (3 << 38)),
            ("fcmp_ballot", 0b010_0010 | (1 << 48)),
            ("icmp_ballot", 0b010_0010 | (1 << 4) | (1 << 48)),
        ];
        for (name, bits) in expected {
            let op = grid.iter().find(|op| op.name == name).unwrap();
            assert_eq!(exact(op), bits, "{}", name);
        }

        let order: Vec<&str> = grid.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(order[4], "quad_ballot");
        assert_eq!(order[11], "ballot");
    }

    #[test]
    fn compare_ballots_carry_condition_immediates() {
        let grid = shuffle_ballot_grid();
        let fcmp = grid.iter().find(|op| op.name == "fcmp_ballot").unwrap();
        let names: Vec<&str> = fcmp.imms.iter().map(|imm| imm.name()).collect();
        assert_eq!(names, [imm::FCOND, imm::INVERT_COND]);
        assert_eq!(fcmp.encoding.unwrap().short_length, 8);
    }

    #[test]
    fn memory_barrier_fields() {
        let op = memory_barrier("memory_barrier", 1, 2, 9).unwrap();
        assert_eq!(exact(&op), 0xF5 | (1 << 10) | (2 << 8) | (9 << 12));
        assert_eq!(op.schedule_class, ScheduleClass::Barrier);
        assert!(!op.can_eliminate);
        assert_eq!(op.dests.count(), 0);
        assert_eq!(op.srcs.count(), 0);
    }

    #[test]
    fn memory_barrier_rejects_wide_fields() {
        assert!(memory_barrier("x", 4, 0, 0).is_err());
        assert!(memory_barrier("x", 0, 4, 0).is_err());
        assert!(memory_barrier("x", 0, 0, 16).is_err());
    }

    #[test]
    fn barrier_variants_stay_distinct() {
        let barriers = memory_barriers().unwrap();
        assert_eq!(barriers.len(), 12);
        let names: HashSet<&str> = barriers.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn control_flow_schedule_classes() {
        let ops = control_flow_compares();
        assert_eq!(ops.len(), 6);
        assert_eq!(ops[0].name, "if_icmp");
        assert_eq!(ops[5].name, "while_fcmp");

        let else_f = ops.iter().find(|op| op.name == "else_fcmp").unwrap();
        assert_eq!(else_f.schedule_class, ScheduleClass::Preload);
        assert!(else_f.is_float);
        assert_eq!(exact(else_f), 0x42 | (1 << 9));

        let while_i = ops.iter().find(|op| op.name == "while_icmp").unwrap();
        assert_eq!(while_i.schedule_class, ScheduleClass::Invalid);
        assert_eq!(exact(while_i), 0x42 | 0x10 | (2 << 9));
    }

    #[test]
    fn only_plain_get_sr_reorders() {
        let ops = special_register_reads();
        let reorder: Vec<(&str, bool)> = ops.iter().map(|op| (op.name.as_str(), op.can_reorder)).collect();
        assert_eq!(
            reorder,
            [("get_sr", true), ("get_sr_coverage", false), ("get_sr_barrier", false)]
        );
    }

    #[test]
    fn image_loads_are_ordered_and_coherent() {
        let ops = texture_image_loads();
        let texture = &ops[0];
        let image = &ops[1];
        assert!(texture.can_reorder);
        assert_eq!(texture.schedule_class, ScheduleClass::None);
        assert_eq!(texture.imms.len(), 6);
        assert!(!image.can_reorder);
        assert_eq!(image.schedule_class, ScheduleClass::Load);
        assert_eq!(image.imms.last().unwrap().name(), imm::COHERENT);
    }

    #[test]
    fn generators_stand_alone_from_the_agx_table() {
        use crate::immediate::NativeType;
        use crate::registry::RegistryBuilder;

        let mut b = RegistryBuilder::new();
        for name in [
            imm::IMM,
            imm::MASK,
            imm::SCOREBOARD,
            imm::ICOND,
            imm::FCOND,
            imm::NEST,
            imm::INVERT_COND,
            imm::SR,
            imm::SIMD_OP,
        ] {
            b.declare_immediate(name, NativeType::U32).unwrap();
        }
        b.declare_immediate(imm::TARGET, NativeType::BlockRef).unwrap();
        b.declare_immediate(imm::DIM, NativeType::enum_of(imm::DIM)).unwrap();
        b.declare_immediate(imm::LOD_MODE, NativeType::enum_of(imm::LOD_MODE)).unwrap();
        for name in [imm::OFFSET, imm::SPARSE, imm::COHERENT] {
            b.declare_immediate(name, NativeType::Bool).unwrap();
        }

        b.declare_all(subgroup_ops().unwrap()).unwrap();
        b.declare_all(shuffle_ballot_grid()).unwrap();
        b.declare_all(memory_barriers().unwrap()).unwrap();
        b.declare_all(control_flow_compares()).unwrap();
        b.declare_all(exec_jumps()).unwrap();
        b.declare_all(break_compares()).unwrap();
        b.declare_all(special_register_reads()).unwrap();
        b.declare_all(state_stores()).unwrap();
        b.declare_all(texture_image_loads()).unwrap();

        let registry = b.finish();
        assert!(registry.opcode("image_load").is_some());
        assert!(registry.opcode("while_fcmp").is_some());
    }
}
