//! The AGX opcode table
//!
//! Declaration order is load-bearing: generated opcode numbers and immediate
//! flag bits follow it, so new entries go where they belong in the listing
//! and never get sorted.

use crate::error::Result;
use crate::families::{self, L};
use crate::immediate::NativeType;
use crate::opcode::{Arity, OpcodeDesc, ScheduleClass};
use crate::registry::{Registry, RegistryBuilder};
use tracing::debug_span;

/// Immediate names used by the table
pub use crate::immediate::names as imm;

/// Build the complete AGX registry
pub fn build() -> Result<Registry> {
    let _span = debug_span!("agx_table").entered();

    let mut builder = RegistryBuilder::new();
    declare_immediates(&mut builder)?;
    declare_opcodes(&mut builder)?;
    Ok(builder.finish())
}

/// Plain immediates and enums, in flag-bit order
pub fn declare_immediates(b: &mut RegistryBuilder) -> Result<()> {
    use imm::*;

    b.declare_immediate(FORMAT, NativeType::enum_of("format"))?;
    b.declare_immediate(IMM, NativeType::U64)?;
    b.declare_immediate(WRITEOUT, NativeType::U32)?;
    b.declare_immediate(INDEX, NativeType::U32)?;
    b.declare_immediate(COMPONENT, NativeType::U32)?;
    b.declare_immediate(CHANNELS, NativeType::U32)?;
    b.declare_immediate(TRUTH_TABLE, NativeType::U32)?;
    b.declare_immediate(ROUND, NativeType::enum_of("round"))?;
    b.declare_immediate(SHIFT, NativeType::U32)?;
    b.declare_immediate(MASK, NativeType::U32)?;
    b.declare_immediate(BFI_MASK, NativeType::U32)?;
    b.declare_immediate(LOD_MODE, NativeType::enum_of("lod_mode"))?;
    b.declare_immediate(PIXEL_OFFSET, NativeType::U32)?;
    b.declare_immediate(STACK_SIZE, NativeType::I16)?;
    b.declare_immediate(EXPLICIT_COORDS, NativeType::Bool)?;

    b.declare_enum(
        DIM,
        [
            (0, "1d"),
            (1, "1d_array"),
            (2, "2d"),
            (3, "2d_array"),
            (4, "2d_ms"),
            (5, "3d"),
            (6, "cube"),
            (7, "cube_array"),
            (8, "2d_ms_array"),
        ],
    )?;

    b.declare_enum(
        GATHER,
        [(0b000, "none"), (0b001, "r"), (0b011, "g"), (0b101, "b"), (0b111, "a")],
    )?;

    b.declare_immediate(OFFSET, NativeType::Bool)?;
    b.declare_immediate(SHADOW, NativeType::Bool)?;
    b.declare_immediate(SPARSE, NativeType::Bool)?;
    b.declare_immediate(QUERY_LOD, NativeType::Bool)?;
    b.declare_immediate(COHERENT, NativeType::Bool)?;
    b.declare_immediate(SCOREBOARD, NativeType::U32)?;
    b.declare_immediate(ICOND, NativeType::enum_of("icond"))?;
    b.declare_immediate(FCOND, NativeType::enum_of("fcond"))?;
    b.declare_immediate(NEST, NativeType::U32)?;
    b.declare_immediate(INVERT_COND, NativeType::U32)?;
    b.declare_immediate(TARGET, NativeType::BlockRef)?;
    b.declare_immediate(ZS, NativeType::U32)?;

    b.declare_enum(
        SR,
        [
            (0, "threadgroup_position_in_grid.x"),
            (1, "threadgroup_position_in_grid.y"),
            (2, "threadgroup_position_in_grid.z"),
            (4, "threads_per_threadgroup.x"),
            (5, "threads_per_threadgroup.y"),
            (6, "threads_per_threadgroup.z"),
            (8, "dispatch_threads_per_threadgroup.x"),
            (9, "dispatch_threads_per_threadgroup.y"),
            (10, "dispatch_threads_per_threadgroup.z"),
            (14, "samples_log2"),
            (20, "core_id"),
            (21, "vm_slot"),
            (48, "thread_position_in_threadgroup.x"),
            (49, "thread_position_in_threadgroup.y"),
            (50, "thread_position_in_threadgroup.z"),
            (51, "thread_index_in_threadgroup"),
            (52, "thread_index_in_subgroup"),
            (53, "subgroup_index_in_threadgroup"),
            (56, "active_thread_index_in_quad"),
            (57, "total_active_threads_in_quad"),
            (58, "active_thread_index_in_subgroup"),
            (59, "total_active_threads_in_subgroup"),
            (60, "coverage_mask"),
            (62, "backfacing"),
            (63, "is_active_thread"),
            (80, "thread_position_in_grid.x"),
            (81, "thread_position_in_grid.y"),
            (82, "thread_position_in_grid.z"),
            (124, "input_sample_mask"),
            (144, "helper_op"),
            (146, "helper_arg_l"),
            (147, "helper_arg_h"),
        ],
    )?;

    b.declare_enum(
        ATOMIC_OPC,
        [
            (0, "add"),
            (1, "sub"),
            (2, "xchg"),
            (3, "cmpxchg"),
            (4, "umin"),
            (5, "imin"),
            (6, "umax"),
            (7, "imax"),
            (8, "and"),
            (9, "or"),
            (10, "xor"),
        ],
    )?;

    // sample is packed as sample_register
    b.declare_enum(
        INTERPOLATION,
        [(0, "center"), (1, "sample"), (2, "centroid"), (3, "sample_register")],
    )?;

    b.declare_enum(
        SIMD_OP,
        [
            (0b00000, "and"),
            (0b00001, "fadd"),
            (0b00010, "or"),
            (0b00011, "fmul"),
            (0b00100, "xor"),
            (0b00101, "fmin"),
            (0b00111, "fmax"),
            (0b10000, "iadd"),
            (0b10100, "smin"),
            (0b10110, "smax"),
            (0b11100, "umin"),
            (0b11110, "umax"),
        ],
    )?;

    Ok(())
}

/// Floating-point unary operations as `(name, subcode, schedule)`
const FUNOPS: [(&str, u64, ScheduleClass); 13] = [
    ("floor", 0b000000, ScheduleClass::None),
    ("srsqrt", 0b000001, ScheduleClass::None),
    ("dfdx", 0b000100, ScheduleClass::Coverage),
    ("dfdy", 0b000110, ScheduleClass::Coverage),
    ("rcp", 0b001000, ScheduleClass::None),
    ("rsqrt", 0b001001, ScheduleClass::None),
    ("sin_pt_1", 0b001010, ScheduleClass::None),
    ("log2", 0b001100, ScheduleClass::None),
    ("exp2", 0b001101, ScheduleClass::None),
    ("sin_pt_2", 0b001110, ScheduleClass::None),
    ("ceil", 0b010000, ScheduleClass::None),
    ("trunc", 0b100000, ScheduleClass::None),
    ("roundeven", 0b110000, ScheduleClass::None),
];

const IUNOPS: [(&str, u64); 3] = [("bitrev", 0b01), ("popcount", 0b10), ("ffs", 0b11)];

/// Every opcode, in table order
pub fn declare_opcodes(b: &mut RegistryBuilder) -> Result<()> {
    use imm::*;

    for (name, subcode, schedule) in FUNOPS {
        b.declare_opcode(families::funop(name, subcode)?.schedule(schedule))?;
    }
    for (name, subcode) in IUNOPS {
        b.declare_opcode(families::iunop(name, subcode)?)?;
    }

    b.declare_all([
        OpcodeDesc::new("fadd").encode_ext(0x2A, 4, 6).srcs(2).float(true),
        OpcodeDesc::new("ffma").encode_ext(0x3A, 6, 8).srcs(3).float(true),
        OpcodeDesc::new("fmul").encode_ext(0x1A, 4, 6).srcs(2).float(true),
        OpcodeDesc::new("hadd").encode_ext(0x26, 4, 6).srcs(2).float(true),
        OpcodeDesc::new("hfma").encode_ext(0x36, 6, 8).srcs(3).float(true),
        OpcodeDesc::new("hmul").encode_ext(0x16, 4, 6).srcs(2).float(true),
        OpcodeDesc::new("mov_imm").encode_ext(0x62, 6, 8).imm(IMM),
        OpcodeDesc::new("iadd").encode(0x0E, 8).srcs(2).imm(SHIFT),
        OpcodeDesc::new("imad").encode(0x1E, 8).srcs(3).imm(SHIFT),
        OpcodeDesc::new("bfi").encode(0x2E, 8).srcs(3).imm(BFI_MASK),
        OpcodeDesc::new("bfeil").encode(0x2E | L, 8).srcs(3).imm(BFI_MASK),
        OpcodeDesc::new("extr").encode(0x2E | (0x1 << 26), 8).srcs(3).imm(BFI_MASK),
        OpcodeDesc::new("asr").encode(0x2E | L | (0x1 << 26), 8).srcs(2),
        OpcodeDesc::new("icmpsel").encode_ext(0x12, 8, 10).srcs(4).imm(ICOND),
        OpcodeDesc::new("fcmpsel").encode_ext(0x02, 8, 10).srcs(4).imm(FCOND),
    ])?;

    b.declare_all(families::subgroup_ops()?)?;
    b.declare_all(families::shuffle_ballot_grid())?;

    // Compares returning 1/0
    b.declare_all([
        OpcodeDesc::new("icmp").srcs(2).imms([ICOND, INVERT_COND]),
        OpcodeDesc::new("fcmp").srcs(2).imms([FCOND, INVERT_COND]),
    ])?;

    // Sources are coordinates, LOD, bindless base (zero for texture state
    // registers), texture, sampler, and shadow/offset.
    // TODO: the long length is unconfirmed on hardware for sample and load
    b.declare_opcode(
        OpcodeDesc::new("texture_sample")
            .encode_ext(0x31, 8, 10)
            .srcs(6)
            .imms([DIM, LOD_MODE, MASK, SCOREBOARD, OFFSET, SHADOW, QUERY_LOD, GATHER, SPARSE]),
    )?;
    b.declare_all(families::texture_image_loads())?;

    b.declare_all([
        // base, index
        OpcodeDesc::new("device_load")
            .encode_ext(0x05, 6, 8)
            .srcs(2)
            .imms([FORMAT, MASK, SHIFT, SCOREBOARD, COHERENT])
            .can_reorder(false)
            .schedule(ScheduleClass::Load),
        // base relative to workgroup memory, index
        OpcodeDesc::new("local_load")
            .encode_ext(0b110_1001, 6, 8)
            .srcs(2)
            .imms([FORMAT, MASK])
            .can_reorder(false)
            .schedule(ScheduleClass::Load),
        // value, base, index
        OpcodeDesc::new("device_store")
            .encode(0x45 | (1 << 47), 8)
            .dests(0)
            .srcs(3)
            .imms([FORMAT, MASK, SHIFT, SCOREBOARD, COHERENT])
            .side_effects()
            .schedule(ScheduleClass::Store),
        OpcodeDesc::new("local_store")
            .encode_ext(0b010_1001, 6, 8)
            .dests(0)
            .srcs(3)
            .imms([FORMAT, MASK])
            .side_effects()
            .schedule(ScheduleClass::Store),
        // value, index
        OpcodeDesc::new("uniform_store")
            .encode((0b111 << 27) | 0b100_0101 | (1 << 47), 8)
            .dests(0)
            .srcs(2)
            .imm(MASK)
            .side_effects(),
    ])?;

    b.declare_all(families::state_stores())?;

    b.declare_all([
        // value, base, index
        OpcodeDesc::new("atomic")
            .encode(0x15 | (1 << 26) | (1 << 31) | (5 << 44), 8)
            .dests(1)
            .srcs(3)
            .imms([ATOMIC_OPC, SCOREBOARD])
            .side_effects()
            .schedule(ScheduleClass::Atomic),
        // Always the long form
        OpcodeDesc::new("local_atomic")
            .encode(0x19 | (1 << 15) | (1 << 36) | (1 << 47), 10)
            .dests(1)
            .srcs(3)
            .imm(ATOMIC_OPC)
            .schedule(ScheduleClass::Atomic)
            .side_effects(),
        OpcodeDesc::new("wait")
            .encode(0x38, 2)
            .dests(0)
            .side_effects()
            .imm(SCOREBOARD)
            .schedule(ScheduleClass::Invalid),
    ])?;

    b.declare_all(families::special_register_reads())?;

    b.declare_all([
        OpcodeDesc::new("sample_mask")
            .encode(0x7fc1, 6)
            .dests(0)
            .srcs(2)
            .side_effects()
            .schedule(ScheduleClass::Coverage),
        // sample mask, combined depth/stencil
        OpcodeDesc::new("zs_emit")
            .encode(0x41, 4)
            .dests(0)
            .srcs(2)
            .side_effects()
            .imm(ZS)
            .schedule(ScheduleClass::Coverage),
        // sample mask, explicit coords (if present)
        OpcodeDesc::new("ld_tile")
            .encode(0x49, 8)
            .dests(1)
            .srcs(2)
            .imms([FORMAT, MASK, PIXEL_OFFSET, EXPLICIT_COORDS])
            .can_reorder(false)
            .schedule(ScheduleClass::Coverage),
        // value, sample mask, explicit coords (if present)
        OpcodeDesc::new("st_tile")
            .encode(0x09, 8)
            .dests(0)
            .srcs(3)
            .side_effects()
            .imms([FORMAT, MASK, PIXEL_OFFSET, EXPLICIT_COORDS])
            .schedule(ScheduleClass::Coverage),
    ])?;

    b.declare_all(families::exec_jumps())?;

    // Implicit r0l destination is not modelled
    b.declare_opcode(
        OpcodeDesc::new("pop_exec")
            .encode(0x52 | (0x3 << 9), 6)
            .dests(0)
            .srcs(0)
            .side_effects()
            .schedule(ScheduleClass::Invalid)
            .imm(NEST),
    )?;

    b.declare_all(families::control_flow_compares())?;

    b.declare_all([
        OpcodeDesc::new("bitop").encode(0x7E, 6).srcs(2).imm(TRUTH_TABLE),
        OpcodeDesc::new("intl").encode(0x3E, 6).srcs(2),
        OpcodeDesc::new("convert").encode(0x3E | L, 6).srcs(2).imm(ROUND),
        // coefficient register, sample index (if applicable)
        OpcodeDesc::new("iter")
            .encode(0x21, 8)
            .srcs(2)
            .imms([CHANNELS, INTERPOLATION]),
        // varying coefficients, W coefficients, sample index (if applicable)
        OpcodeDesc::new("iterproj")
            .encode(0x21, 8)
            .srcs(3)
            .imms([CHANNELS, INTERPOLATION]),
        OpcodeDesc::new("ldcf").encode(0xA1, 8).srcs(1).imm(CHANNELS),
        OpcodeDesc::new("st_vary").dests(0).srcs(2).side_effects(),
        OpcodeDesc::new("no_varyings")
            .encode(0x8000_0051, 4)
            .dests(0)
            .side_effects(),
        OpcodeDesc::new("stop")
            .encode(0x88, 2)
            .dests(0)
            .side_effects()
            .schedule(ScheduleClass::Invalid),
        OpcodeDesc::new("trap")
            .encode(0x08, 2)
            .dests(0)
            .side_effects()
            .schedule(ScheduleClass::Invalid),
        // Total barriers: they also guard global memory access
        OpcodeDesc::new("wait_pix")
            .encode(0x48, 4)
            .dests(0)
            .imm(WRITEOUT)
            .side_effects()
            .schedule(ScheduleClass::Barrier),
        OpcodeDesc::new("signal_pix")
            .encode(0x58, 4)
            .dests(0)
            .imm(WRITEOUT)
            .side_effects()
            .schedule(ScheduleClass::Barrier),
        // data, coordinates, LOD, bindless table (if present), texture index
        OpcodeDesc::new("image_write")
            .encode_ext(0xF1 | (1 << 23), 6, 8)
            .dests(0)
            .srcs(5)
            .imms([DIM, COHERENT])
            .side_effects()
            .schedule(ScheduleClass::Store),
        // image base, image index, shared memory offset, coordinates (or layer)
        OpcodeDesc::new("block_image_store")
            .encode(0xB1, 10)
            .dests(0)
            .srcs(4)
            .imms([FORMAT, DIM, EXPLICIT_COORDS])
            .side_effects()
            .schedule(ScheduleClass::Store),
        OpcodeDesc::new("threadgroup_barrier")
            .encode(0x0068, 2)
            .dests(0)
            .srcs(0)
            .side_effects()
            .schedule(ScheduleClass::Barrier),
    ])?;

    b.declare_all(families::memory_barriers()?)?;

    b.declare_all([
        OpcodeDesc::new("doorbell")
            .encode(0x60020 | (0x28 << 32), 6)
            .dests(0)
            .side_effects()
            .can_reorder(false)
            .imm(IMM),
        OpcodeDesc::new("stack_unmap")
            .encode(0x00075, 8)
            .dests(1)
            .srcs(0)
            .side_effects()
            .can_reorder(false)
            .imm(IMM),
        OpcodeDesc::new("stack_map")
            .encode(0x10075, 8)
            .dests(0)
            .srcs(1)
            .side_effects()
            .can_reorder(false)
            .imm(IMM),
        OpcodeDesc::new("stack_adjust")
            .encode(0x10100b5, 8)
            .dests(0)
            .srcs(0)
            .side_effects()
            .can_reorder(false)
            .imm(STACK_SIZE)
            .schedule(ScheduleClass::Store),
        // offset
        OpcodeDesc::new("stack_load")
            .encode_ext(0x35, 6, 8)
            .srcs(1)
            .imms([FORMAT, MASK, SCOREBOARD])
            .can_reorder(false)
            .schedule(ScheduleClass::Load),
        // value, offset
        OpcodeDesc::new("stack_store")
            .encode_ext(0xb5, 6, 8)
            .dests(0)
            .srcs(2)
            .imms([FORMAT, MASK, SCOREBOARD])
            .side_effects()
            .schedule(ScheduleClass::Store),
    ])?;

    // Pseudo-ops for IR bookkeeping
    b.declare_all([
        OpcodeDesc::new("mov").srcs(1),
        OpcodeDesc::new("not").srcs(1),
        OpcodeDesc::new("signext").srcs(1),
        OpcodeDesc::new("collect").srcs(Arity::Variable),
        OpcodeDesc::new("split").srcs(1).dests(Arity::Variable),
        OpcodeDesc::new("phi")
            .srcs(Arity::Variable)
            .schedule(ScheduleClass::Preload),
        // Sources double as destinations; only exists for RA validation
        OpcodeDesc::new("swap").dests(0).srcs(2),
        OpcodeDesc::new("unit_test").dests(0).srcs(1).side_effects(),
        // Register move that is always coalesced, only at the start of a shader
        OpcodeDesc::new("preload").srcs(1).schedule(ScheduleClass::Preload),
        // Exports a scalar to a fixed register after the logical end of the exit block
        OpcodeDesc::new("export")
            .dests(0)
            .srcs(1)
            .imm(IMM)
            .side_effects()
            .schedule(ScheduleClass::Invalid),
        // Nesting counter updates, lowered to r0l writes after RA
        OpcodeDesc::new("begin_cf").dests(0).side_effects(),
        OpcodeDesc::new("break")
            .dests(0)
            .imms([NEST, TARGET])
            .side_effects()
            .schedule(ScheduleClass::Invalid),
    ])?;

    b.declare_all(families::break_compares())
}
