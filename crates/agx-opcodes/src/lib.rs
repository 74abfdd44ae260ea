//! # AGX Opcodes – Instruction Table for the AGX Shader ISA
//!
//! `agx-opcodes` is the single source of truth for the AGX backend's
//! instruction set: which immediates exist, which enums type them, and for
//! every opcode its operand counts, immediates, optimisation flags, schedule
//! class, and machine encoding. Code generators read the finished table and
//! emit the opcode enum, the per-opcode info array, and the immediate
//! accessors.
//!
//! ## Architecture Overview
//!
//! - [`RegistryBuilder`] accepts declarations and rejects anything that would
//!   break a table invariant (duplicate names, bad encoding growth, unknown
//!   immediates) before touching its state.
//! - [`Registry`] is the frozen result, shared read-only by every consumer.
//! - [`families`] generates regular groups of opcodes (unary ops, subgroup
//!   reductions, the shuffle/ballot grid, memory barriers, control flow).
//! - [`agx`] declares the real table; [`snapshot`] serialises it.
//!
//! ## Quick Start
//!
//! ```
//! use agx_opcodes::{agx, ScheduleClass};
//!
//! # fn main() -> agx_opcodes::Result<()> {
//! let registry = agx::build()?;
//!
//! let floor = registry.opcode("floor").unwrap();
//! assert_eq!(floor.encoding().unwrap().exact(), 0x0A);
//! assert!(floor.is_float());
//!
//! let barrier = registry.opcode("threadgroup_barrier").unwrap();
//! assert_eq!(barrier.schedule_class(), ScheduleClass::Barrier);
//!
//! let json = registry.snapshot().to_json()?;
//! assert!(json.contains("\"name\": \"floor\""));
//! # Ok(())
//! # }
//! ```

pub mod agx;
pub mod encoding;
pub mod enums;
pub mod error;
pub mod families;
pub mod immediate;
pub mod opcode;
pub mod registry;
pub mod snapshot;

pub use encoding::{Encoding, EncodingSpec};
pub use enums::EnumDef;
pub use error::{Namespace, RegistryError, Result};
pub use immediate::{Immediate, ImmediateRef, NativeType};
pub use opcode::{Arity, Opcode, OpcodeDesc, ScheduleClass};
pub use registry::{Registry, RegistryBuilder, ResolvedImmediate};
pub use snapshot::{SerializedEncoding, SerializedEnum, SerializedImmediate, SerializedOpcode, TableSnapshot};
