//! Build the AGX opcode table and print what a code generator would consume
//!
//! This example shows how to:
//! 1. Install the shared tracing subscriber
//! 2. Build the full registry
//! 3. Inspect opcodes, immediates, and enums
//! 4. Serialise the table to JSON and rebuild it
//!
//! Run with: cargo run --example dump_table
//! Set `AGX_TRACING_DIRECTIVES=agx_opcodes=debug` to see every declaration.

use agx_opcodes::{agx, Registry, TableSnapshot};
use agx_tracing::{init_global_tracing, TracingConfig};

fn main() {
    init_global_tracing(&TracingConfig::from_env()).expect("Failed to install tracing subscriber");

    println!("=== AGX Opcode Table ===\n");

    // 1. Build the table
    println!("1. Building registry...");
    let registry = agx::build().expect("AGX table must be valid");
    println!("   - Opcodes: {}", registry.num_opcodes());
    println!("   - Immediates: {}", registry.immediates().len());
    println!("   - Enums: {}", registry.enums().len());
    println!("   - Max sources: {}", registry.max_srcs());
    println!("   - Max destinations: {}\n", registry.max_dests());

    // 2. Opcodes
    println!("2. Opcodes:");
    for (index, op) in registry.opcodes().enumerate() {
        let encoding = match op.encoding() {
            Some(enc) if enc.extensible() => {
                format!("{:#018x} {}/{}B", enc.exact(), enc.short_length(), enc.long_length())
            }
            Some(enc) => format!("{:#018x} {}B", enc.exact(), enc.short_length()),
            None => "pseudo".to_string(),
        };
        let imms: Vec<&str> = op.imms().iter().map(|imm| imm.name()).collect();
        println!(
            "   {:3} {:<28} d={:<8} s={:<8} {:<8} {:<28} [{}]",
            index,
            op.name(),
            op.dests().to_string(),
            op.srcs().to_string(),
            op.schedule_class(),
            encoding,
            imms.join(", ")
        );
    }

    // 3. Immediates
    println!("\n3. Immediates (flag bit order):");
    for (bit, imm) in registry.immediates().enumerate() {
        println!("   bit {:2}: {:<16} {}", bit, imm.name(), imm.native_type().c_type());
    }

    for def in registry.enums() {
        println!("\n   enum agx_{} ({} members)", def.name(), def.len());
        for (code, _) in def.members() {
            if let Some(constant) = def.c_constant(code) {
                println!("     {} = {}", constant, code);
            }
        }
    }

    // 4. JSON snapshot
    println!("\n4. Serializing to JSON...");
    let snapshot = registry.snapshot();
    let json = snapshot.to_json().expect("Failed to serialize to JSON");
    println!("   - JSON size: {} bytes", json.len());

    let restored = TableSnapshot::from_json(&json).expect("Failed to deserialize JSON");
    let rebuilt = Registry::from_snapshot(&restored).expect("Snapshot must rebuild");
    println!(
        "   - Rebuild: {}",
        if rebuilt.snapshot() == snapshot { "✓" } else { "✗" }
    );

    println!("\n=== Done ===");
}
