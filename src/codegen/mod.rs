//! Stack-machine code generation for analyzed methods.
//!
//! Output is a symbolic listing ([`MethodCode`]) with JVM mnemonics rather
//! than a class file: labels stay symbolic and constants are inline.

pub mod instr;
pub mod lower;
pub mod stream;

pub use instr::{Instr, Label, LocalVariableRange, MethodCode, ValueKind};
pub use lower::{Generator, generate_method};
pub use stream::CodeStream;
