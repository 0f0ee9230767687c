//! A parser, assembler, linker, and emulator for a small RISC-V-flavored instruction set.
//!
//! Instructions are 32-bit words with the opcode in the low 7 bits, in one of five formats
//! (see [`ast::sim`]). The registers are the 32 RISC-V integer registers,
//! named either `x0`-`x31` or by their ABI aliases (`zero`, `ra`, `sp`, `a0`, ...).
//!
//! # Usage
//!
//! To convert source code to a memory image, it must be parsed, assembled, and linked:
//! ```
//! use riscvm::parse::parse_ast;
//! use riscvm::asm::{assemble, LinkedImage};
//!
//! let code = "
//!     .section .text
//!     main:
//!         li a0, 7
//!         li a7, 93
//!         ecall
//! ";
//! let ast = parse_ast(code).unwrap();
//!
//! // Assemble AST into object file, then lay out its sections:
//! let obj_file = assemble(ast).unwrap();
//! let image: LinkedImage = obj_file.link(&["text", "data"], 0x1000).unwrap();
//! assert_eq!(image.bytes().len(), 12);
//! ```
//!
//! Most of the time, the [`machine::Machine`] does all of this, and then executes the image:
//! ```
//! use riscvm::machine::{Machine, StepOutcome};
//!
//! let mut machine = Machine::default();
//! machine.assemble("
//!     li a0, 7
//!     li a7, 93
//!     ecall
//! ").unwrap();
//!
//! assert_eq!(machine.run(), StepOutcome::Exited(7));
//! ```
//!
//! If more granularity is needed for simulation, there is also [`machine::Machine::step`].
//! See the [`machine`] and [`sim`] modules for more details.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod machine;
pub mod err;
