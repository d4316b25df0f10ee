//! Last-resort termination for states the compiler's own invariants say are
//! unreachable (e.g. a resolved `FuncId` pointing past the end of the arena).
//! Never used for user-facing errors — those go through `diagnostics`.

use std::fmt::Display;

pub fn fatal(message: impl Display) -> ! {
    eprintln!("--------------------------------------------------------------------");
    eprintln!("INTERNAL ERROR");
    eprintln!("{message}");
    eprintln!("This is a bug in the compiler, not in the source file it was given.");
    eprintln!("--------------------------------------------------------------------");
    std::process::exit(70);
}
