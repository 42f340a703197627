//! Front end for `.kir` kernel files.
//!
//! ```text
//! ; one kernel per form
//! (kernel NAME
//!   (args (buffer NAME TYPE) (scalar NAME TYPE) ...)
//!   STMT ...)
//! ```

pub(crate) mod lexer;
pub(crate) mod parser;

use crate::diagnostic::Diagnostic;
use crate::ir::KernelModule;

/// Parse the kernels of a `.kir` source file.
pub fn parse_module(source: &str) -> Result<KernelModule, Vec<Diagnostic>> {
    let (tokens, lex_diagnostics) = lexer::Lexer::new(source).tokenize();
    let parsed = parser::Parser::new(tokens).parse_module();
    match (parsed, lex_diagnostics.is_empty()) {
        (Ok(module), true) => Ok(module),
        (Ok(_), false) => Err(lex_diagnostics),
        (Err(mut diagnostics), _) => {
            let mut all = lex_diagnostics;
            all.append(&mut diagnostics);
            Err(all)
        }
    }
}
