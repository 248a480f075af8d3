//! The beauty interpreter: lexing, parsing, semantic analysis and evaluation of a source file.

use std::fmt::Write as _;
use std::io::{BufRead, Write};

use beauty_parser::ast::Block;
use beauty_parser::lexer::{tokenize, Token, TokenKind};
use beauty_parser::parser::Parser;
use console::style;

pub use beauty_source::{Error, Location, Result};
pub use beauty_vm::{VmConfig, DEFAULT_MAX_CALL_DEPTH};

/// Lexes and parses `source` into the top level block.
pub fn parse(source: &str) -> Result<Block> {
    tracing::debug!(bytes = source.len(), "lexing");
    let tokens = tokenize(source)?;
    tracing::debug!(tokens = tokens.len(), "parsing");
    Parser::new(&tokens).parse_program()
}

/// Runs the program in `source`, reading with `read` from `input` and printing to `output`.
/// Nothing is executed unless the whole program is free of syntax and semantic errors.
pub fn run<R: BufRead, W: Write>(
    source: &str,
    config: VmConfig,
    input: R,
    output: W,
) -> Result<()> {
    let program = parse(source)?;
    tracing::debug!(statements = program.len(), "analyzing");
    beauty_passes::typeck::analyze(&program)?;
    tracing::debug!("evaluating");
    beauty_vm::run(&program, config, input, output)
}

/// Renders the token stream of `source`, one source line per output line.
pub fn dump_tokens(source: &str) -> Result<String> {
    let tokens = tokenize(source)?;
    let mut dump = String::new();
    for token in &tokens {
        // writing into a String cannot fail
        let _ = write!(dump, "{} ", styled_token(token));
        if matches!(token.kind, TokenKind::LineFeed | TokenKind::Eof) {
            dump.push('\n');
        }
    }
    Ok(dump)
}

fn styled_token(token: &Token) -> String {
    match token.kind {
        TokenKind::Keyword(_) => style(token).cyan().to_string(),
        TokenKind::Indent(_) | TokenKind::LineFeed | TokenKind::Eof => {
            style(token).black().bright().to_string()
        }
        _ => token.to_string(),
    }
}

/// Renders the syntax tree of `source`.
pub fn dump_ast(source: &str) -> Result<String> {
    let program = parse(source)?;
    Ok(format!("{:#?}\n", program))
}
