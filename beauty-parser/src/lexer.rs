//! Line oriented lexer.
//!
//! Every non blank line becomes `Indent(width)`, the tokens of the line and a
//! `LineFeed`. The whole file is terminated by a single `Eof`.

use std::fmt;

use beauty_source::{Error, Location, Result};
use logos::Logos;

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Else,
    While,
    For,
    Boolean,
    Number,
    String,
    Array,
    Def,
    Return,
    Print,
    Read,
}

/// Spelling to [`Keyword`] lookup table.
pub const KEYWORDS: &[(&str, Keyword)] = &[
    ("if", Keyword::If),
    ("else", Keyword::Else),
    ("while", Keyword::While),
    ("for", Keyword::For),
    ("boolean", Keyword::Boolean),
    ("number", Keyword::Number),
    ("string", Keyword::String),
    ("array", Keyword::Array),
    ("def", Keyword::Def),
    ("return", Keyword::Return),
    ("print", Keyword::Print),
    ("read", Keyword::Read),
];

impl Keyword {
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(s, _)| *s == spelling)
            .map(|(_, keyword)| *keyword)
    }

    pub fn spelling(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|(s, _)| *s)
            .unwrap_or_default()
    }
}

/// Operators and punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Dot,
    Comma,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Not,
    Or,
    And,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    Equals,
    PlusEquals,
    MinusEquals,
    AsteriskEquals,
    SlashEquals,
    PercentEquals,
    OrEquals,
    AndEquals,
    Colon,
    EqualsEquals,
    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    NotEquals,
}

/// Spelling to [`Operator`] lookup table.
pub const OPERATORS: &[(&str, Operator)] = &[
    (".", Operator::Dot),
    (",", Operator::Comma),
    ("+", Operator::Plus),
    ("-", Operator::Minus),
    ("*", Operator::Asterisk),
    ("/", Operator::Slash),
    ("%", Operator::Percent),
    ("!", Operator::Not),
    ("|", Operator::Or),
    ("&", Operator::And),
    ("(", Operator::OpenParen),
    (")", Operator::CloseParen),
    ("[", Operator::OpenSquare),
    ("]", Operator::CloseSquare),
    ("{", Operator::OpenCurly),
    ("}", Operator::CloseCurly),
    ("=", Operator::Equals),
    ("+=", Operator::PlusEquals),
    ("-=", Operator::MinusEquals),
    ("*=", Operator::AsteriskEquals),
    ("/=", Operator::SlashEquals),
    ("%=", Operator::PercentEquals),
    ("|=", Operator::OrEquals),
    ("&=", Operator::AndEquals),
    (":", Operator::Colon),
    ("==", Operator::EqualsEquals),
    ("<", Operator::LessThan),
    (">", Operator::GreaterThan),
    ("<=", Operator::LessThanEquals),
    (">=", Operator::GreaterThanEquals),
    ("!=", Operator::NotEquals),
];

impl Operator {
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(s, _)| *s == spelling)
            .map(|(_, op)| *op)
    }

    pub fn spelling(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(s, _)| *s)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Boolean(bool),
    Number(f64),
    String(String),
    Operator(Operator),
    Keyword(Keyword),
    Identifier(String),
    /// Width of the leading whitespace of a line.
    Indent(usize),
    LineFeed,
    Eof,
}

impl TokenKind {
    /// Returns the source spelling of the token or `None` for layout tokens.
    pub fn spelling(&self) -> Option<String> {
        match self {
            TokenKind::Boolean(val) => Some(val.to_string()),
            TokenKind::Number(val) => Some(val.to_string()),
            TokenKind::String(val) if val.contains('"') => Some(format!("'{}'", val)),
            TokenKind::String(val) => Some(format!("\"{}\"", val)),
            TokenKind::Operator(op) => Some(op.spelling().to_string()),
            TokenKind::Keyword(keyword) => Some(keyword.spelling().to_string()),
            TokenKind::Identifier(ident) => Some(ident.clone()),
            TokenKind::Indent(_) | TokenKind::LineFeed | TokenKind::Eof => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Location,
}

impl Token {
    pub fn new(kind: TokenKind, loc: Location) -> Self {
        Self { kind, loc }
    }
}

/// Dump format: `[KIND|line,col]`.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        match &self.kind {
            TokenKind::Boolean(val) => write!(f, "{}", val)?,
            TokenKind::Number(val) => write!(f, "{:.6}", val)?,
            TokenKind::String(val) => write!(f, "\"{}\"", val)?,
            TokenKind::Operator(op) => write!(f, "{}", op.spelling())?,
            TokenKind::Keyword(keyword) => write!(f, "KW:{}", keyword.spelling())?,
            TokenKind::Identifier(ident) => write!(f, "ID:{}", ident)?,
            TokenKind::Indent(width) => write!(f, "INDENT:{}", width)?,
            TokenKind::LineFeed => write!(f, "LF")?,
            TokenKind::Eof => write!(f, "EOF")?,
        }
        write!(f, "|{},{}]", self.loc.line, self.loc.col)
    }
}

/// Coarse classification of the characters of one line.
/// Operator runs are split against [`OPERATORS`] afterwards.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    #[regex(r"[0-9]+(\.[0-9]*)?")]
    Number,
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Word,
    #[regex(r#""[^"]*""#)]
    #[regex(r#"'[^']*'"#)]
    Str,
    #[regex(r#"[^a-zA-Z0-9_ \t\r\n\f'"]+"#)]
    Symbols,

    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    #[error]
    Error,
}

/// Converts source text into tokens.
pub struct Lexer {
    tokens: Vec<Token>,
    /// The whitespace character used for indentation, fixed by the first indented line.
    indent_char: Option<char>,
}

impl Lexer {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            indent_char: None,
        }
    }

    /// Lexes a whole file.
    pub fn tokenize(mut self, source: &str) -> Result<Vec<Token>> {
        let mut line_count = 0;
        for (i, line) in source.lines().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            self.read_line(i + 1, line)?;
            line_count = i + 1;
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, Location::new(line_count + 1, 1)));
        tracing::trace!(tokens = self.tokens.len(), "lexed source");
        Ok(self.tokens)
    }

    fn read_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let content = line.trim_start();
        if content.is_empty() {
            return Ok(());
        }
        let indent = &line[..line.len() - content.len()];
        self.check_indent(line_no, indent)?;

        let width = indent.chars().count();
        self.push(TokenKind::Indent(width), line_no, 1);

        let col_of = |offset: usize| line[..offset].chars().count() + 1;
        let base = indent.len();
        let mut lex = Lexeme::lexer(content);
        while let Some(lexeme) = lex.next() {
            let span = lex.span();
            let start = base + span.start;
            let slice = lex.slice();
            match lexeme {
                Lexeme::Number => {
                    if let Some(next) = content[span.end..].chars().next() {
                        if next.is_alphabetic() || next == '_' {
                            return Err(Error::syntax(
                                "unexpected symbol in numeric value",
                                Location::new(line_no, col_of(base + span.end)),
                            ));
                        }
                    }
                    let val = slice.parse::<f64>().map_err(|_| {
                        Error::syntax("invalid numeric value", Location::new(line_no, col_of(start)))
                    })?;
                    self.push(TokenKind::Number(val), line_no, col_of(start));
                }
                Lexeme::Word => {
                    let kind = match slice {
                        "true" => TokenKind::Boolean(true),
                        "false" => TokenKind::Boolean(false),
                        _ => match Keyword::from_spelling(slice) {
                            Some(keyword) => TokenKind::Keyword(keyword),
                            None => TokenKind::Identifier(slice.to_string()),
                        },
                    };
                    self.push(kind, line_no, col_of(start));
                }
                Lexeme::Str => {
                    let val = slice[1..slice.len() - 1].to_string();
                    self.push(TokenKind::String(val), line_no, col_of(start));
                }
                Lexeme::Symbols => self.read_operators(line_no, slice, |offset| col_of(start + offset))?,
                Lexeme::Error => {
                    return Err(if slice.starts_with('"') || slice.starts_with('\'') {
                        Error::syntax(
                            "expected ending quote",
                            Location::new(line_no, line.chars().count() + 1),
                        )
                    } else {
                        Error::syntax("unknown symbol", Location::new(line_no, col_of(start)))
                    });
                }
            }
        }

        self.push(TokenKind::LineFeed, line_no, line.chars().count() + 1);
        Ok(())
    }

    /// Splits a run of symbol characters into operators, always taking the
    /// longest prefix present in [`OPERATORS`].
    fn read_operators(
        &mut self,
        line_no: usize,
        run: &str,
        col_of: impl Fn(usize) -> usize,
    ) -> Result<()> {
        let mut offset = 0;
        while offset < run.len() {
            let rest = &run[offset..];
            let mut ends: Vec<usize> = rest.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
            ends.reverse();

            let found = ends
                .into_iter()
                .find_map(|end| Operator::from_spelling(&rest[..end]).map(|op| (op, end)));
            match found {
                Some((op, len)) => {
                    self.push(TokenKind::Operator(op), line_no, col_of(offset));
                    offset += len;
                }
                None => {
                    return Err(Error::syntax(
                        "unknown symbol",
                        Location::new(line_no, col_of(offset)),
                    ))
                }
            }
        }
        Ok(())
    }

    fn check_indent(&mut self, line_no: usize, indent: &str) -> Result<()> {
        for (i, c) in indent.chars().enumerate() {
            match self.indent_char {
                None => self.indent_char = Some(c),
                Some(expected) if expected != c => {
                    return Err(Error::syntax(
                        "inconsistent use of tabs and spaces in indentation",
                        Location::new(line_no, i + 1),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, line: usize, col: usize) {
        self.tokens.push(Token::new(kind, Location::new(line, col)));
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexes `source` into a token sequence terminated by [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new().tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn error(source: &str) -> Error {
        tokenize(source).unwrap_err()
    }

    #[test]
    fn test_tables() {
        for (spelling, keyword) in KEYWORDS {
            assert_eq!(Keyword::from_spelling(spelling), Some(*keyword));
            assert_eq!(keyword.spelling(), *spelling);
        }
        for (spelling, op) in OPERATORS {
            assert_eq!(Operator::from_spelling(spelling), Some(*op));
            assert_eq!(op.spelling(), *spelling);
        }
        assert_eq!(Keyword::from_spelling("true"), None);
        assert_eq!(Operator::from_spelling("=>"), None);
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            kinds("x : number = 2.5"),
            vec![
                TokenKind::Indent(0),
                TokenKind::Identifier("x".to_string()),
                TokenKind::Operator(Operator::Colon),
                TokenKind::Keyword(Keyword::Number),
                TokenKind::Operator(Operator::Equals),
                TokenKind::Number(2.5),
                TokenKind::LineFeed,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_locations() {
        let tokens = tokenize("if true\n  print 'hi'\n").unwrap();
        let locs: Vec<_> = tokens.iter().map(|token| (token.loc.line, token.loc.col)).collect();
        assert_eq!(
            locs,
            vec![(1, 1), (1, 1), (1, 4), (1, 8), (2, 1), (2, 3), (2, 9), (2, 13), (3, 1)]
        );
        assert_eq!(tokens[4].kind, TokenKind::Indent(2));
        assert_eq!(tokens[6].kind, TokenKind::String("hi".to_string()));
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(
            kinds("\n   \nfoo\n\n"),
            vec![
                TokenKind::Indent(0),
                TokenKind::Identifier("foo".to_string()),
                TokenKind::LineFeed,
                TokenKind::Eof,
            ]
        );
        let tokens = tokenize("foo\n\n").unwrap();
        assert_eq!(tokens.last().unwrap().loc, Location::new(3, 1));
        assert_eq!(tokenize("").unwrap()[0].loc, Location::new(1, 1));
    }

    #[test]
    fn test_operator_backoff() {
        assert_eq!(
            kinds("a<=-b")[1..5],
            [
                TokenKind::Identifier("a".to_string()),
                TokenKind::Operator(Operator::LessThanEquals),
                TokenKind::Operator(Operator::Minus),
                TokenKind::Identifier("b".to_string()),
            ]
        );
        // `>>` is not an operator
        assert_eq!(
            kinds("array<array<number>>")[5..8],
            [
                TokenKind::Keyword(Keyword::Number),
                TokenKind::Operator(Operator::GreaterThan),
                TokenKind::Operator(Operator::GreaterThan),
            ]
        );
        assert_eq!(
            kinds("f(\"x\")")[2..5],
            [
                TokenKind::Operator(Operator::OpenParen),
                TokenKind::String("x".to_string()),
                TokenKind::Operator(Operator::CloseParen),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("12")[1], TokenKind::Number(12.0));
        assert_eq!(kinds("3.")[1], TokenKind::Number(3.0));
        assert_eq!(kinds("0.125")[1], TokenKind::Number(0.125));
        // `.` after a complete literal is an operator
        assert_eq!(kinds("1.5.2")[2], TokenKind::Operator(Operator::Dot));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            error("x = 12abc"),
            Error::syntax("unexpected symbol in numeric value", Location::new(1, 7))
        );
        assert_eq!(
            error("print \"abc"),
            Error::syntax("expected ending quote", Location::new(1, 11))
        );
        assert_eq!(error("a $ b"), Error::syntax("unknown symbol", Location::new(1, 3)));
        assert_eq!(error("a =$ b"), Error::syntax("unknown symbol", Location::new(1, 4)));
    }

    #[test]
    fn test_mixed_indentation() {
        assert!(tokenize("if true\n\tprint 1\n").is_ok());
        assert_eq!(
            error("if true\n  print 1\n\tprint 2\n"),
            Error::syntax(
                "inconsistent use of tabs and spaces in indentation",
                Location::new(3, 1)
            )
        );
        assert_eq!(
            error("if true\n \tprint 1\n"),
            Error::syntax(
                "inconsistent use of tabs and spaces in indentation",
                Location::new(2, 2)
            )
        );
    }

    #[test]
    fn test_dump_format() {
        let tokens = tokenize("x : number").unwrap();
        let dump: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(
            dump,
            vec!["[INDENT:0|1,1]", "[ID:x|1,1]", "[:|1,3]", "[KW:number|1,5]", "[LF|1,11]", "[EOF|2,1]"]
        );
    }

    /// Joins token spellings with single spaces, keeping the original indentation.
    fn reconstruct(tokens: &[Token]) -> String {
        let mut source = String::new();
        let mut line = Vec::new();
        for token in tokens {
            match &token.kind {
                TokenKind::Indent(width) => source.push_str(&" ".repeat(*width)),
                TokenKind::LineFeed => {
                    source.push_str(&line.join(" "));
                    source.push('\n');
                    line.clear();
                }
                kind => line.extend(kind.spelling()),
            }
        }
        source
    }

    fn kind_names(tokens: &[Token]) -> Vec<std::mem::Discriminant<TokenKind>> {
        tokens.iter().map(|token| std::mem::discriminant(&token.kind)).collect()
    }

    fn arb_word() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z_][a-z0-9_]{0,6}",
            "[0-9]{1,4}(\\.[0-9]{1,3})?",
            "\"[a-z ]{0,5}\"",
            proptest::sample::select(OPERATORS.iter().map(|(s, _)| s.to_string()).collect::<Vec<_>>()),
        ]
    }

    fn arb_source() -> impl Strategy<Value = String> {
        let line = (0usize..3, proptest::collection::vec(arb_word(), 1..6))
            .prop_map(|(indent, words)| format!("{}{}", "  ".repeat(indent), words.join(" ")));
        proptest::collection::vec(line, 1..6).prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn relexing_keeps_token_kinds(source in arb_source()) {
            if let Ok(tokens) = tokenize(&source) {
                let relexed = tokenize(&reconstruct(&tokens)).unwrap();
                prop_assert_eq!(kind_names(&tokens), kind_names(&relexed));
            }
        }
    }
}
