//! C# tokenizer with Roslyn-style trivia attachment.
//!
//! A token's trailing trivia runs up to and including the first line break
//! after it. Everything else (indentation, blank lines, comments on their own
//! line, preprocessor directives) leads the next token. Trivia after the last
//! token is owned by a zero-width end-of-file token.

use super::errors::{line_col, ParseError};
use super::tree::{Delim, Token, TokenKind, Trivia, TriviaKind};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Longest first so that greedy matching picks multi-character operators.
const OPERATORS: &[&str] = &[
    "??=", "<<=", "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<", "??", "?.", "::", "->", "..", "+", "-", "*", "/", "%", "&",
    "|", "^", "!", "~", "=", "<", ">", "?", ":", ";", ",", ".",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// Tokenize `source`. The last token is always [`TokenKind::EndOfFile`].
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        let mut leading = self.leading_trivia()?;
        loop {
            if self.pos >= self.src.len() {
                tokens.push(Token::new(TokenKind::EndOfFile, "").with_leading(leading));
                return Ok(tokens);
            }
            let start = self.pos;
            let kind = self.token()?;
            let text = self.src[start..self.pos].to_string();
            let kind = match kind {
                TokenKind::Identifier if is_keyword(&text) => TokenKind::Keyword,
                other => other,
            };
            let trailing = self.trailing_trivia()?;
            tokens.push(Token {
                kind,
                text,
                leading,
                trailing,
            });
            leading = self.leading_trivia()?;
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error_unterminated(&self, what: &'static str, start: usize) -> ParseError {
        let (line, column) = line_col(self.src, start);
        ParseError::Unterminated { what, line, column }
    }

    fn at_line_start(&self) -> bool {
        let before = &self.src[..self.pos];
        let line = match before.rfind(['\n', '\r']) {
            Some(i) => &before[i + 1..],
            None => before,
        };
        line.chars().all(|c| c == ' ' || c == '\t')
    }

    fn leading_trivia(&mut self) -> Result<Vec<Trivia>, ParseError> {
        let mut out = Vec::new();
        while let Some(t) = self.trivia(true)? {
            out.push(t);
        }
        Ok(out)
    }

    fn trailing_trivia(&mut self) -> Result<Vec<Trivia>, ParseError> {
        let mut out = Vec::new();
        while let Some(t) = self.trivia(false)? {
            let eol = t.is_end_of_line();
            out.push(t);
            if eol {
                break;
            }
        }
        Ok(out)
    }

    fn trivia(&mut self, leading: bool) -> Result<Option<Trivia>, ParseError> {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let kind = match c {
            ' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{FEFF}' => {
                while matches!(self.peek(), Some(' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{FEFF}')) {
                    self.bump();
                }
                TriviaKind::Whitespace
            }
            '\r' => {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                }
                TriviaKind::EndOfLine
            }
            '\n' => {
                self.bump();
                TriviaKind::EndOfLine
            }
            '/' if self.peek_at(1) == Some('/') => {
                self.skip_to_line_end();
                TriviaKind::SingleLineComment
            }
            '/' if self.peek_at(1) == Some('*') => {
                let end = self.rest()[2..]
                    .find("*/")
                    .ok_or_else(|| self.error_unterminated("comment", start))?;
                self.pos += 2 + end + 2;
                TriviaKind::MultiLineComment
            }
            '#' if leading && self.at_line_start() => {
                self.skip_to_line_end();
                TriviaKind::Directive
            }
            _ => return Ok(None),
        };
        Ok(Some(Trivia::new(kind, &self.src[start..self.pos])))
    }

    fn skip_to_line_end(&mut self) {
        let len = self.rest().find(['\r', '\n']).unwrap_or(self.rest().len());
        self.pos += len;
    }

    fn token(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if let Some((prefix, verbatim, dollars)) = self.string_prefix_len() {
            self.pos += prefix;
            self.string_body(start, verbatim, dollars > 0, dollars)?;
            return Ok(TokenKind::String);
        }
        let c = self.peek().unwrap_or('\0');
        let next = self.peek_at(1);
        match c {
            '(' => self.single(TokenKind::Open(Delim::Paren)),
            ')' => self.single(TokenKind::Close(Delim::Paren)),
            '[' => self.single(TokenKind::Open(Delim::Bracket)),
            ']' => self.single(TokenKind::Close(Delim::Bracket)),
            '{' => self.single(TokenKind::Open(Delim::Brace)),
            '}' => self.single(TokenKind::Close(Delim::Brace)),
            '"' => {
                self.string_body(start, false, false, 0)?;
                Ok(TokenKind::String)
            }
            '\'' => {
                self.char_literal(start)?;
                Ok(TokenKind::Char)
            }
            '@' if next.is_some_and(is_ident_start) => {
                self.bump();
                self.identifier();
                Ok(TokenKind::Identifier)
            }
            c if is_ident_start(c) => {
                self.identifier();
                Ok(TokenKind::Identifier)
            }
            c if c.is_ascii_digit() => {
                self.number();
                Ok(TokenKind::Number)
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                self.number();
                Ok(TokenKind::Number)
            }
            _ => {
                let rest = self.rest();
                if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                    self.pos += op.len();
                    Ok(TokenKind::Punct)
                } else {
                    let (line, column) = line_col(self.src, start);
                    Err(ParseError::UnexpectedChar { ch: c, line, column })
                }
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Result<TokenKind, ParseError> {
        self.bump();
        Ok(kind)
    }

    /// Length of a `$`/`@` string prefix ending right before the opening
    /// quote, along with whether it is verbatim and the `$` count.
    fn string_prefix_len(&self) -> Option<(usize, bool, usize)> {
        let mut dollars = 0;
        let mut verbatim = false;
        for (i, c) in self.rest().char_indices() {
            match c {
                '$' => dollars += 1,
                '@' if !verbatim => verbatim = true,
                '"' if i > 0 => return Some((i, verbatim, dollars)),
                _ => return None,
            }
        }
        None
    }

    fn identifier(&mut self) {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
    }

    fn number(&mut self) {
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") || rest.starts_with("0b") || rest.starts_with("0B") {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                self.bump();
            }
            return;
        }
        self.digits();
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += digit_at;
                self.digits();
            }
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn char_literal(&mut self, start: usize) -> Result<(), ParseError> {
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => return Ok(()),
                Some('\n' | '\r') | None => return Err(self.error_unterminated("character literal", start)),
                Some(_) => {}
            }
        }
    }

    /// Consume a string starting at the opening quote(s).
    fn string_body(
        &mut self,
        start: usize,
        verbatim: bool,
        interpolated: bool,
        dollars: usize,
    ) -> Result<(), ParseError> {
        let quotes = self.rest().chars().take_while(|&c| c == '"').count();
        if quotes >= 3 {
            return self.raw_string(start, quotes, dollars);
        }
        self.bump();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error_unterminated("string literal", start));
            };
            match c {
                '"' if verbatim && self.peek() == Some('"') => {
                    self.bump();
                }
                '"' => return Ok(()),
                '\\' if !verbatim => {
                    self.bump();
                }
                '\n' | '\r' if !verbatim => {
                    return Err(self.error_unterminated("string literal", start));
                }
                '{' if interpolated && self.peek() == Some('{') => {
                    self.bump();
                }
                '{' if interpolated => self.interpolation_hole(start, 1)?,
                _ => {}
            }
        }
    }

    fn raw_string(&mut self, start: usize, quotes: usize, dollars: usize) -> Result<(), ParseError> {
        self.pos += quotes;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error_unterminated("raw string literal", start));
            };
            if c == '"' {
                let run = self.rest().chars().take_while(|&c| c == '"').count();
                self.pos += run;
                if run >= quotes {
                    return Ok(());
                }
                continue;
            }
            if c == '{' && dollars > 0 {
                let run = self.rest().chars().take_while(|&c| c == '{').count();
                self.pos += run;
                if run >= dollars {
                    self.interpolation_hole(start, dollars)?;
                }
                continue;
            }
            self.bump();
        }
    }

    /// Skip an interpolation hole whose opening brace(s) were consumed.
    /// Nested literals and brackets are tracked so that a `}` inside them
    /// does not end the hole.
    fn interpolation_hole(&mut self, start: usize, closing: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error_unterminated("interpolated string", start));
            };
            match c {
                '"' => {
                    let s = self.pos;
                    self.string_body(s, false, false, 0)?;
                }
                '@' | '$' => {
                    let s = self.pos;
                    match self.string_prefix_len() {
                        Some((len, verbatim, dollars)) => {
                            self.pos += len;
                            self.string_body(s, verbatim, dollars > 0, dollars)?;
                        }
                        None => {
                            self.bump();
                        }
                    }
                }
                '\'' => {
                    let s = self.pos;
                    self.char_literal(s)?;
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    self.bump();
                }
                ')' | ']' if depth > 0 => {
                    depth -= 1;
                    self.bump();
                }
                '}' if depth > 0 => {
                    depth -= 1;
                    self.bump();
                }
                '}' => {
                    let run = self.rest().chars().take_while(|&c| c == '}').count();
                    self.pos += run.min(closing);
                    return Ok(());
                }
                _ => {
                    self.bump();
                }
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(src: &str) -> Vec<(TokenKind, String)> {
        lex(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn rebuild(tokens: &[Token]) -> String {
        let mut out = String::new();
        for t in tokens {
            t.write_to(&mut out);
        }
        out
    }

    #[test]
    fn trailing_trivia_stops_after_first_line_break() {
        let tokens = lex("a; // note\r\n\r\n    b").unwrap();
        let semi = &tokens[1];
        assert_eq!(semi.text, ";");
        let trailing: Vec<_> = semi.trailing.iter().map(|t| t.kind).collect();
        assert_eq!(
            trailing,
            vec![TriviaKind::Whitespace, TriviaKind::SingleLineComment, TriviaKind::EndOfLine]
        );
        let leading: Vec<_> = tokens[2].leading.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(leading, vec!["\r\n", "    "]);
    }

    #[test]
    fn end_of_file_token_owns_final_trivia() {
        let tokens = lex("x\n\n").unwrap();
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::EndOfFile);
        assert_eq!(eof.leading.len(), 1);
    }

    #[test]
    fn keywords_and_operators() {
        let got = kinds_and_texts("return a ?? b => c;");
        assert_eq!(got[0], (TokenKind::Keyword, "return".into()));
        assert_eq!(got[2], (TokenKind::Punct, "??".into()));
        assert_eq!(got[4], (TokenKind::Punct, "=>".into()));
    }

    #[test]
    fn generic_closers_are_single_tokens() {
        let got = kinds_and_texts("List<List<int>>");
        let closers = got.iter().filter(|(_, t)| t == ">").count();
        assert_eq!(closers, 2);
    }

    #[test]
    fn interpolated_strings_with_nested_literals() {
        let src = r#"$"{cdn}/v{driverVersion}/{(x ? "a}" : 'b')}.zip""#;
        let got = kinds_and_texts(src);
        assert_eq!(got[0], (TokenKind::String, src.to_string()));
    }

    #[test]
    fn verbatim_and_raw_strings() {
        let got = kinds_and_texts("@\"a\"\"b\" \"\"\"\n raw \" text\n\"\"\"");
        assert_eq!(got[0].0, TokenKind::String);
        assert_eq!(got[1].0, TokenKind::String);
        assert!(got[1].1.ends_with("\"\"\""));
    }

    #[test]
    fn directive_is_leading_trivia() {
        let tokens = lex("#if DEBUG\nx\n#endif\n").unwrap();
        assert_eq!(tokens[0].leading[0].kind, TriviaKind::Directive);
        assert_eq!(tokens[1].leading[0].kind, TriviaKind::Directive);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex("var s = \"abc\n;").unwrap_err();
        assert!(matches!(err, ParseError::Unterminated { line: 1, .. }));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert!(lex("a /* b").is_err());
    }

    #[test]
    fn lossless() {
        let src = "\u{FEFF}using System;\r\n\r\nclass A { int @x = 0x1F; char c = '\\''; }\r\n";
        assert_eq!(rebuild(&lex(src).unwrap()), src);
    }
}
