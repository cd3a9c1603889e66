//! Tokenizer
//!
//! Trivia is attached to tokens: a token's leading trivia is everything
//! after the previous token's trailing trivia, and its trailing trivia is
//! the whitespace and comments that follow it on the same line.

use kt_syntax::{SyntaxKind, SyntaxToken};

const OPERATOR_CHARS: &str = "+-*/%<>=!&|^~?";

/// Problem found while tokenizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LexIssue {
    /// Character that starts no token
    UnknownCharacter { offset: usize, len: usize },
    /// String literal without its closing quote
    UnterminatedString { offset: usize, len: usize },
}

/// Splits `source` into tokens; the last token is always `Eof`
pub(crate) fn tokenize(source: &str) -> (Vec<SyntaxToken>, Vec<LexIssue>) {
    let mut lexer = Lexer {
        source,
        pos: 0,
        issues: Vec::new(),
    };
    let mut tokens = Vec::new();
    loop {
        let start = lexer.pos;
        let leading = lexer.trivia(true);
        if lexer.pos >= source.len() {
            tokens.push(SyntaxToken::new(SyntaxKind::Eof, start as u32, leading, "", ""));
            break;
        }
        let text_start = lexer.pos;
        let kind = lexer.token_kind();
        let text = &source[text_start..lexer.pos];
        let trailing = lexer.trivia(false);
        tokens.push(SyntaxToken::new(kind, start as u32, leading, text, trailing));
    }
    (tokens, lexer.issues)
}

fn keyword(text: &str) -> Option<SyntaxKind> {
    Some(match text {
        "var" => SyntaxKind::VarKw,
        "let" => SyntaxKind::LetKw,
        "func" => SyntaxKind::FuncKw,
        "struct" => SyntaxKind::StructKw,
        "class" => SyntaxKind::ClassKw,
        "enum" => SyntaxKind::EnumKw,
        "protocol" => SyntaxKind::ProtocolKw,
        "extension" => SyntaxKind::ExtensionKw,
        "import" => SyntaxKind::ImportKw,
        "return" => SyntaxKind::ReturnKw,
        "case" => SyntaxKind::CaseKw,
        "true" => SyntaxKind::TrueKw,
        "false" => SyntaxKind::FalseKw,
        "nil" => SyntaxKind::NilKw,
        "public" | "private" | "internal" | "fileprivate" | "static" | "final" | "mutating"
        | "override" | "open" => SyntaxKind::ModifierKw,
        _ => return None,
    })
}

struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    issues: Vec<LexIssue>,
}

impl<'src> Lexer<'src> {
    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn eat_while(&mut self, mut accept: impl FnMut(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !accept(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    /// Consumes trivia; newlines (and block comments spanning one) only
    /// when `newlines` is set
    fn trivia(&mut self, newlines: bool) -> &'src str {
        let start = self.pos;
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                self.eat_while(|ch| ch != '\n');
            } else if rest.starts_with("/*") {
                let len = rest.find("*/").map_or(rest.len(), |end| end + 2);
                if !newlines && rest[..len].contains('\n') {
                    break;
                }
                self.pos += len;
            } else if let Some(ch) = self.peek() {
                let is_trivia = match ch {
                    ' ' | '\t' => true,
                    '\n' | '\r' => newlines,
                    _ => false,
                };
                if !is_trivia {
                    break;
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.source[start..self.pos]
    }

    fn token_kind(&mut self) -> SyntaxKind {
        let Some(ch) = self.peek() else {
            return SyntaxKind::Eof;
        };
        let single = match ch {
            '#' => Some(SyntaxKind::Pound),
            '@' => Some(SyntaxKind::At),
            '(' => Some(SyntaxKind::LParen),
            ')' => Some(SyntaxKind::RParen),
            '{' => Some(SyntaxKind::LBrace),
            '}' => Some(SyntaxKind::RBrace),
            '[' => Some(SyntaxKind::LBracket),
            ']' => Some(SyntaxKind::RBracket),
            ',' => Some(SyntaxKind::Comma),
            ':' => Some(SyntaxKind::Colon),
            ';' => Some(SyntaxKind::Semicolon),
            '.' if self.peek_second() != Some('.') => Some(SyntaxKind::Dot),
            _ => None,
        };
        if let Some(kind) = single {
            self.pos += 1;
            return kind;
        }

        match ch {
            '"' => self.string_literal(),
            '0'..='9' => self.number(),
            '.' => {
                self.eat_while(|ch| ch == '.' || OPERATOR_CHARS.contains(ch));
                SyntaxKind::Operator
            }
            _ if ch == '_' || ch.is_alphabetic() => {
                let start = self.pos;
                self.eat_while(|ch| ch == '_' || ch.is_alphanumeric());
                keyword(&self.source[start..self.pos]).unwrap_or(SyntaxKind::Identifier)
            }
            _ if OPERATOR_CHARS.contains(ch) => self.operator(),
            _ => {
                self.issues.push(LexIssue::UnknownCharacter {
                    offset: self.pos,
                    len: ch.len_utf8(),
                });
                self.pos += ch.len_utf8();
                SyntaxKind::Unknown
            }
        }
    }

    fn operator(&mut self) -> SyntaxKind {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            let rest = self.rest();
            if !OPERATOR_CHARS.contains(ch) || rest.starts_with("//") || rest.starts_with("/*") {
                break;
            }
            self.pos += 1;
        }
        match &self.source[start..self.pos] {
            "=" => SyntaxKind::Equal,
            "->" => SyntaxKind::Arrow,
            _ => SyntaxKind::Operator,
        }
    }

    fn number(&mut self) -> SyntaxKind {
        self.eat_while(|ch| ch.is_ascii_digit() || ch == '_');
        let fraction = self.peek() == Some('.') && self.peek_second().is_some_and(|ch| ch.is_ascii_digit());
        if !fraction {
            return SyntaxKind::IntegerLiteral;
        }
        self.pos += 1;
        self.eat_while(|ch| ch.is_ascii_digit() || ch == '_');
        SyntaxKind::FloatLiteral
    }

    fn string_literal(&mut self) -> SyntaxKind {
        let start = self.pos;
        self.pos += 1;
        let mut escaped = false;
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.pos += ch.len_utf8();
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return SyntaxKind::StringLiteral,
                _ => {}
            }
        }
        self.issues.push(LexIssue::UnterminatedString {
            offset: start,
            len: self.pos - start,
        });
        SyntaxKind::StringLiteral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(SyntaxKind, String)> {
        tokenize(source)
            .0
            .into_iter()
            .map(|token| (token.kind(), token.text().to_owned()))
            .collect()
    }

    #[test]
    fn trivia_attaches_to_tokens() {
        let (tokens, issues) = tokenize("  a // note\n  b");
        assert!(issues.is_empty());
        let parts: Vec<_> = tokens
            .iter()
            .map(|token| (token.leading_trivia(), token.text(), token.trailing_trivia()))
            .collect();
        assert_eq!(parts, vec![("  ", "a", " // note"), ("\n  ", "b", ""), ("", "", "")]);
    }

    #[test]
    fn tokens_tile_the_source() {
        let source = "@attr var x: Int = 1 /* c */\n#m(\"s\\\"\", ..<3) // end\n";
        let (tokens, _) = tokenize(source);
        let mut offset = 0;
        for token in &tokens {
            assert_eq!(token.span().start, offset);
            offset = token.span().end;
        }
        assert_eq!(offset as usize, source.len());
    }

    #[test]
    fn operators_and_punctuation() {
        assert_eq!(
            kinds("a.b ..< c -> d = e ?? f"),
            vec![
                (SyntaxKind::Identifier, "a".to_owned()),
                (SyntaxKind::Dot, ".".to_owned()),
                (SyntaxKind::Identifier, "b".to_owned()),
                (SyntaxKind::Operator, "..<".to_owned()),
                (SyntaxKind::Identifier, "c".to_owned()),
                (SyntaxKind::Arrow, "->".to_owned()),
                (SyntaxKind::Identifier, "d".to_owned()),
                (SyntaxKind::Equal, "=".to_owned()),
                (SyntaxKind::Identifier, "e".to_owned()),
                (SyntaxKind::Operator, "??".to_owned()),
                (SyntaxKind::Identifier, "f".to_owned()),
                (SyntaxKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn numbers_and_keywords() {
        assert_eq!(
            kinds("static let 1_000 2.5 3.x"),
            vec![
                (SyntaxKind::ModifierKw, "static".to_owned()),
                (SyntaxKind::LetKw, "let".to_owned()),
                (SyntaxKind::IntegerLiteral, "1_000".to_owned()),
                (SyntaxKind::FloatLiteral, "2.5".to_owned()),
                (SyntaxKind::IntegerLiteral, "3".to_owned()),
                (SyntaxKind::Dot, ".".to_owned()),
                (SyntaxKind::Identifier, "x".to_owned()),
                (SyntaxKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (tokens, issues) = tokenize("\"abc\nx");
        assert_eq!(tokens[0].kind(), SyntaxKind::StringLiteral);
        assert_eq!(tokens[0].text(), "\"abc");
        assert_eq!(issues, vec![LexIssue::UnterminatedString { offset: 0, len: 4 }]);
    }
}
