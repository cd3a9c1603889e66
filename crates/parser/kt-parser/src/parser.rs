//! Recursive-descent parser
//!
//! Binary operators are not folded here: an operator chain is kept as a flat
//! `SequenceExpr` and [`crate::fold_all`] regroups it by precedence.

use crate::error::ParseError;
use crate::lexer::{self, LexIssue};
use kt_syntax::{SyntaxKind, SyntaxNode, SyntaxToken, TreeBuilder};
use miette::{NamedSource, SourceSpan};

const ACCESSOR_NAMES: [&str; 4] = ["get", "set", "willSet", "didSet"];

pub(crate) struct Parser<'src> {
    source: &'src str,
    file_name: &'src str,
    tokens: Vec<SyntaxToken>,
    pos: usize,
    builder: TreeBuilder,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str, file_name: &'src str) -> Self {
        let (tokens, issues) = lexer::tokenize(source);
        let mut parser = Self {
            source,
            file_name,
            tokens,
            pos: 0,
            builder: TreeBuilder::new(),
            errors: Vec::new(),
        };
        for issue in issues {
            let error = match issue {
                LexIssue::UnknownCharacter { offset, len } => ParseError::UnexpectedToken {
                    token: source[offset..offset + len].to_owned(),
                    span: (offset, len).into(),
                    src: parser.named_source(),
                },
                LexIssue::UnterminatedString { offset, len } => ParseError::UnterminatedString {
                    span: (offset, len).into(),
                    src: parser.named_source(),
                },
            };
            parser.errors.push(error);
        }
        parser
    }

    /// Consumes the parser, wrapping everything built in a `kind` root
    pub(crate) fn finish(self, kind: SyntaxKind) -> (SyntaxNode, Vec<ParseError>) {
        (self.builder.finish(kind), self.errors)
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.file_name, self.source.to_owned())
    }

    // Token access

    fn nth(&self, lookahead: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::Eof, SyntaxToken::kind)
    }

    fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn current_token(&self) -> Option<&SyntaxToken> {
        self.tokens.get(self.pos)
    }

    fn current_text(&self) -> &str {
        self.current_token().map_or("", SyntaxToken::text)
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    fn previous_has_trailing_trivia(&self) -> bool {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .is_some_and(|token| !token.trailing_trivia().is_empty())
    }

    /// Whether the current token is glued to the previous one
    fn current_is_attached(&self) -> bool {
        !self.previous_has_trailing_trivia()
            && self
                .current_token()
                .is_some_and(|token| token.leading_trivia().is_empty())
    }

    fn current_starts_line(&self) -> bool {
        self.current_token()
            .is_some_and(|token| token.leading_trivia().contains('\n'))
    }

    fn bump(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            if token.kind() != SyntaxKind::Eof {
                self.builder.token(token.clone());
                self.pos += 1;
            }
        }
    }

    /// Pushes the final `Eof` token, carrying the file's trailing trivia
    pub(crate) fn bump_eof(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.token(token.clone());
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind, expected: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error_missing(expected);
        false
    }

    fn error_missing(&mut self, expected: &str) {
        let (found, offset) = match self.current_token() {
            Some(token) if token.kind() != SyntaxKind::Eof => {
                (token.text().to_owned(), token.text_span().start)
            }
            Some(token) => ("end of file".to_owned(), token.text_span().start),
            None => ("end of file".to_owned(), self.source.len() as u32),
        };
        let span: SourceSpan = (offset as usize, 0).into();
        let error = ParseError::MissingToken {
            expected: expected.to_owned(),
            found,
            span,
            src: self.named_source(),
        };
        self.errors.push(error);
    }

    /// Wraps the current token in an `Unexpected` node and moves past it
    fn recover(&mut self) {
        let Some(token) = self.current_token() else {
            return;
        };
        if token.kind() == SyntaxKind::Eof {
            return;
        }
        let text_span = token.text_span();
        let error = ParseError::UnexpectedToken {
            token: token.text().to_owned(),
            span: (text_span.start as usize, text_span.len() as usize).into(),
            src: self.named_source(),
        };
        tracing::trace!(token = %token.text(), offset = text_span.start, "skipping unexpected token");
        self.errors.push(error);
        self.builder.start_node(SyntaxKind::Unexpected);
        self.bump();
        self.builder.finish_node();
    }

    // Items

    /// Parses statements until `Eof` or a closing brace
    pub(crate) fn code_block_item_list(&mut self, top_level: bool) {
        self.builder.start_node(SyntaxKind::CodeBlockItemList);
        loop {
            match self.current() {
                SyntaxKind::Eof => break,
                SyntaxKind::RBrace if !top_level => break,
                SyntaxKind::Semicolon => self.bump(),
                _ => {
                    if !self.item() {
                        self.recover();
                    }
                }
            }
        }
        self.builder.finish_node();
    }

    fn item(&mut self) -> bool {
        if self.at_decl_start(false) {
            self.decl();
            true
        } else if self.at(SyntaxKind::ReturnKw) {
            self.return_stmt();
            true
        } else {
            self.expr()
        }
    }

    fn at_decl_start(&self, member: bool) -> bool {
        match self.current() {
            SyntaxKind::At
            | SyntaxKind::ModifierKw
            | SyntaxKind::VarKw
            | SyntaxKind::LetKw
            | SyntaxKind::FuncKw
            | SyntaxKind::StructKw
            | SyntaxKind::ClassKw
            | SyntaxKind::EnumKw
            | SyntaxKind::ProtocolKw
            | SyntaxKind::ExtensionKw
            | SyntaxKind::ImportKw
            | SyntaxKind::CaseKw => true,
            SyntaxKind::Pound => member,
            _ => false,
        }
    }

    fn return_stmt(&mut self) {
        self.builder.start_node(SyntaxKind::ReturnStmt);
        self.bump();
        let ends_statement = matches!(
            self.current(),
            SyntaxKind::RBrace | SyntaxKind::Eof | SyntaxKind::Semicolon
        ) || self.current_starts_line();
        if !ends_statement {
            self.expr();
        }
        self.builder.finish_node();
    }

    // Declarations

    pub(crate) fn decl(&mut self) {
        let checkpoint = self.builder.checkpoint();
        let has_attributes = self.at(SyntaxKind::At);
        if has_attributes {
            self.attribute_list();
        }
        if self.at(SyntaxKind::ModifierKw) {
            self.builder.start_node(SyntaxKind::ModifierList);
            while self.eat(SyntaxKind::ModifierKw) {}
            self.builder.finish_node();
        }

        let kind = match self.current() {
            SyntaxKind::VarKw | SyntaxKind::LetKw => SyntaxKind::VariableDecl,
            SyntaxKind::FuncKw => SyntaxKind::FunctionDecl,
            SyntaxKind::StructKw => SyntaxKind::StructDecl,
            SyntaxKind::ClassKw => SyntaxKind::ClassDecl,
            SyntaxKind::EnumKw => SyntaxKind::EnumDecl,
            SyntaxKind::ProtocolKw => SyntaxKind::ProtocolDecl,
            SyntaxKind::ExtensionKw => SyntaxKind::ExtensionDecl,
            SyntaxKind::ImportKw => SyntaxKind::ImportDecl,
            SyntaxKind::CaseKw => SyntaxKind::EnumCaseDecl,
            SyntaxKind::Pound => SyntaxKind::MacroExpansionDecl,
            _ => {
                self.builder.start_node_at(checkpoint, SyntaxKind::Unexpected);
                self.error_missing("a declaration");
                self.builder.finish_node();
                return;
            }
        };

        self.builder.start_node_at(checkpoint, kind);
        match kind {
            SyntaxKind::VariableDecl => self.variable_decl(),
            SyntaxKind::FunctionDecl => self.function_decl(),
            SyntaxKind::ImportDecl => self.import_decl(),
            SyntaxKind::EnumCaseDecl => self.enum_case_decl(),
            SyntaxKind::MacroExpansionDecl => self.macro_expansion_body(),
            _ => self.group_decl(kind == SyntaxKind::ExtensionDecl),
        }
        self.builder.finish_node();
    }

    pub(crate) fn attribute_list(&mut self) {
        self.builder.start_node(SyntaxKind::AttributeList);
        while self.at(SyntaxKind::At) {
            self.builder.start_node(SyntaxKind::Attribute);
            self.bump();
            self.expect(SyntaxKind::Identifier, "an attribute name");
            if self.at(SyntaxKind::LParen) && self.current_is_attached() {
                self.bump();
                self.labeled_expr_list(SyntaxKind::RParen);
                self.expect(SyntaxKind::RParen, "`)`");
            }
            self.builder.finish_node();
        }
        self.builder.finish_node();
    }

    fn variable_decl(&mut self) {
        self.bump();
        self.expect(SyntaxKind::Identifier, "a variable name");
        if self.at(SyntaxKind::Colon) {
            self.builder.start_node(SyntaxKind::TypeAnnotation);
            self.bump();
            self.ty();
            self.builder.finish_node();
        }
        if self.at(SyntaxKind::Equal) {
            self.builder.start_node(SyntaxKind::InitializerClause);
            self.bump();
            if !self.expr() {
                self.error_missing("an initial value");
            }
            self.builder.finish_node();
        }
        if self.at(SyntaxKind::LBrace) {
            self.accessor_block();
        }
    }

    fn at_accessor(&self) -> bool {
        self.at(SyntaxKind::Identifier)
            && ACCESSOR_NAMES.contains(&self.current_text())
            && matches!(
                self.nth(1),
                SyntaxKind::LBrace | SyntaxKind::RBrace | SyntaxKind::LParen | SyntaxKind::Identifier
            )
    }

    fn accessor_block(&mut self) {
        self.builder.start_node(SyntaxKind::AccessorBlock);
        self.bump();
        if self.at_accessor() {
            while self.at_accessor() {
                self.accessor_decl();
            }
        } else {
            self.code_block_item_list(false);
        }
        self.expect(SyntaxKind::RBrace, "`}`");
        self.builder.finish_node();
    }

    pub(crate) fn accessor_decl(&mut self) {
        self.builder.start_node(SyntaxKind::AccessorDecl);
        self.expect(SyntaxKind::Identifier, "`get` or `set`");
        if self.eat(SyntaxKind::LParen) {
            self.expect(SyntaxKind::Identifier, "a parameter name");
            self.expect(SyntaxKind::RParen, "`)`");
        }
        if self.at(SyntaxKind::LBrace) {
            self.code_block();
        }
        self.builder.finish_node();
    }

    fn code_block(&mut self) {
        self.builder.start_node(SyntaxKind::CodeBlock);
        self.expect(SyntaxKind::LBrace, "`{`");
        self.code_block_item_list(false);
        self.expect(SyntaxKind::RBrace, "`}`");
        self.builder.finish_node();
    }

    fn function_decl(&mut self) {
        self.bump();
        if !self.eat(SyntaxKind::Operator) {
            self.expect(SyntaxKind::Identifier, "a function name");
        }

        self.builder.start_node(SyntaxKind::ParameterClause);
        if self.expect(SyntaxKind::LParen, "`(`") {
            while self.at(SyntaxKind::Identifier) {
                self.builder.start_node(SyntaxKind::FunctionParameter);
                self.bump();
                self.eat(SyntaxKind::Identifier);
                self.expect(SyntaxKind::Colon, "`:`");
                self.ty();
                let more = self.eat(SyntaxKind::Comma);
                self.builder.finish_node();
                if !more {
                    break;
                }
            }
            self.expect(SyntaxKind::RParen, "`)`");
        }
        self.builder.finish_node();

        if self.at(SyntaxKind::Arrow) {
            self.builder.start_node(SyntaxKind::ReturnClause);
            self.bump();
            self.ty();
            self.builder.finish_node();
        }
        if self.at(SyntaxKind::LBrace) {
            self.code_block();
        }
    }

    fn group_decl(&mut self, extension: bool) {
        self.bump();
        if extension {
            self.ty();
        } else {
            self.expect(SyntaxKind::Identifier, "a type name");
        }
        if self.at(SyntaxKind::Colon) {
            self.builder.start_node(SyntaxKind::InheritanceClause);
            self.bump();
            self.ty();
            while self.eat(SyntaxKind::Comma) {
                self.ty();
            }
            self.builder.finish_node();
        }

        self.builder.start_node(SyntaxKind::MemberBlock);
        self.expect(SyntaxKind::LBrace, "`{`");
        self.builder.start_node(SyntaxKind::MemberBlockItemList);
        while !matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
            if self.at(SyntaxKind::Semicolon) {
                self.bump();
            } else if self.at_decl_start(true) {
                self.decl();
            } else {
                self.recover();
            }
        }
        self.builder.finish_node();
        self.expect(SyntaxKind::RBrace, "`}`");
        self.builder.finish_node();
    }

    fn import_decl(&mut self) {
        self.bump();
        self.expect(SyntaxKind::Identifier, "a module name");
        while self.at(SyntaxKind::Dot) && self.nth(1) == SyntaxKind::Identifier {
            self.bump();
            self.bump();
        }
    }

    fn enum_case_decl(&mut self) {
        self.bump();
        self.expect(SyntaxKind::Identifier, "a case name");
        while self.eat(SyntaxKind::Comma) {
            self.expect(SyntaxKind::Identifier, "a case name");
        }
    }

    fn macro_expansion_body(&mut self) {
        self.bump();
        self.expect(SyntaxKind::Identifier, "a macro name");
        if self.at(SyntaxKind::LParen) && self.current_is_attached() {
            self.bump();
            self.labeled_expr_list(SyntaxKind::RParen);
            self.expect(SyntaxKind::RParen, "`)`");
        }
    }

    // Types

    fn ty(&mut self) {
        let checkpoint = self.builder.checkpoint();
        match self.current() {
            SyntaxKind::LBracket => {
                self.builder.start_node(SyntaxKind::ArrayType);
                self.bump();
                self.ty();
                self.expect(SyntaxKind::RBracket, "`]`");
                self.builder.finish_node();
            }
            SyntaxKind::Identifier => {
                self.builder.start_node(SyntaxKind::IdentifierType);
                self.bump();
                self.builder.finish_node();
                while self.at(SyntaxKind::Dot) && self.nth(1) == SyntaxKind::Identifier {
                    self.builder.start_node_at(checkpoint, SyntaxKind::MemberType);
                    self.bump();
                    self.bump();
                    self.builder.finish_node();
                }
            }
            _ => {
                self.error_missing("a type");
                return;
            }
        }
        while self.at(SyntaxKind::Operator) && self.current_text() == "?" && self.current_is_attached() {
            self.builder.start_node_at(checkpoint, SyntaxKind::OptionalType);
            self.bump();
            self.builder.finish_node();
        }
    }

    // Expressions

    /// Parses an operand followed by any number of `operator operand`
    /// pairs; returns `false` without consuming anything if no expression
    /// starts here
    pub(crate) fn expr(&mut self) -> bool {
        let checkpoint = self.builder.checkpoint();
        if !self.unary_expr() {
            return false;
        }
        let mut folded_any = false;
        while self.at_binary_operator() {
            self.builder.start_node(SyntaxKind::BinaryOperatorExpr);
            self.bump();
            self.builder.finish_node();
            if !self.unary_expr() {
                self.error_missing("an operand");
            }
            folded_any = true;
        }
        if folded_any {
            self.builder.start_node_at(checkpoint, SyntaxKind::SequenceExpr);
            self.builder.finish_node();
        }
        true
    }

    /// An operator is binary when whitespace surrounds it on both sides or
    /// on neither
    fn at_binary_operator(&self) -> bool {
        match self.current() {
            SyntaxKind::Equal => true,
            SyntaxKind::Operator => {
                let Some(token) = self.current_token() else {
                    return false;
                };
                let space_before =
                    self.previous_has_trailing_trivia() || !token.leading_trivia().is_empty();
                let space_after = !token.trailing_trivia().is_empty()
                    || self
                        .tokens
                        .get(self.pos + 1)
                        .is_some_and(|next| !next.leading_trivia().is_empty());
                space_before == space_after && !token.leading_trivia().contains('\n')
            }
            _ => false,
        }
    }

    fn unary_expr(&mut self) -> bool {
        if self.at(SyntaxKind::Operator) {
            self.builder.start_node(SyntaxKind::PrefixOperatorExpr);
            self.bump();
            if !self.unary_expr() {
                self.error_missing("an operand");
            }
            self.builder.finish_node();
            return true;
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> bool {
        let checkpoint = self.builder.checkpoint();
        if !self.primary_expr() {
            return false;
        }
        loop {
            match self.current() {
                SyntaxKind::Dot
                    if matches!(self.nth(1), SyntaxKind::Identifier | SyntaxKind::IntegerLiteral) =>
                {
                    self.builder.start_node_at(checkpoint, SyntaxKind::MemberAccessExpr);
                    self.bump();
                    self.bump();
                    self.builder.finish_node();
                }
                SyntaxKind::LParen if self.current_is_attached() => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::FunctionCallExpr);
                    self.bump();
                    self.labeled_expr_list(SyntaxKind::RParen);
                    self.expect(SyntaxKind::RParen, "`)`");
                    self.builder.finish_node();
                }
                SyntaxKind::LBracket if self.current_is_attached() => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::SubscriptCallExpr);
                    self.bump();
                    self.labeled_expr_list(SyntaxKind::RBracket);
                    self.expect(SyntaxKind::RBracket, "`]`");
                    self.builder.finish_node();
                }
                _ => return true,
            }
        }
    }

    fn primary_expr(&mut self) -> bool {
        let literal = match self.current() {
            SyntaxKind::IntegerLiteral => Some(SyntaxKind::IntegerLiteralExpr),
            SyntaxKind::FloatLiteral => Some(SyntaxKind::FloatLiteralExpr),
            SyntaxKind::StringLiteral => Some(SyntaxKind::StringLiteralExpr),
            SyntaxKind::TrueKw | SyntaxKind::FalseKw => Some(SyntaxKind::BooleanLiteralExpr),
            SyntaxKind::NilKw => Some(SyntaxKind::NilLiteralExpr),
            SyntaxKind::Identifier => Some(SyntaxKind::DeclReferenceExpr),
            _ => None,
        };
        if let Some(kind) = literal {
            self.builder.start_node(kind);
            self.bump();
            self.builder.finish_node();
            return true;
        }

        match self.current() {
            SyntaxKind::LParen => {
                self.builder.start_node(SyntaxKind::TupleExpr);
                self.bump();
                self.labeled_expr_list(SyntaxKind::RParen);
                self.expect(SyntaxKind::RParen, "`)`");
                self.builder.finish_node();
            }
            SyntaxKind::LBracket => {
                self.builder.start_node(SyntaxKind::ArrayExpr);
                self.bump();
                self.labeled_expr_list(SyntaxKind::RBracket);
                self.expect(SyntaxKind::RBracket, "`]`");
                self.builder.finish_node();
            }
            SyntaxKind::Pound => {
                self.builder.start_node(SyntaxKind::MacroExpansionExpr);
                self.macro_expansion_body();
                self.builder.finish_node();
            }
            SyntaxKind::Dot if self.nth(1) == SyntaxKind::Identifier => {
                self.builder.start_node(SyntaxKind::MemberAccessExpr);
                self.bump();
                self.bump();
                self.builder.finish_node();
            }
            _ => return false,
        }
        true
    }

    fn labeled_expr_list(&mut self, close: SyntaxKind) {
        self.builder.start_node(SyntaxKind::LabeledExprList);
        while !self.at(close) && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::LabeledExpr);
            if self.at(SyntaxKind::Identifier) && self.nth(1) == SyntaxKind::Colon {
                self.bump();
                self.bump();
            }
            if !self.expr() {
                self.recover();
            }
            let more = self.eat(SyntaxKind::Comma);
            self.builder.finish_node();
            if !more {
                break;
            }
        }
        self.builder.finish_node();
    }
}
