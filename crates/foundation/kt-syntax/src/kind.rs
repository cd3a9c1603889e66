//! Node and token kinds

use std::fmt;

/// Every kind of token and node the tree can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // Tokens
    /// Identifier
    Identifier,
    /// Integer literal
    IntegerLiteral,
    /// Floating point literal
    FloatLiteral,
    /// Double-quoted string literal, quotes included
    StringLiteral,
    /// `var`
    VarKw,
    /// `let`
    LetKw,
    /// `func`
    FuncKw,
    /// `struct`
    StructKw,
    /// `class`
    ClassKw,
    /// `enum`
    EnumKw,
    /// `protocol`
    ProtocolKw,
    /// `extension`
    ExtensionKw,
    /// `import`
    ImportKw,
    /// `return`
    ReturnKw,
    /// `case`
    CaseKw,
    /// `true`
    TrueKw,
    /// `false`
    FalseKw,
    /// `nil`
    NilKw,
    /// Declaration modifier such as `public` or `static`
    ModifierKw,
    /// `#`
    Pound,
    /// `@`
    At,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `.`
    Dot,
    /// `->`
    Arrow,
    /// `=`
    Equal,
    /// Operator such as `+` or `..<`
    Operator,
    /// Character the lexer could not classify
    Unknown,
    /// End of input, carries the file's final trivia
    Eof,

    // Nodes
    /// Root of a parsed file
    SourceFile,
    /// Sequence of statements, expressions and declarations
    CodeBlockItemList,
    /// `{ ... }` body
    CodeBlock,
    /// `{ ... }` body of a declaration group
    MemberBlock,
    /// Declarations inside a member block
    MemberBlockItemList,
    /// Attributes preceding a declaration
    AttributeList,
    /// `@Name` or `@Name(args)`
    Attribute,
    /// Modifiers preceding a declaration
    ModifierList,
    /// `import A.B`
    ImportDecl,
    /// `var` or `let` declaration
    VariableDecl,
    /// `: Type`
    TypeAnnotation,
    /// `= value`
    InitializerClause,
    /// `{ get ... set ... }` or an implicit getter
    AccessorBlock,
    /// `get { ... }`, `set { ... }`, `willSet`, `didSet`
    AccessorDecl,
    /// `func` declaration
    FunctionDecl,
    /// `( params )`
    ParameterClause,
    /// `label name: Type`
    FunctionParameter,
    /// `-> Type`
    ReturnClause,
    /// `struct` declaration
    StructDecl,
    /// `class` declaration
    ClassDecl,
    /// `enum` declaration
    EnumDecl,
    /// `protocol` declaration
    ProtocolDecl,
    /// `extension` declaration
    ExtensionDecl,
    /// `case a, b` inside an enum
    EnumCaseDecl,
    /// `: A, B`
    InheritanceClause,
    /// Freestanding `#name(args)` in declaration position
    MacroExpansionDecl,
    /// `Name`
    IdentifierType,
    /// `Base.Name`
    MemberType,
    /// `Type?`
    OptionalType,
    /// `[Type]`
    ArrayType,
    /// Unfolded `a + b * c`
    SequenceExpr,
    /// Folded `lhs op rhs`
    InfixOperatorExpr,
    /// Operator inside a sequence or infix expression
    BinaryOperatorExpr,
    /// `-x`, `!x`
    PrefixOperatorExpr,
    /// Integer literal expression
    IntegerLiteralExpr,
    /// Float literal expression
    FloatLiteralExpr,
    /// String literal expression
    StringLiteralExpr,
    /// `true` / `false`
    BooleanLiteralExpr,
    /// `nil`
    NilLiteralExpr,
    /// Reference to a name
    DeclReferenceExpr,
    /// `(a, b)` or a parenthesized expression
    TupleExpr,
    /// `[a, b]`
    ArrayExpr,
    /// `f(args)`
    FunctionCallExpr,
    /// `a[args]`
    SubscriptCallExpr,
    /// `a.b`
    MemberAccessExpr,
    /// Freestanding `#name(args)` in expression position
    MacroExpansionExpr,
    /// Comma separated arguments
    LabeledExprList,
    /// `label: expr` or `expr`, with its trailing comma
    LabeledExpr,
    /// `return expr`
    ReturnStmt,
    /// Tokens the parser skipped during recovery
    Unexpected,
}

impl SyntaxKind {
    /// Whether this kind is a leaf token
    pub fn is_token(self) -> bool {
        (self as u8) <= (Self::Eof as u8)
    }

    /// Whether this kind is a keyword token
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::VarKw
                | Self::LetKw
                | Self::FuncKw
                | Self::StructKw
                | Self::ClassKw
                | Self::EnumKw
                | Self::ProtocolKw
                | Self::ExtensionKw
                | Self::ImportKw
                | Self::ReturnKw
                | Self::CaseKw
                | Self::TrueKw
                | Self::FalseKw
                | Self::NilKw
                | Self::ModifierKw
        )
    }

    /// Whether this kind is a declaration node
    pub fn is_decl(self) -> bool {
        matches!(
            self,
            Self::ImportDecl
                | Self::VariableDecl
                | Self::FunctionDecl
                | Self::EnumCaseDecl
                | Self::MacroExpansionDecl
        ) || self.is_decl_group()
    }

    /// Whether this kind is a declaration that owns a member block
    pub fn is_decl_group(self) -> bool {
        matches!(
            self,
            Self::StructDecl
                | Self::ClassDecl
                | Self::EnumDecl
                | Self::ProtocolDecl
                | Self::ExtensionDecl
        )
    }

    /// Whether this kind is an expression node
    pub fn is_expr(self) -> bool {
        matches!(
            self,
            Self::SequenceExpr
                | Self::InfixOperatorExpr
                | Self::PrefixOperatorExpr
                | Self::IntegerLiteralExpr
                | Self::FloatLiteralExpr
                | Self::StringLiteralExpr
                | Self::BooleanLiteralExpr
                | Self::NilLiteralExpr
                | Self::DeclReferenceExpr
                | Self::TupleExpr
                | Self::ArrayExpr
                | Self::FunctionCallExpr
                | Self::SubscriptCallExpr
                | Self::MemberAccessExpr
                | Self::MacroExpansionExpr
        )
    }

    /// Whether this kind is a type node
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::IdentifierType | Self::MemberType | Self::OptionalType | Self::ArrayType
        )
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}
