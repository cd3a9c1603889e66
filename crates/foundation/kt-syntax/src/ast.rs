//! Typed views over untyped nodes
//!
//! A view is a borrowed [`SyntaxNode`] whose kind has been checked, with
//! accessors for the parts macro implementations care about.

use crate::kind::SyntaxKind;
use crate::node::SyntaxNode;

/// A node narrowed to a particular syntactic shape
pub trait AstNode<'tree>: Copy {
    /// Name of the shape, used in error messages
    const SHAPE: &'static str;

    /// Whether a node of `kind` has this shape
    fn can_cast(kind: SyntaxKind) -> bool;

    /// Narrows `node` to this shape
    fn cast(node: &'tree SyntaxNode) -> Option<Self>;

    /// The underlying node
    fn syntax(self) -> &'tree SyntaxNode;
}

macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident, $shape:literal, |$kind:ident| $test:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'tree> {
            syntax: &'tree SyntaxNode,
        }

        impl<'tree> AstNode<'tree> for $name<'tree> {
            const SHAPE: &'static str = $shape;

            fn can_cast($kind: SyntaxKind) -> bool {
                $test
            }

            fn cast(node: &'tree SyntaxNode) -> Option<Self> {
                Self::can_cast(node.kind()).then_some(Self { syntax: node })
            }

            fn syntax(self) -> &'tree SyntaxNode {
                self.syntax
            }
        }
    };
}

ast_node!(
    /// `#name(args)` in either expression or declaration position
    FreestandingMacroExpansion,
    "freestanding macro expansion",
    |kind| matches!(kind, SyntaxKind::MacroExpansionExpr | SyntaxKind::MacroExpansionDecl)
);

ast_node!(
    /// `@Name` or `@Name(args)`
    Attribute,
    "attribute",
    |kind| kind == SyntaxKind::Attribute
);

ast_node!(
    /// Any declaration
    Decl,
    "declaration",
    |kind| kind.is_decl()
);

ast_node!(
    /// A declaration that owns a member block
    DeclGroup,
    "declaration group",
    |kind| kind.is_decl_group()
);

ast_node!(
    /// `var` or `let`
    VariableDecl,
    "variable declaration",
    |kind| kind == SyntaxKind::VariableDecl
);

ast_node!(
    /// Any expression
    Expr,
    "expression",
    |kind| kind.is_expr()
);

ast_node!(
    /// One argument of a call, macro expansion or attribute
    LabeledExpr,
    "argument",
    |kind| kind == SyntaxKind::LabeledExpr
);

ast_node!(
    /// `"text"`
    StringLiteralExpr,
    "string literal",
    |kind| kind == SyntaxKind::StringLiteralExpr
);

ast_node!(
    /// `get`, `set`, `willSet` or `didSet` with an optional body
    AccessorDecl,
    "accessor",
    |kind| kind == SyntaxKind::AccessorDecl
);

fn identifier(node: &SyntaxNode) -> Option<&str> {
    node.child_token(SyntaxKind::Identifier).map(|token| token.text())
}

fn arguments(node: &SyntaxNode) -> impl Iterator<Item = LabeledExpr<'_>> {
    node.child_node(SyntaxKind::LabeledExprList)
        .into_iter()
        .flat_map(SyntaxNode::child_nodes)
        .filter_map(LabeledExpr::cast)
}

impl<'tree> FreestandingMacroExpansion<'tree> {
    /// Name following the `#`
    pub fn macro_name(self) -> Option<&'tree str> {
        identifier(self.syntax)
    }

    /// Arguments between the parentheses
    pub fn arguments(self) -> impl Iterator<Item = LabeledExpr<'tree>> {
        arguments(self.syntax)
    }
}

impl<'tree> Attribute<'tree> {
    /// Name following the `@`
    pub fn name(self) -> Option<&'tree str> {
        identifier(self.syntax)
    }

    /// Arguments between the parentheses, if any
    pub fn arguments(self) -> impl Iterator<Item = LabeledExpr<'tree>> {
        arguments(self.syntax)
    }
}

impl<'tree> LabeledExpr<'tree> {
    /// Label before the colon, if any
    pub fn label(self) -> Option<&'tree str> {
        let mut tokens = self.syntax.child_tokens();
        match (tokens.next(), tokens.next()) {
            (Some(label), Some(colon))
                if label.kind() == SyntaxKind::Identifier && colon.kind() == SyntaxKind::Colon =>
            {
                Some(label.text())
            }
            _ => None,
        }
    }

    /// The argument value
    pub fn expression(self) -> Option<Expr<'tree>> {
        self.syntax.child_nodes().find_map(Expr::cast)
    }
}

impl StringLiteralExpr<'_> {
    /// The literal's value with quotes removed and escapes resolved
    pub fn value(self) -> Option<String> {
        let text = self.syntax.child_token(SyntaxKind::StringLiteral)?.text();
        let body = text.strip_prefix('"')?.strip_suffix('"')?;
        let mut value = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            match chars.next()? {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                other => value.push(other),
            }
        }
        Some(value)
    }
}

impl<'tree> Decl<'tree> {
    /// Attributes written before the declaration
    pub fn attributes(self) -> impl Iterator<Item = Attribute<'tree>> {
        self.syntax
            .child_node(SyntaxKind::AttributeList)
            .into_iter()
            .flat_map(SyntaxNode::child_nodes)
            .filter_map(Attribute::cast)
    }

    /// Whether an attribute named `name` is attached
    pub fn has_attribute(self, name: &str) -> bool {
        self.attributes().any(|attribute| attribute.name() == Some(name))
    }

    /// Modifiers such as `public` or `static`
    pub fn modifiers(self) -> impl Iterator<Item = &'tree str> {
        self.syntax
            .child_node(SyntaxKind::ModifierList)
            .into_iter()
            .flat_map(SyntaxNode::child_tokens)
            .map(|token| token.text())
    }

    /// The declared name; for extensions, the first name of the extended type
    pub fn name(self) -> Option<&'tree str> {
        identifier(self.syntax).or_else(|| {
            self.syntax
                .child_nodes()
                .find(|node| node.kind().is_type())
                .and_then(SyntaxNode::first_token)
                .map(|token| token.text())
        })
    }
}

impl<'tree> DeclGroup<'tree> {
    /// The group viewed as a plain declaration
    pub fn as_decl(self) -> Decl<'tree> {
        Decl {
            syntax: self.syntax,
        }
    }

    /// The declared name
    pub fn name(self) -> Option<&'tree str> {
        self.as_decl().name()
    }

    /// Member declarations in source order
    pub fn members(self) -> impl Iterator<Item = Decl<'tree>> {
        self.syntax
            .child_node(SyntaxKind::MemberBlock)
            .and_then(|block| block.child_node(SyntaxKind::MemberBlockItemList))
            .into_iter()
            .flat_map(SyntaxNode::child_nodes)
            .filter_map(Decl::cast)
    }
}

impl<'tree> VariableDecl<'tree> {
    /// The variable viewed as a plain declaration
    pub fn as_decl(self) -> Decl<'tree> {
        Decl {
            syntax: self.syntax,
        }
    }

    /// Name of the bound variable
    pub fn binding_name(self) -> Option<&'tree str> {
        identifier(self.syntax)
    }

    /// Whether the binding was introduced with `let`
    pub fn is_let(self) -> bool {
        self.syntax.child_token(SyntaxKind::LetKw).is_some()
    }

    /// Whether the declaration carries the `static` modifier
    pub fn is_static(self) -> bool {
        self.as_decl().modifiers().any(|modifier| modifier == "static")
    }

    /// The annotated type
    pub fn type_annotation(self) -> Option<&'tree SyntaxNode> {
        self.syntax
            .child_node(SyntaxKind::TypeAnnotation)
            .and_then(|annotation| annotation.child_nodes().find(|node| node.kind().is_type()))
    }

    /// The initial value
    pub fn initializer(self) -> Option<Expr<'tree>> {
        self.syntax
            .child_node(SyntaxKind::InitializerClause)
            .and_then(|clause| clause.child_nodes().find_map(Expr::cast))
    }

    /// The accessor block, if any
    pub fn accessor_block(self) -> Option<&'tree SyntaxNode> {
        self.syntax.child_node(SyntaxKind::AccessorBlock)
    }

    /// Accessors declared in the accessor block
    pub fn accessors(self) -> impl Iterator<Item = AccessorDecl<'tree>> {
        self.accessor_block()
            .into_iter()
            .flat_map(SyntaxNode::child_nodes)
            .filter_map(AccessorDecl::cast)
    }

    /// Whether the variable has storage: no accessor block, or only
    /// observers
    pub fn is_stored(self) -> bool {
        let Some(block) = self.accessor_block() else {
            return true;
        };
        if block.child_node(SyntaxKind::CodeBlockItemList).is_some() {
            return false;
        }
        self.accessors()
            .all(|accessor| matches!(accessor.accessor_kind(), Some("willSet" | "didSet")))
    }
}

impl<'tree> AccessorDecl<'tree> {
    /// `get`, `set`, `willSet` or `didSet`
    pub fn accessor_kind(self) -> Option<&'tree str> {
        identifier(self.syntax)
    }
}
