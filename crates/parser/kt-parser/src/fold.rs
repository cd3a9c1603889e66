//! Operator precedence folding
//!
//! The parser leaves `a + b * c` as a flat `SequenceExpr`. Folding turns
//! every sequence into nested `InfixOperatorExpr` nodes according to an
//! [`OperatorTable`]. Folding only regroups existing children, so spans
//! and text are unchanged.

use kt_span::Span;
use kt_syntax::{SyntaxElement, SyntaxKind, SyntaxNode};

/// How operators of equal precedence group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    /// `a - b - c` is `(a - b) - c`
    Left,
    /// `a = b = c` is `a = (b = c)`
    Right,
    /// `a < b < c` is an error
    None,
}

/// Operators that share a precedence level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedenceGroup {
    /// Group name
    pub name: String,
    /// Grouping of equal-precedence operators
    pub associativity: Associativity,
    /// Operator spellings in this group
    pub operators: Vec<String>,
}

impl PrecedenceGroup {
    /// Creates a group
    pub fn new(name: &str, associativity: Associativity, operators: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            associativity,
            operators: operators.iter().map(|&operator| operator.to_owned()).collect(),
        }
    }
}

/// Precedence groups ordered from tightest to loosest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorTable {
    groups: Vec<PrecedenceGroup>,
}

impl OperatorTable {
    /// Creates a table from groups ordered tightest first
    pub fn new(groups: Vec<PrecedenceGroup>) -> Self {
        Self { groups }
    }

    /// The standard operators
    pub fn standard() -> Self {
        Self::new(vec![
            PrecedenceGroup::new("Multiplication", Associativity::Left, &["*", "/", "%"]),
            PrecedenceGroup::new("Addition", Associativity::Left, &["+", "-"]),
            PrecedenceGroup::new("RangeFormation", Associativity::None, &["...", "..<"]),
            PrecedenceGroup::new("NilCoalescing", Associativity::Right, &["??"]),
            PrecedenceGroup::new(
                "Comparison",
                Associativity::None,
                &["==", "!=", "<", "<=", ">", ">="],
            ),
            PrecedenceGroup::new("LogicalConjunction", Associativity::Left, &["&&"]),
            PrecedenceGroup::new("LogicalDisjunction", Associativity::Left, &["||"]),
            PrecedenceGroup::new(
                "Assignment",
                Associativity::Right,
                &["=", "+=", "-=", "*=", "/=", "%="],
            ),
        ])
    }

    /// Precedence rank (higher binds tighter) and associativity of `operator`
    pub fn lookup(&self, operator: &str) -> Option<(usize, Associativity)> {
        self.groups.iter().enumerate().find_map(|(index, group)| {
            group
                .operators
                .iter()
                .any(|candidate| candidate == operator)
                .then_some((self.groups.len() - index, group.associativity))
        })
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Folding failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FoldError {
    /// Operator missing from the table
    #[error("unknown infix operator `{operator}`")]
    UnknownOperator {
        /// Operator spelling
        operator: String,
        /// Location of the operator
        span: Span,
    },
    /// Two non-associative operators of equal precedence next to each other
    #[error("adjacent operators `{first}` and `{second}` are non-associative")]
    NonAssociative {
        /// Left operator
        first: String,
        /// Right operator
        second: String,
        /// Location of the right operator
        span: Span,
    },
    /// An operator without an operand on one of its sides
    #[error("operator `{operator}` is missing an operand")]
    MissingOperand {
        /// Operator spelling
        operator: String,
        /// Location of the operator
        span: Span,
    },
    /// Two operands with no operator between them
    #[error("expected an infix operator between operands")]
    MissingOperator {
        /// Location of the second operand
        span: Span,
    },
}

impl FoldError {
    /// Location the error points at
    pub fn span(&self) -> Span {
        match self {
            Self::UnknownOperator { span, .. }
            | Self::NonAssociative { span, .. }
            | Self::MissingOperand { span, .. }
            | Self::MissingOperator { span } => *span,
        }
    }
}

/// Folds every `SequenceExpr` in `node`
///
/// # Errors
///
/// Returns an error for operators missing from `table`, for chains of
/// non-associative operators and for sequences that do not alternate
/// operands and operators.
pub fn fold_all(node: &SyntaxNode, table: &OperatorTable) -> Result<SyntaxNode, FoldError> {
    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        children.push(match child {
            SyntaxElement::Node(child) => SyntaxElement::Node(fold_all(child, table)?),
            SyntaxElement::Token(token) => SyntaxElement::Token(token.clone()),
        });
    }

    if node.kind() != SyntaxKind::SequenceExpr || children.is_empty() {
        return Ok(SyntaxNode::from_positioned(node.kind(), children, node.span().start));
    }
    match fold_sequence(children, node.span(), table)? {
        SyntaxElement::Node(folded) => Ok(folded),
        token @ SyntaxElement::Token(_) => Ok(SyntaxNode::from_positioned(
            SyntaxKind::SequenceExpr,
            vec![token],
            node.span().start,
        )),
    }
}

struct PendingOperator {
    element: SyntaxElement,
    text: String,
    rank: usize,
}

fn operator_text(element: &SyntaxElement) -> String {
    match element {
        SyntaxElement::Node(node) => node.trimmed_text(),
        SyntaxElement::Token(token) => token.text().to_owned(),
    }
}

fn reduce(operands: &mut Vec<SyntaxElement>, operator: PendingOperator) -> Result<(), FoldError> {
    let (Some(rhs), Some(lhs)) = (operands.pop(), operands.pop()) else {
        return Err(FoldError::MissingOperand {
            span: operator.element.span(),
            operator: operator.text,
        });
    };
    let start = lhs.span().start;
    operands.push(SyntaxElement::Node(SyntaxNode::from_positioned(
        SyntaxKind::InfixOperatorExpr,
        vec![lhs, operator.element, rhs],
        start,
    )));
    Ok(())
}

fn fold_sequence(
    elements: Vec<SyntaxElement>,
    sequence: Span,
    table: &OperatorTable,
) -> Result<SyntaxElement, FoldError> {
    let mut operands: Vec<SyntaxElement> = Vec::new();
    let mut operators: Vec<PendingOperator> = Vec::new();
    let mut expecting_operand = true;

    for element in elements {
        let span = element.span();
        if element.kind() != SyntaxKind::BinaryOperatorExpr {
            if !expecting_operand {
                return Err(FoldError::MissingOperator { span });
            }
            expecting_operand = false;
            operands.push(element);
            continue;
        }
        let text = operator_text(&element);
        if expecting_operand {
            return Err(FoldError::MissingOperand { operator: text, span });
        }
        expecting_operand = true;
        let (rank, associativity) = table
            .lookup(&text)
            .ok_or_else(|| FoldError::UnknownOperator {
                operator: text.clone(),
                span,
            })?;

        while let Some(top) = operators.last() {
            let reduce_top = top.rank > rank
                || (top.rank == rank && associativity == Associativity::Left);
            if top.rank == rank && associativity == Associativity::None {
                return Err(FoldError::NonAssociative {
                    first: top.text.clone(),
                    second: text,
                    span,
                });
            }
            if !reduce_top {
                break;
            }
            if let Some(top) = operators.pop() {
                reduce(&mut operands, top)?;
            }
        }
        operators.push(PendingOperator { element, text, rank });
    }

    if expecting_operand && let Some(last) = operators.pop() {
        return Err(FoldError::MissingOperand {
            span: last.element.span(),
            operator: last.text,
        });
    }
    while let Some(top) = operators.pop() {
        reduce(&mut operands, top)?;
    }
    match (operands.pop(), operands.is_empty()) {
        (Some(folded), true) => Ok(folded),
        _ => Err(FoldError::MissingOperator { span: sequence }),
    }
}
