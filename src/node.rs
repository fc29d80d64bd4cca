//! Abstract syntax tree for Signal Temporal Logic specifications.
//!
//! A specification is a tree of [`Node`] values. Each node owns its children exclusively, so a
//! tree never shares subtrees and never contains cycles. The shape of a node is described by its
//! [`Expr`], a closed sum type which groups the operators into families:
//!
//!   - leaves: [`Expr::Constant`] and [`Expr::Variable`]
//!   - arithmetic and relational operators: [`Expr::Abs`], [`Expr::Arithmetic`] and
//!     [`Expr::Predicate`]
//!   - boolean operators: [`Expr::Neg`] and [`Expr::Logic`]
//!   - past temporal operators: [`Expr::Edge`] (rise and fall), [`Expr::UnaryTemporal`] with
//!     [`UnaryTemporalOp::Once`] or [`UnaryTemporalOp::Historically`], and
//!     [`Expr::BinaryTemporal`] with [`BinaryTemporalOp::Since`] or [`BinaryTemporalOp::Precedes`]
//!   - future temporal operators: [`UnaryTemporalOp::Eventually`], [`UnaryTemporalOp::Always`]
//!     and [`BinaryTemporalOp::Until`]
//!
//! Besides its shape, every node carries a _horizon_, the number of samples beyond the current one
//! that the node needs in order to produce a value. The horizon is computed by
//! [`compute_horizon`](crate::compute_horizon) or injected by the caller with
//! [`Node::set_horizon`].
//!
//! The display representation of a node is its canonical serialization:
//!
//! ```rust
//! use banquo_online::{ComparisonOp, Interval, Node};
//!
//! let request = Node::predicate(ComparisonOp::Geq, Node::variable("req"), Node::constant(3.0));
//! let grant = Node::variable("gnt");
//! let window = Interval::new(0, 5).unwrap();
//! let formula = Node::implies(request, Node::eventually_bounded(window, grant));
//!
//! assert_eq!(formula.name(), "((req)>=(3))->(eventually[0,5](gnt))");
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use ordered_float::OrderedFloat;

use crate::backend::{Backend, Evaluator, Operation, OperationKind};
use crate::errors::{MalformedNodeError, UnsupportedBackendError};
use crate::interval::Interval;

/// Relational operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Less,
    Leq,
    Greater,
    Geq,
    Equal,
    Neq,
}

impl ComparisonOp {
    /// The infix token of the operator.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Leq => "<=",
            Self::Greater => ">",
            Self::Geq => ">=",
            Self::Equal => "==",
            Self::Neq => "!=",
        }
    }
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ComparisonOp {
    type Err = MalformedNodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Self::Less),
            "<=" => Ok(Self::Leq),
            ">" => Ok(Self::Greater),
            ">=" => Ok(Self::Geq),
            "==" => Ok(Self::Equal),
            "!=" => Ok(Self::Neq),
            other => Err(MalformedNodeError::UnknownComparison(other.to_string())),
        }
    }
}

/// Role of a variable in the monitored system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    Input,
    Output,
    Internal,
}

impl FromStr for Role {
    type Err = MalformedNodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            "internal" => Ok(Self::Internal),
            other => Err(MalformedNodeError::UnknownRole(other.to_string())),
        }
    }
}

/// Reference to a signal, optionally narrowed to one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: String,
    field: Option<String>,
    role: Role,
}

impl Variable {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            field: None,
            role: Role::default(),
        }
    }

    /// Narrow the variable to a field. An empty field name leaves the variable unchanged.
    pub fn with_field<F: Into<String>>(mut self, field: F) -> Self {
        let field = field.into();
        self.field = if field.is_empty() { None } else { Some(field) };
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}", self.name, field),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl ArithmeticOp {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "-",
            Self::Multiplication => "*",
            Self::Division => "/",
        }
    }

    fn kind(&self) -> OperationKind {
        match self {
            Self::Addition => OperationKind::Addition,
            Self::Subtraction => OperationKind::Subtraction,
            Self::Multiplication => OperationKind::Multiplication,
            Self::Division => OperationKind::Division,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    Conjunction,
    Disjunction,
    Implies,
    Iff,
    Xor,
}

impl LogicOp {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Conjunction => "and",
            Self::Disjunction => "or",
            Self::Implies => "->",
            Self::Iff => "<->",
            Self::Xor => "xor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeOp {
    Rise,
    Fall,
}

impl EdgeOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Rise => "rise",
            Self::Fall => "fall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryTemporalOp {
    Once,
    Historically,
    Eventually,
    Always,
}

impl UnaryTemporalOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Historically => "historically",
            Self::Eventually => "eventually",
            Self::Always => "always",
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, Self::Eventually | Self::Always)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryTemporalOp {
    Since,
    Precedes,
    Until,
}

impl BinaryTemporalOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Since => "since",
            Self::Precedes => "precedes",
            Self::Until => "until",
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, Self::Until)
    }
}

/// Flat description of a node's operator, used to assemble nodes from parts.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Constant(f64),
    Variable(Variable),
    Abs,
    Arithmetic(ArithmeticOp),
    Predicate(ComparisonOp),
    Neg,
    Logic(LogicOp),
    Edge(EdgeOp),
    UnaryTemporal(UnaryTemporalOp),
    BinaryTemporal(BinaryTemporalOp),
}

impl Operator {
    /// Number of children a node with this operator owns.
    pub fn arity(&self) -> usize {
        match self {
            Self::Constant(_) | Self::Variable(_) => 0,
            Self::Abs | Self::Neg | Self::Edge(_) | Self::UnaryTemporal(_) => 1,
            Self::Arithmetic(_)
            | Self::Predicate(_)
            | Self::Logic(_)
            | Self::BinaryTemporal(_) => 2,
        }
    }

    /// Whether nodes with this operator may carry an interval.
    pub fn accepts_interval(&self) -> bool {
        matches!(self, Self::UnaryTemporal(_) | Self::BinaryTemporal(_))
    }

    /// Short human-readable name of the operator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Variable(_) => "variable",
            Self::Abs => "abs",
            Self::Arithmetic(op) => op.token(),
            Self::Predicate(op) => op.token(),
            Self::Neg => "not",
            Self::Logic(op) => op.token(),
            Self::Edge(op) => op.keyword(),
            Self::UnaryTemporal(op) => op.keyword(),
            Self::BinaryTemporal(op) => op.keyword(),
        }
    }
}

/// Shape of a node: its operator, operands, interval and evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant {
        value: OrderedFloat<f64>,
        evaluator: Evaluator,
    },
    Variable {
        variable: Variable,
        evaluator: Evaluator,
    },
    Abs {
        operand: Box<Node>,
        evaluator: Evaluator,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Node>,
        right: Box<Node>,
        evaluator: Evaluator,
    },
    Predicate {
        op: ComparisonOp,
        left: Box<Node>,
        right: Box<Node>,
        evaluator: Evaluator,
    },
    Neg(Box<Node>),
    Logic {
        op: LogicOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Edge {
        op: EdgeOp,
        operand: Box<Node>,
    },
    UnaryTemporal {
        op: UnaryTemporalOp,
        interval: Option<Interval>,
        operand: Box<Node>,
    },
    BinaryTemporal {
        op: BinaryTemporalOp,
        interval: Option<Interval>,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A node of a specification tree.
///
/// Nodes compare equal when their shapes are equal; the horizon is scratch state and does not take
/// part in the comparison.
#[derive(Debug, Clone)]
pub struct Node {
    expr: Expr,
    horizon: Option<usize>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

fn boxed(node: Node) -> Box<Node> {
    Box::new(node)
}

impl Node {
    fn from_expr(expr: Expr) -> Self {
        Self { expr, horizon: None }
    }

    pub fn constant(value: f64) -> Self {
        let value = OrderedFloat(value);
        let evaluator = Evaluator::reference(OperationKind::Constant(value));

        Self::from_expr(Expr::Constant { value, evaluator })
    }

    /// Create a variable node without a field.
    pub fn variable<N: Into<String>>(name: N) -> Self {
        Self::from_variable(Variable::new(name))
    }

    pub fn from_variable(variable: Variable) -> Self {
        let evaluator = Evaluator::reference(OperationKind::Variable);
        Self::from_expr(Expr::Variable { variable, evaluator })
    }

    pub fn abs(operand: Node) -> Self {
        let evaluator = Evaluator::reference(OperationKind::Abs);

        Self::from_expr(Expr::Abs {
            operand: boxed(operand),
            evaluator,
        })
    }

    pub fn arithmetic(op: ArithmeticOp, left: Node, right: Node) -> Self {
        Self::from_expr(Expr::Arithmetic {
            op,
            left: boxed(left),
            right: boxed(right),
            evaluator: Evaluator::reference(op.kind()),
        })
    }

    pub fn addition(left: Node, right: Node) -> Self {
        Self::arithmetic(ArithmeticOp::Addition, left, right)
    }

    pub fn subtraction(left: Node, right: Node) -> Self {
        Self::arithmetic(ArithmeticOp::Subtraction, left, right)
    }

    pub fn multiplication(left: Node, right: Node) -> Self {
        Self::arithmetic(ArithmeticOp::Multiplication, left, right)
    }

    pub fn division(left: Node, right: Node) -> Self {
        Self::arithmetic(ArithmeticOp::Division, left, right)
    }

    pub fn predicate(op: ComparisonOp, left: Node, right: Node) -> Self {
        Self::from_expr(Expr::Predicate {
            op,
            left: boxed(left),
            right: boxed(right),
            evaluator: Evaluator::reference(OperationKind::Predicate(op)),
        })
    }

    pub fn neg(operand: Node) -> Self {
        Self::from_expr(Expr::Neg(boxed(operand)))
    }

    pub fn logic(op: LogicOp, left: Node, right: Node) -> Self {
        Self::from_expr(Expr::Logic {
            op,
            left: boxed(left),
            right: boxed(right),
        })
    }

    pub fn conjunction(left: Node, right: Node) -> Self {
        Self::logic(LogicOp::Conjunction, left, right)
    }

    pub fn disjunction(left: Node, right: Node) -> Self {
        Self::logic(LogicOp::Disjunction, left, right)
    }

    pub fn implies(left: Node, right: Node) -> Self {
        Self::logic(LogicOp::Implies, left, right)
    }

    pub fn iff(left: Node, right: Node) -> Self {
        Self::logic(LogicOp::Iff, left, right)
    }

    pub fn xor(left: Node, right: Node) -> Self {
        Self::logic(LogicOp::Xor, left, right)
    }

    pub fn rise(operand: Node) -> Self {
        Self::from_expr(Expr::Edge {
            op: EdgeOp::Rise,
            operand: boxed(operand),
        })
    }

    pub fn fall(operand: Node) -> Self {
        Self::from_expr(Expr::Edge {
            op: EdgeOp::Fall,
            operand: boxed(operand),
        })
    }

    pub fn unary_temporal(op: UnaryTemporalOp, interval: Option<Interval>, operand: Node) -> Self {
        Self::from_expr(Expr::UnaryTemporal {
            op,
            interval,
            operand: boxed(operand),
        })
    }

    pub fn binary_temporal(
        op: BinaryTemporalOp,
        interval: Option<Interval>,
        left: Node,
        right: Node,
    ) -> Self {
        Self::from_expr(Expr::BinaryTemporal {
            op,
            interval,
            left: boxed(left),
            right: boxed(right),
        })
    }

    pub fn once(operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Once, None, operand)
    }

    pub fn once_bounded(interval: Interval, operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Once, Some(interval), operand)
    }

    pub fn historically(operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Historically, None, operand)
    }

    pub fn historically_bounded(interval: Interval, operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Historically, Some(interval), operand)
    }

    pub fn eventually(operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Eventually, None, operand)
    }

    pub fn eventually_bounded(interval: Interval, operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Eventually, Some(interval), operand)
    }

    pub fn always(operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Always, None, operand)
    }

    pub fn always_bounded(interval: Interval, operand: Node) -> Self {
        Self::unary_temporal(UnaryTemporalOp::Always, Some(interval), operand)
    }

    pub fn since(left: Node, right: Node) -> Self {
        Self::binary_temporal(BinaryTemporalOp::Since, None, left, right)
    }

    pub fn since_bounded(interval: Interval, left: Node, right: Node) -> Self {
        Self::binary_temporal(BinaryTemporalOp::Since, Some(interval), left, right)
    }

    pub fn precedes(left: Node, right: Node) -> Self {
        Self::binary_temporal(BinaryTemporalOp::Precedes, None, left, right)
    }

    pub fn precedes_bounded(interval: Interval, left: Node, right: Node) -> Self {
        Self::binary_temporal(BinaryTemporalOp::Precedes, Some(interval), left, right)
    }

    pub fn until(left: Node, right: Node) -> Self {
        Self::binary_temporal(BinaryTemporalOp::Until, None, left, right)
    }

    pub fn until_bounded(interval: Interval, left: Node, right: Node) -> Self {
        Self::binary_temporal(BinaryTemporalOp::Until, Some(interval), left, right)
    }

    /// Assemble a node from an operator, its children and an optional interval.
    ///
    /// This is the checked counterpart of the typed constructors, for callers that only know the
    /// shape of a node at runtime. Leaf, arithmetic and relational nodes use the reference backend.
    ///
    /// # Example
    ///
    /// ```rust
    /// use banquo_online::{Interval, Node, Operator, UnaryTemporalOp};
    ///
    /// let op = Operator::UnaryTemporal(UnaryTemporalOp::Always);
    /// let interval = Interval::new(0, 2).ok();
    /// let node = Node::from_parts(op.clone(), vec![Node::variable("x")], interval).unwrap();
    ///
    /// assert_eq!(node.name(), "always[0,2](x)");
    /// assert!(Node::from_parts(op, vec![], None).is_err());
    /// ```
    pub fn from_parts(
        operator: Operator,
        children: Vec<Node>,
        interval: Option<Interval>,
    ) -> Result<Self, MalformedNodeError> {
        if children.len() != operator.arity() {
            return Err(MalformedNodeError::Arity {
                operator: operator.label(),
                expected: operator.arity(),
                actual: children.len(),
            });
        }

        if interval.is_some() && !operator.accepts_interval() {
            return Err(MalformedNodeError::UnexpectedInterval(operator.label()));
        }

        let mut children = children.into_iter();
        let mut next = || children.next().ok_or(MalformedNodeError::Arity {
            operator: operator.label(),
            expected: operator.arity(),
            actual: 0,
        });

        let node = match &operator {
            Operator::Constant(value) => Self::constant(*value),
            Operator::Variable(variable) => Self::from_variable(variable.clone()),
            Operator::Abs => Self::abs(next()?),
            Operator::Arithmetic(op) => Self::arithmetic(*op, next()?, next()?),
            Operator::Predicate(op) => Self::predicate(*op, next()?, next()?),
            Operator::Neg => Self::neg(next()?),
            Operator::Logic(op) => Self::logic(*op, next()?, next()?),
            Operator::Edge(EdgeOp::Rise) => Self::rise(next()?),
            Operator::Edge(EdgeOp::Fall) => Self::fall(next()?),
            Operator::UnaryTemporal(op) => Self::unary_temporal(*op, interval, next()?),
            Operator::BinaryTemporal(op) => Self::binary_temporal(*op, interval, next()?, next()?),
        };

        Ok(node)
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Flat description of this node's operator.
    pub fn operator(&self) -> Operator {
        match &self.expr {
            Expr::Constant { value, .. } => Operator::Constant(value.into_inner()),
            Expr::Variable { variable, .. } => Operator::Variable(variable.clone()),
            Expr::Abs { .. } => Operator::Abs,
            Expr::Arithmetic { op, .. } => Operator::Arithmetic(*op),
            Expr::Predicate { op, .. } => Operator::Predicate(*op),
            Expr::Neg(_) => Operator::Neg,
            Expr::Logic { op, .. } => Operator::Logic(*op),
            Expr::Edge { op, .. } => Operator::Edge(*op),
            Expr::UnaryTemporal { op, .. } => Operator::UnaryTemporal(*op),
            Expr::BinaryTemporal { op, .. } => Operator::BinaryTemporal(*op),
        }
    }

    /// Children of the node in operand order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.expr {
            Expr::Constant { .. } | Expr::Variable { .. } => vec![],
            Expr::Abs { operand, .. }
            | Expr::Neg(operand)
            | Expr::Edge { operand, .. }
            | Expr::UnaryTemporal { operand, .. } => vec![operand.as_ref()],
            Expr::Arithmetic { left, right, .. }
            | Expr::Predicate { left, right, .. }
            | Expr::Logic { left, right, .. }
            | Expr::BinaryTemporal { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Vec<&mut Node> {
        match &mut self.expr {
            Expr::Constant { .. } | Expr::Variable { .. } => vec![],
            Expr::Abs { operand, .. }
            | Expr::Neg(operand)
            | Expr::Edge { operand, .. }
            | Expr::UnaryTemporal { operand, .. } => vec![operand.as_mut()],
            Expr::Arithmetic { left, right, .. }
            | Expr::Predicate { left, right, .. }
            | Expr::Logic { left, right, .. }
            | Expr::BinaryTemporal { left, right, .. } => vec![left.as_mut(), right.as_mut()],
        }
    }

    pub fn interval(&self) -> Option<Interval> {
        match &self.expr {
            Expr::UnaryTemporal { interval, .. }
            | Expr::BinaryTemporal { interval, .. } => *interval,
            _ => None,
        }
    }

    /// The evaluator attached to a leaf, arithmetic or relational node.
    pub fn evaluator(&self) -> Option<&Evaluator> {
        match &self.expr {
            Expr::Constant { evaluator, .. }
            | Expr::Variable { evaluator, .. }
            | Expr::Abs { evaluator, .. }
            | Expr::Arithmetic { evaluator, .. }
            | Expr::Predicate { evaluator, .. } => Some(evaluator),
            _ => None,
        }
    }

    pub fn backend(&self) -> Option<Backend> {
        self.evaluator().map(Evaluator::backend)
    }

    fn evaluator_mut(&mut self) -> Option<&mut Evaluator> {
        match &mut self.expr {
            Expr::Constant { evaluator, .. }
            | Expr::Variable { evaluator, .. }
            | Expr::Abs { evaluator, .. }
            | Expr::Arithmetic { evaluator, .. }
            | Expr::Predicate { evaluator, .. } => Some(evaluator),
            _ => None,
        }
    }

    fn select_backend(&mut self, backend: Backend) -> Result<(), UnsupportedBackendError> {
        if let Some(evaluator) = self.evaluator_mut() {
            *evaluator = Evaluator::select(backend, evaluator.kind())?;
        }

        Ok(())
    }

    /// Replace the evaluator of this node with one produced by `backend`.
    ///
    /// Children keep their evaluators, so a single tree may combine both backends. Nodes without an
    /// evaluator are returned unchanged.
    ///
    /// ```rust
    /// use banquo_online::{Backend, Node};
    ///
    /// let sum = Node::addition(Node::variable("x"), Node::constant(1.0))
    ///     .using_backend(Backend::Reference)
    ///     .unwrap();
    ///
    /// assert_eq!(sum.backend(), Some(Backend::Reference));
    /// assert!(Node::neg(Node::variable("x")).using_backend(Backend::Native).is_ok());
    /// ```
    pub fn using_backend(mut self, backend: Backend) -> Result<Self, UnsupportedBackendError> {
        self.select_backend(backend)?;
        Ok(self)
    }

    /// Replace the evaluator of every leaf, arithmetic and relational node in the tree with one
    /// produced by `backend`.
    ///
    /// Horizons are preserved.
    pub fn with_backend(mut self, backend: Backend) -> Result<Self, UnsupportedBackendError> {
        self.attach_backend(backend)?;
        Ok(self)
    }

    fn attach_backend(&mut self, backend: Backend) -> Result<(), UnsupportedBackendError> {
        self.select_backend(backend)?;

        for child in self.children_mut() {
            child.attach_backend(backend)?;
        }

        Ok(())
    }

    /// Copy the evaluator of `other` onto this node if both nodes evaluate the same operation.
    pub(crate) fn inherit_evaluator(&mut self, other: &Node) {
        let source = match other.evaluator() {
            Some(evaluator) => *evaluator,
            None => return,
        };

        if let Some(evaluator) = self.evaluator_mut() {
            if evaluator.kind() == source.kind() {
                *evaluator = source;
            }
        }
    }

    pub fn horizon(&self) -> Option<usize> {
        self.horizon
    }

    /// Inject a horizon known ahead of time, bypassing the horizon computation for this node.
    ///
    /// Only this node is updated; descendants keep whatever horizon they already had.
    pub fn set_horizon(&mut self, horizon: usize) {
        self.horizon = Some(horizon);
    }

    pub fn clear_horizon(&mut self) {
        self.horizon = None;
    }

    pub(crate) fn store_horizon(&mut self, horizon: Option<usize>) {
        self.horizon = horizon;
    }

    /// Canonical serialization of the subtree rooted at this node.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Whether this node is a future temporal operator with a finite interval.
    pub fn is_bounded_future(&self) -> bool {
        let finite = self.interval().map_or(false, |interval| interval.is_finite());
        self.is_future() && finite
    }

    /// Whether this node is a future temporal operator.
    pub fn is_future(&self) -> bool {
        match &self.expr {
            Expr::UnaryTemporal { op, .. } => op.is_future(),
            Expr::BinaryTemporal { op, .. } => op.is_future(),
            _ => false,
        }
    }

    /// Whether the subtree contains no future temporal operator.
    pub fn is_past_only(&self) -> bool {
        self.nodes().all(|node| !node.is_future())
    }

    /// Iterate over the subtree in pre-order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// Number of nodes in the subtree.
    pub fn size(&self) -> usize {
        self.nodes().count()
    }

    /// Length of the longest path from this node to a leaf, counted in nodes.
    pub fn depth(&self) -> usize {
        1 + self.children().into_iter().map(Node::depth).max().unwrap_or(0)
    }
}

/// Pre-order iterator over the nodes of a tree, created by [`Node::nodes`].
pub struct Nodes<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());

        Some(node)
    }
}

fn write_interval(f: &mut Formatter<'_>, interval: &Option<Interval>) -> std::fmt::Result {
    match interval {
        Some(interval) => write!(f, "{}", interval),
        None => Ok(()),
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.expr {
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Variable { variable, .. } => write!(f, "{}", variable),
            Expr::Abs { operand, .. } => write!(f, "abs({})", operand),
            Expr::Arithmetic { op, left, right, .. } => {
                write!(f, "({}){}({})", left, op.token(), right)
            }
            Expr::Predicate { op, left, right, .. } => {
                write!(f, "({}){}({})", left, op.token(), right)
            }
            Expr::Neg(operand) => write!(f, "not({})", operand),
            Expr::Logic { op, left, right } => write!(f, "({}){}({})", left, op.token(), right),
            Expr::Edge { op, operand } => write!(f, "{}({})", op.keyword(), operand),
            Expr::UnaryTemporal { op, interval, operand } => {
                f.write_str(op.keyword())?;
                write_interval(f, interval)?;
                write!(f, "({})", operand)
            }
            Expr::BinaryTemporal { op, interval, left, right } => {
                write!(f, "({}){}", left, op.keyword())?;
                write_interval(f, interval)?;
                write!(f, "({})", right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{ComparisonOp, Node, Operator, Role, Variable};
    use crate::backend::Backend;
    use crate::errors::MalformedNodeError;
    use crate::interval::Interval;

    #[test]
    fn leaf_names() {
        assert_eq!(Node::constant(2.0).name(), "2");
        assert_eq!(Node::constant(2.5).name(), "2.5");
        assert_eq!(Node::variable("req").name(), "req");

        let qualified = Variable::new("myvar.req").with_field("val").with_role(Role::Output);
        assert_eq!(Node::from_variable(qualified).name(), "myvar.req.val");

        let empty_field = Variable::new("req").with_field("");
        assert_eq!(empty_field.field(), None);
    }

    #[test]
    fn operator_names() -> Result<(), MalformedNodeError> {
        let req = || Node::variable("req");
        let gnt = || Node::variable("gnt");

        assert_eq!(Node::abs(req()).name(), "abs(req)");
        assert_eq!(Node::addition(req(), gnt()).name(), "(req)+(gnt)");
        assert_eq!(Node::subtraction(req(), gnt()).name(), "(req)-(gnt)");
        assert_eq!(Node::multiplication(req(), gnt()).name(), "(req)*(gnt)");
        assert_eq!(Node::division(req(), gnt()).name(), "(req)/(gnt)");
        assert_eq!(Node::predicate(ComparisonOp::Neq, req(), gnt()).name(), "(req)!=(gnt)");
        assert_eq!(Node::neg(req()).name(), "not(req)");
        assert_eq!(Node::iff(req(), gnt()).name(), "(req)<->(gnt)");
        assert_eq!(Node::xor(req(), gnt()).name(), "(req)xor(gnt)");
        assert_eq!(Node::fall(req()).name(), "fall(req)");
        assert_eq!(Node::historically(req()).name(), "historically(req)");
        assert_eq!(Node::until(req(), gnt()).name(), "(req)until(gnt)");
        assert_eq!(
            Node::since_bounded(Interval::new(2, 6)?, req(), gnt()).name(),
            "(req)since[2,6](gnt)"
        );
        assert_eq!(
            Node::always_bounded(Interval::unbounded(1), req()).name(),
            "always[1,inf](req)"
        );

        Ok(())
    }

    #[test]
    fn comparison_tokens() {
        for token in ["<", "<=", ">", ">=", "==", "!="] {
            let op: ComparisonOp = token.parse().unwrap();
            assert_eq!(op.token(), token);
        }

        assert_eq!(
            "=<".parse::<ComparisonOp>(),
            Err(MalformedNodeError::UnknownComparison("=<".to_string()))
        );
        assert!("observer".parse::<Role>().is_err());
    }

    #[test]
    fn from_parts_checks_shape() {
        let operands = vec![Node::variable("a"), Node::variable("b")];
        let arity = Node::from_parts(Operator::Abs, operands, None);
        assert_eq!(
            arity,
            Err(MalformedNodeError::Arity {
                operator: "abs",
                expected: 1,
                actual: 2
            })
        );

        let interval = Interval::new(0, 1).ok();
        let unexpected = Node::from_parts(Operator::Neg, vec![Node::variable("a")], interval);
        assert_eq!(unexpected, Err(MalformedNodeError::UnexpectedInterval("not")));
    }

    #[test]
    fn from_parts_matches_constructors() -> Result<(), Box<dyn Error>> {
        let built = Node::from_parts(
            Operator::Predicate(ComparisonOp::Geq),
            vec![Node::variable("x"), Node::constant(3.0)],
            None,
        )?;

        let expected = Node::predicate(ComparisonOp::Geq, Node::variable("x"), Node::constant(3.0));
        assert_eq!(built, expected);
        Ok(())
    }

    #[test]
    fn horizon_excluded_from_equality() {
        let mut left = Node::variable("x");
        left.set_horizon(4);

        assert_eq!(left, Node::variable("x"));
        assert_eq!(left.horizon(), Some(4));

        left.clear_horizon();
        assert_eq!(left.horizon(), None);
    }

    #[test]
    fn traversal() -> Result<(), MalformedNodeError> {
        let formula = Node::implies(
            Node::rise(Node::variable("req")),
            Node::eventually_bounded(Interval::new(0, 2)?, Node::variable("gnt")),
        );

        let names: Vec<String> = formula.nodes().map(Node::name).collect();

        assert_eq!(formula.size(), 5);
        assert_eq!(formula.depth(), 3);
        assert_eq!(names[1], "rise(req)");
        assert_eq!(names[3], "eventually[0,2](gnt)");
        assert!(!formula.is_past_only());
        assert!(formula.children()[1].is_bounded_future());

        Ok(())
    }

    #[test]
    fn reference_backend_by_default() -> Result<(), Box<dyn Error>> {
        let formula = Node::addition(Node::variable("x"), Node::constant(1.0));

        assert_eq!(formula.backend(), Some(Backend::Reference));
        assert_eq!(Node::neg(Node::variable("x")).backend(), None);

        let reattached = formula.clone().with_backend(Backend::Reference)?;
        assert_eq!(reattached, formula);

        Ok(())
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn native_backend_unavailable() {
        let formula = Node::abs(Node::variable("x"));
        assert!(formula.clone().with_backend(Backend::Native).is_err());
        assert!(formula.using_backend(Backend::Native).is_err());
    }

    #[test]
    fn backend_of_single_node() -> Result<(), Box<dyn Error>> {
        let formula = Node::neg(Node::variable("x")).using_backend(Backend::Native)?;

        assert_eq!(formula.backend(), None);
        assert_eq!(formula.children()[0].backend(), Some(Backend::Reference));
        Ok(())
    }

    #[cfg(feature = "native")]
    #[test]
    fn mixed_backends() -> Result<(), Box<dyn Error>> {
        let sum = Node::addition(Node::variable("x"), Node::constant(1.0));
        let sum = sum.using_backend(Backend::Native)?;
        let formula = Node::predicate(ComparisonOp::Geq, sum, Node::variable("y"));

        assert_eq!(formula.backend(), Some(Backend::Reference));
        assert_eq!(formula.children()[0].backend(), Some(Backend::Native));
        assert_eq!(formula.children()[0].children()[0].backend(), Some(Backend::Reference));

        let native = formula.with_backend(Backend::Native)?;
        assert!(native.nodes().all(|node| node.backend() == Some(Backend::Native)));

        Ok(())
    }
}
