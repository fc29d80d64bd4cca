//! Evaluation backends for leaf, arithmetic and relational nodes.
//!
//! Every [`Node`](crate::Node) that produces a numeric value at a single instant (constants,
//! variables, arithmetic operators and predicates) owns an [`Evaluator`]. The evaluator is the
//! strategy object a downstream monitor calls to turn the values of the node's operands into the
//! node's own value. Two implementations of the [`Operation`] capability exist:
//!
//!   - [`ReferenceOperation`], a direct sample-by-sample implementation that is always available;
//!   - [`NativeOperation`], a batch implementation that resolves the operation to a kernel once
//!     per batch instead of once per sample. It is only available when the crate is compiled with
//!     the `native` feature.
//!
//! The backend is chosen with a [`Backend`] flag when the evaluator is created. Requesting an
//! unavailable backend fails immediately with an
//! [`UnsupportedBackendError`](crate::errors::UnsupportedBackendError).
//!
//! # Quantitative semantics
//!
//! Predicates produce a robustness degree, a value which is non-negative when the comparison holds:
//!
//! | comparison | robustness  |
//! | ---------- | ----------- |
//! | `a < b`    | `b - a`     |
//! | `a <= b`   | `b - a`     |
//! | `a > b`    | `a - b`     |
//! | `a >= b`   | `a - b`     |
//! | `a == b`   | `-\|a - b\|` |
//! | `a != b`   | `\|a - b\|`  |
//!
//! # Example
//!
//! ```rust
//! use banquo_online::backend::{Backend, Evaluator, Operation, OperationKind};
//! use banquo_online::ComparisonOp;
//!
//! let kind = OperationKind::Predicate(ComparisonOp::Leq);
//! let evaluator = Evaluator::select(Backend::Reference, kind).unwrap();
//! let robustness = evaluator.update(&[1.0, 3.5]).unwrap();
//!
//! assert_eq!(robustness, 2.5);
//! ```

use std::fmt::{Display, Formatter};

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::errors::UnsupportedBackendError;
use crate::node::ComparisonOp;

/// Selection flag for the evaluation backend attached to a node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Portable implementation, always available.
    #[default]
    Reference,

    /// Batch implementation, available with the `native` feature.
    Native,
}

impl Backend {
    /// Whether this backend was compiled into the crate.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Reference => true,
            Self::Native => cfg!(feature = "native"),
        }
    }
}

/// The instantaneous computation performed by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Constant(OrderedFloat<f64>),
    Variable,
    Abs,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Predicate(ComparisonOp),
}

impl OperationKind {
    /// Number of input values consumed by the operation for each sample.
    pub fn arity(&self) -> usize {
        match self {
            Self::Constant(_) => 0,
            Self::Variable | Self::Abs => 1,
            Self::Addition | Self::Subtraction | Self::Multiplication | Self::Division => 2,
            Self::Predicate(_) => 2,
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "constant {}", value),
            Self::Variable => write!(f, "variable"),
            Self::Abs => write!(f, "abs"),
            Self::Addition => write!(f, "addition"),
            Self::Subtraction => write!(f, "subtraction"),
            Self::Multiplication => write!(f, "multiplication"),
            Self::Division => write!(f, "division"),
            Self::Predicate(op) => write!(f, "predicate {}", op),
        }
    }
}

/// Error produced when an operation receives the wrong number of inputs for a sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation {kind} expects {expected} input(s), got {actual}")]
pub struct OperationError {
    kind: OperationKind,
    expected: usize,
    actual: usize,
}

fn check_arity(kind: OperationKind, inputs: &[f64]) -> Result<(), OperationError> {
    if inputs.len() == kind.arity() {
        Ok(())
    } else {
        Err(OperationError {
            kind,
            expected: kind.arity(),
            actual: inputs.len(),
        })
    }
}

fn robustness(op: ComparisonOp, left: f64, right: f64) -> f64 {
    match op {
        ComparisonOp::Less | ComparisonOp::Leq => right - left,
        ComparisonOp::Greater | ComparisonOp::Geq => left - right,
        ComparisonOp::Equal => -(left - right).abs(),
        ComparisonOp::Neq => (left - right).abs(),
    }
}

/// Capability shared by every evaluation backend.
pub trait Operation {
    /// The computation this operation performs.
    fn kind(&self) -> OperationKind;

    /// Compute the value of the operation for a single sample.
    ///
    /// The `inputs` slice contains the values of the node's operands at the current sample, in
    /// operand order. Variables receive the signal value as their only input.
    fn update(&self, inputs: &[f64]) -> Result<f64, OperationError>;

    /// Compute the value of the operation for a sequence of samples.
    ///
    /// Each element of `samples` holds the operand values for one sample.
    fn update_samples(&self, samples: &[&[f64]]) -> Result<Vec<f64>, OperationError> {
        samples.iter().map(|inputs| self.update(inputs)).collect()
    }
}

/// Portable sample-by-sample implementation of an [`OperationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceOperation {
    kind: OperationKind,
}

impl ReferenceOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self { kind }
    }
}

impl Operation for ReferenceOperation {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn update(&self, inputs: &[f64]) -> Result<f64, OperationError> {
        check_arity(self.kind, inputs)?;

        let value = match self.kind {
            OperationKind::Constant(value) => value.into_inner(),
            OperationKind::Variable => inputs[0],
            OperationKind::Abs => inputs[0].abs(),
            OperationKind::Addition => inputs[0] + inputs[1],
            OperationKind::Subtraction => inputs[0] - inputs[1],
            OperationKind::Multiplication => inputs[0] * inputs[1],
            OperationKind::Division => inputs[0] / inputs[1],
            OperationKind::Predicate(op) => robustness(op, inputs[0], inputs[1]),
        };

        Ok(value)
    }
}

/// Batch implementation of an [`OperationKind`].
///
/// The operation is resolved to a single kernel once per batch, and the whole batch is checked for
/// arity before any value is computed. The kernels compute the same values as
/// [`ReferenceOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeOperation {
    kind: OperationKind,
}

type Kernel = Box<dyn Fn(&[f64]) -> f64>;

impl NativeOperation {
    pub fn new(kind: OperationKind) -> Result<Self, UnsupportedBackendError> {
        if Backend::Native.is_available() {
            Ok(Self { kind })
        } else {
            Err(UnsupportedBackendError::new(Backend::Native, kind))
        }
    }

    fn kernel(&self) -> Kernel {
        match self.kind {
            OperationKind::Constant(value) => Box::new(move |_: &[f64]| value.into_inner()),
            OperationKind::Variable => Box::new(|x: &[f64]| x[0]),
            OperationKind::Abs => Box::new(|x: &[f64]| x[0].abs()),
            OperationKind::Addition => Box::new(|x: &[f64]| x[0] + x[1]),
            OperationKind::Subtraction => Box::new(|x: &[f64]| x[0] - x[1]),
            OperationKind::Multiplication => Box::new(|x: &[f64]| x[0] * x[1]),
            OperationKind::Division => Box::new(|x: &[f64]| x[0] / x[1]),
            OperationKind::Predicate(op) => Box::new(move |x: &[f64]| robustness(op, x[0], x[1])),
        }
    }
}

impl Operation for NativeOperation {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn update(&self, inputs: &[f64]) -> Result<f64, OperationError> {
        check_arity(self.kind, inputs)?;
        Ok((self.kernel())(inputs))
    }

    fn update_samples(&self, samples: &[&[f64]]) -> Result<Vec<f64>, OperationError> {
        for inputs in samples {
            check_arity(self.kind, inputs)?;
        }

        let kernel = self.kernel();
        Ok(samples.iter().map(|inputs| kernel(*inputs)).collect())
    }
}

/// Evaluation object owned by a node, produced by one of the two backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evaluator {
    Reference(ReferenceOperation),
    Native(NativeOperation),
}

impl Evaluator {
    /// Construct the evaluation object for `kind` using the requested backend.
    pub fn select(backend: Backend, kind: OperationKind) -> Result<Self, UnsupportedBackendError> {
        match backend {
            Backend::Reference => Ok(Self::Reference(ReferenceOperation::new(kind))),
            Backend::Native => NativeOperation::new(kind).map(Self::Native),
        }
    }

    pub(crate) fn reference(kind: OperationKind) -> Self {
        Self::Reference(ReferenceOperation::new(kind))
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Reference(_) => Backend::Reference,
            Self::Native(_) => Backend::Native,
        }
    }
}

impl Operation for Evaluator {
    fn kind(&self) -> OperationKind {
        match self {
            Self::Reference(op) => op.kind(),
            Self::Native(op) => op.kind(),
        }
    }

    fn update(&self, inputs: &[f64]) -> Result<f64, OperationError> {
        match self {
            Self::Reference(op) => op.update(inputs),
            Self::Native(op) => op.update(inputs),
        }
    }

    fn update_samples(&self, samples: &[&[f64]]) -> Result<Vec<f64>, OperationError> {
        match self {
            Self::Reference(op) => op.update_samples(samples),
            Self::Native(op) => op.update_samples(samples),
        }
    }
}
