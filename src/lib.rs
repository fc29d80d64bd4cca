#![deny(clippy::all)]

//! Specification front end for online Signal Temporal Logic monitors.
//!
//! Formulas are represented as trees of [`Node`] values. Before a formula that refers to future
//! samples can be monitored online it goes through two passes:
//!
//!   1. [`compute_horizon`] annotates every node with the number of future samples it needs;
//!   2. [`pastify`] rewrites the formula into an equivalent one that only refers to the past, to be
//!      evaluated with a delay equal to the horizon of the root.
//!
//! ```rust
//! use banquo_online::{compute_horizon, pastify, Interval, Node};
//!
//! let mut formula = Node::always(Node::implies(
//!     Node::variable("req"),
//!     Node::eventually_bounded(Interval::new(0, 3).unwrap(), Node::variable("gnt")),
//! ));
//!
//! assert_eq!(compute_horizon(&mut formula), None);
//!
//! formula.set_horizon(3);
//! let past = pastify(&formula).unwrap();
//!
//! assert_eq!(past.name(), "always((once[3,3](req))->(once[0,3](gnt)))");
//! ```

pub mod backend;
pub mod errors;
pub mod horizon;
pub mod interval;
pub mod node;
#[cfg(feature = "parser")]
pub mod parser;
pub mod pastify;

pub use crate::backend::{Backend, Evaluator, Operation};
pub use crate::errors::{
    HorizonUndefinedError, MalformedNodeError, PastifyError, UnsupportedBackendError,
};
pub use crate::horizon::compute_horizon;
pub use crate::interval::{Endpoint, Interval};
pub use crate::node::{
    ArithmeticOp, BinaryTemporalOp, ComparisonOp, EdgeOp, Expr, LogicOp, Node, Operator, Role,
    UnaryTemporalOp, Variable,
};
#[cfg(feature = "parser")]
pub use crate::parser::{parse, parse_with_backend, ParseError};
pub use crate::pastify::{pastify, pastify_with_horizon};
