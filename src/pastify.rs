//! Rewriting of bounded-future formulas into past-only formulas.
//!
//! An online monitor can only observe samples up to the current time, so a formula such as
//! `eventually[0,2](req)` cannot be decided when its evaluation time arrives. However, if the
//! monitor reports the verdict for time `t` only once time `t + h` has been observed, where `h` is
//! the horizon of the formula, every future reference can be replaced with a reference into the
//! past of `t + h`. Pastification performs this rewrite on the AST.
//!
//! The rewrite is top-down and threads a _budget_ through the tree: the number of samples by which
//! the current evaluation frame has been delayed relative to the original formula. The budget of
//! the root is its horizon.
//!
//!   - A variable read in a frame delayed by `n > 0` samples becomes `once[n,n](variable)`.
//!   - `eventually[a,b]` and `always[a,b]` become `once[0,b-a]` and `historically[0,b-a]`, and
//!     their operands are rewritten with a budget reduced by `b`. When `a == b` the window has no
//!     width and the operator is replaced by its rewritten operand.
//!   - `until[a,b]` becomes `precedes[a,b]`, and both operands are rewritten with a budget reduced
//!     by `b`.
//!   - Every other operator, including unbounded future operators, keeps its shape and passes the
//!     budget to its operands unchanged.
//!
//! # Example
//!
//! ```rust
//! use banquo_online::{compute_horizon, pastify, Interval, Node};
//!
//! let mut formula = Node::implies(
//!     Node::eventually_bounded(Interval::new(5, 6).unwrap(), Node::variable("req")),
//!     Node::variable("gnt"),
//! );
//!
//! compute_horizon(&mut formula);
//! let past = pastify(&formula).unwrap();
//!
//! assert_eq!(past.name(), "(once[0,1](req))->(once[6,6](gnt))");
//! assert!(past.is_past_only());
//! ```

use log::{debug, trace};

use crate::errors::{HorizonUndefinedError, MalformedNodeError, PastifyError};
use crate::interval::{Endpoint, Interval};
use crate::node::{BinaryTemporalOp, Expr, Node, UnaryTemporalOp};

fn dual(op: UnaryTemporalOp) -> UnaryTemporalOp {
    match op {
        UnaryTemporalOp::Eventually => UnaryTemporalOp::Once,
        UnaryTemporalOp::Always => UnaryTemporalOp::Historically,
        past => past,
    }
}

fn spend(budget: usize, upper: usize, node: &Node) -> usize {
    if budget < upper {
        trace!("budget {} is smaller than the upper bound of {}, clamping to 0", budget, node);
    }

    budget.saturating_sub(upper)
}

/// Rebuild `node` with its children rewritten under the same budget.
fn rebuild(node: &Node, budget: usize) -> Result<Node, MalformedNodeError> {
    let children = node
        .children()
        .into_iter()
        .map(|child| rewrite(child, budget))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rebuilt = Node::from_parts(node.operator(), children, node.interval())?;
    rebuilt.inherit_evaluator(node);

    Ok(rebuilt)
}

fn rewrite(node: &Node, budget: usize) -> Result<Node, MalformedNodeError> {
    match node.expr() {
        Expr::Variable { .. } if budget > 0 => {
            let variable = rebuild(node, 0)?;
            Ok(Node::once_bounded(Interval::point(budget), variable))
        }

        Expr::UnaryTemporal {
            op,
            interval: Some(interval),
            operand,
        } if op.is_future() => {
            let upper = match interval.upper() {
                Endpoint::Finite(upper) => upper,
                Endpoint::Infinite => return rebuild(node, budget),
            };

            let operand = rewrite(operand, spend(budget, upper, node))?;
            let width = upper - interval.lower();

            if width == 0 {
                trace!("eliding zero-width {}", node);
                return Ok(operand);
            }

            Ok(Node::unary_temporal(dual(*op), Some(Interval::new(0, width)?), operand))
        }

        Expr::BinaryTemporal {
            op: BinaryTemporalOp::Until,
            interval: Some(interval),
            left,
            right,
        } => {
            let upper = match interval.upper() {
                Endpoint::Finite(upper) => upper,
                Endpoint::Infinite => return rebuild(node, budget),
            };

            let remaining = spend(budget, upper, node);
            let left = rewrite(left, remaining)?;
            let right = rewrite(right, remaining)?;

            Ok(Node::precedes_bounded(*interval, left, right))
        }

        _ => rebuild(node, budget),
    }
}

/// Rewrite the tree rooted at `root` into an equivalent tree without bounded future operators.
///
/// The horizon of `root` must already be set, either by
/// [`compute_horizon`](crate::compute_horizon) or with [`Node::set_horizon`]. The horizons of the
/// descendants are not consulted. The input tree is left untouched, and the nodes of the returned
/// tree have no horizon.
///
/// # Errors
///
/// Returns [`PastifyError::HorizonUndefined`] without rewriting anything if `root` has no horizon.
pub fn pastify(root: &Node) -> Result<Node, PastifyError> {
    let horizon = root
        .horizon()
        .ok_or_else(|| HorizonUndefinedError::new(root.name()))?;

    pastify_with_horizon(root, horizon)
}

/// Rewrite the tree rooted at `root` using `horizon` as the initial budget.
///
/// The stored horizon of `root` is ignored, which allows pastifying the same tree under several
/// horizons without mutating it.
///
/// ```rust
/// use banquo_online::{pastify_with_horizon, Node};
///
/// let formula = Node::variable("req");
///
/// assert_eq!(pastify_with_horizon(&formula, 0).unwrap().name(), "req");
/// assert_eq!(pastify_with_horizon(&formula, 5).unwrap().name(), "once[5,5](req)");
/// ```
pub fn pastify_with_horizon(root: &Node, horizon: usize) -> Result<Node, PastifyError> {
    debug!("pastifying {} with horizon {}", root, horizon);

    let pastified = rewrite(root, horizon)?;
    debug!("pastified formula {}", pastified);

    Ok(pastified)
}
