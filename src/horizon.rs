//! Horizon computation.
//!
//! The horizon of a node is the minimum number of samples beyond the current index that are
//! required to decide the value of the node. Leaves need no future samples, instantaneous and past
//! temporal operators need as many as their most demanding child, and a bounded future operator
//! `[a,b]` needs `b` more samples than its children. Unbounded future operators need an unknown
//! amount of future samples, so their horizon (and the horizon of every ancestor) is left
//! undefined by this pass. For such trees the caller is expected to inject a specification-level
//! horizon with [`Node::set_horizon`]. A horizon that does not fit in a `usize` is treated the
//! same way.

use log::{debug, trace};

use crate::interval::Interval;
use crate::node::{Expr, Node};

fn max_horizon<I>(children: I) -> Option<usize>
where
    I: IntoIterator<Item = Option<usize>>,
{
    children
        .into_iter()
        .try_fold(0, |acc, horizon| horizon.map(|horizon| acc.max(horizon)))
}

/// Horizon of a future operator; undefined for unbounded windows and when the sum overflows.
fn future_horizon(interval: &Option<Interval>, children: Option<usize>) -> Option<usize> {
    let upper = interval.as_ref().and_then(|interval| interval.upper().value())?;
    upper.checked_add(children?)
}

fn annotate(node: &mut Node) -> Option<usize> {
    let children: Vec<Option<usize>> = node.children_mut().into_iter().map(annotate).collect();
    let children = max_horizon(children);

    let horizon = match node.expr() {
        Expr::Constant { .. } | Expr::Variable { .. } => Some(0),
        Expr::UnaryTemporal { op, interval, .. } if op.is_future() => {
            future_horizon(interval, children)
        }
        Expr::BinaryTemporal { op, interval, .. } if op.is_future() => {
            future_horizon(interval, children)
        }
        _ => children,
    };

    if horizon.is_none() {
        trace!("horizon undefined for {}", node);
    }

    node.store_horizon(horizon);
    horizon
}

/// Annotate every node of the tree rooted at `root` with its horizon.
///
/// Children are annotated before their parents. Previously stored horizons, including ones
/// injected with [`Node::set_horizon`], are overwritten. The horizon of the root is returned, or
/// `None` if the tree contains an unbounded future operator above which no horizon can be
/// derived.
///
/// # Example
///
/// ```rust
/// use banquo_online::{compute_horizon, Interval, Node};
///
/// let mut formula = Node::eventually_bounded(
///     Interval::new(1, 2).unwrap(),
///     Node::always_bounded(Interval::new(3, 4).unwrap(), Node::variable("gnt")),
/// );
///
/// assert_eq!(compute_horizon(&mut formula), Some(6));
/// assert_eq!(formula.children()[0].horizon(), Some(4));
/// ```
pub fn compute_horizon(root: &mut Node) -> Option<usize> {
    let horizon = annotate(root);

    match horizon {
        Some(horizon) => debug!("computed horizon {} for {}", horizon, root),
        None => debug!("horizon of {} depends on an unbounded future operator", root),
    }

    horizon
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::compute_horizon;
    use crate::interval::Interval;
    use crate::node::{ComparisonOp, Node};

    fn req() -> Node {
        Node::variable("req")
    }

    fn gnt() -> Node {
        Node::variable("gnt")
    }

    #[test]
    fn leaves() {
        let mut constant = Node::constant(1.0);
        let mut variable = req();

        assert_eq!(compute_horizon(&mut constant), Some(0));
        assert_eq!(compute_horizon(&mut variable), Some(0));
        assert_eq!(variable.horizon(), Some(0));
    }

    #[test]
    fn past_operators_do_not_add() -> Result<(), Box<dyn Error>> {
        let mut formula = Node::since_bounded(
            Interval::new(2, 6)?,
            Node::rise(req()),
            Node::once_bounded(Interval::new(1, 2)?, Node::historically(gnt())),
        );

        assert_eq!(compute_horizon(&mut formula), Some(0));
        Ok(())
    }

    #[test]
    fn bounded_future_adds_upper_bound() -> Result<(), Box<dyn Error>> {
        let mut formula = Node::implies(
            Node::until_bounded(Interval::new(1, 2)?, req(), gnt()),
            Node::eventually_bounded(Interval::new(0, 6)?, Node::variable("ack")),
        );

        assert_eq!(compute_horizon(&mut formula), Some(6));

        let children = formula.children();
        assert_eq!(children[0].horizon(), Some(2));
        assert_eq!(children[1].horizon(), Some(6));

        Ok(())
    }

    #[test]
    fn nested_future_accumulates() -> Result<(), Box<dyn Error>> {
        let predicate = Node::predicate(ComparisonOp::Geq, gnt(), Node::constant(3.0));
        let inner = Node::always_bounded(Interval::new(3, 4)?, predicate);
        let mut formula = Node::abs(Node::eventually_bounded(Interval::new(1, 2)?, inner));

        assert_eq!(compute_horizon(&mut formula), Some(6));
        Ok(())
    }

    #[test]
    fn unbounded_future_is_undefined() -> Result<(), Box<dyn Error>> {
        let bounded = Node::eventually_bounded(Interval::new(0, 3)?, req());
        let mut formula = Node::conjunction(Node::always(bounded), gnt());

        assert_eq!(compute_horizon(&mut formula), None);

        let children = formula.children();
        assert_eq!(children[0].horizon(), None);
        assert_eq!(children[0].children()[0].horizon(), Some(3));
        assert_eq!(children[1].horizon(), Some(0));

        let mut infinite = Node::eventually_bounded(Interval::unbounded(2), req());
        assert_eq!(compute_horizon(&mut infinite), None);

        Ok(())
    }

    #[test]
    fn overflowing_horizon_is_undefined() -> Result<(), Box<dyn Error>> {
        let inner = Node::eventually_bounded(Interval::new(0, 1)?, req());
        let mut formula = Node::eventually_bounded(Interval::new(0, usize::MAX)?, inner);

        assert_eq!(compute_horizon(&mut formula), None);
        assert_eq!(formula.children()[0].horizon(), Some(1));

        let mut largest = Node::eventually_bounded(Interval::new(0, usize::MAX)?, req());
        assert_eq!(compute_horizon(&mut largest), Some(usize::MAX));

        Ok(())
    }

    #[test]
    fn override_only_touches_node() -> Result<(), Box<dyn Error>> {
        let mut formula = Node::always(Node::eventually_bounded(Interval::new(0, 1)?, req()));
        formula.set_horizon(6);

        assert_eq!(formula.horizon(), Some(6));
        assert_eq!(formula.children()[0].horizon(), None);

        compute_horizon(&mut formula);
        assert_eq!(formula.horizon(), None);
        assert_eq!(formula.children()[0].horizon(), Some(1));

        Ok(())
    }
}
