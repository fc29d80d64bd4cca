#![cfg(feature = "parser")]

use std::error::Error;

use approx::assert_relative_eq;
use banquo_online::backend::Operation;
use banquo_online::{compute_horizon, parse, parse_with_backend, pastify, Backend, Expr, ParseError};

type TestResult = Result<(), Box<dyn Error>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn parse_then_pastify() -> TestResult {
    init_logging();

    let cases = [
        (
            "always (rise(req >= 3) -> eventually[1,2] always[3,4] gnt >= 3)",
            None,
            6,
            "always((rise((once[6,6](req))>=(3)))->(once[0,1](historically[0,1]((gnt)>=(3)))))",
        ),
        (
            "req until[1,2] gnt -> eventually[0,6] ack",
            Some(6),
            6,
            "((once[4,4](req))precedes[1,2](once[4,4](gnt)))->(once[0,6](ack))",
        ),
        (
            "eventually[5,6] req -> eventually[3,3] once[1,2] gnt",
            Some(6),
            6,
            "(once[0,1](req))->(once[1,2](once[3,3](gnt)))",
        ),
    ];

    for (text, computed, horizon, expected) in cases {
        let mut formula = parse(text)?;

        assert_eq!(compute_horizon(&mut formula), computed, "{}", text);
        formula.set_horizon(horizon);

        let past = pastify(&formula)?;
        assert_eq!(past.name(), expected);
        assert_eq!(parse(&past.name())?, past);
    }

    Ok(())
}

#[test]
fn names_reparse_to_equal_trees() -> TestResult {
    init_logging();

    let texts = [
        "engine.rpm * 2 / (1 + abs(offset)) > 3000",
        "not (a < 1 || b == 2) xor fall(c != 0)",
        "historically[0,inf] (x <= 1) since[1,4] y > 2",
        "a && b iff c precedes d",
    ];

    for text in texts {
        let formula = parse(text)?;
        assert_eq!(parse(&formula.name())?, formula, "{}", text);
    }

    Ok(())
}

#[test]
fn backend_is_attached_to_value_nodes() -> TestResult {
    init_logging();

    let formula = parse_with_backend("once[0,2] (speed - 2.5 >= limit)", Backend::Reference)?;
    let predicate = formula.children()[0];

    match predicate.expr() {
        Expr::Predicate { evaluator, .. } => {
            assert_relative_eq!(evaluator.update(&[4.0, 1.2])?, 2.8, epsilon = 1.0e-9);
        }
        other => panic!("unexpected node {:?}", other),
    }

    assert!(formula
        .nodes()
        .filter(|node| node.evaluator().is_some())
        .all(|node| node.backend() == Some(Backend::Reference)));

    Ok(())
}

#[cfg(not(feature = "native"))]
#[test]
fn unavailable_backend_is_reported() {
    init_logging();

    let result = parse_with_backend("x > 1", Backend::Native);
    assert!(matches!(result, Err(ParseError::UnsupportedBackend(_))));
}

#[test]
fn largest_bounds_leave_horizon_undefined() -> TestResult {
    init_logging();

    let mut formula = parse(&format!("eventually[0,{}] eventually[0,1] x", usize::MAX))?;

    assert_eq!(compute_horizon(&mut formula), None);
    assert_eq!(formula.children()[0].horizon(), Some(1));

    Ok(())
}
