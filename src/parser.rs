//! Parsing of textual specifications into [`Node`] trees.
//!
//! The accepted language is a superset of the canonical serialization produced by
//! [`Node::name`]. Parsing the name of a node yields an equal node as long as every constant is
//! finite and every variable whose name contains a dot also has a field. The name `myvar.req` of a
//! field-less variable reads back as the variable `myvar` with field `req`, and non-finite
//! constants print as `inf` or `NaN`, which read back as variables.
//!
//! Whitespace between tokens is ignored and several operators accept aliases:
//!
//! | operator     | syntax                                    |
//! | ------------ | ----------------------------------------- |
//! | iff, xor     | `a <-> b`, `a iff b`, `a xor b`           |
//! | implies      | `a -> b`, `a implies b`                   |
//! | or           | `a or b`, `a \|\| b`                       |
//! | and          | `a and b`, `a && b`                       |
//! | since, until | `a since[0,2] b`, `a until b`             |
//! | precedes     | `a precedes[1,3] b`                       |
//! | not          | `not a`, `!a`                             |
//! | edges        | `rise(a)`, `fall(a)`                      |
//! | temporal     | `once[0,1] a`, `always a`, `eventually[2,inf] a` |
//! | comparison   | `<`, `<=`, `>`, `>=`, `==`, `!=`          |
//! | arithmetic   | `+`, `-`, `*`, `/`, `abs(a)`              |
//!
//! Operators are listed from loosest to tightest binding. `->` associates to the right, every other
//! binary operator associates to the left. A dotted identifier such as `engine.rpm` is a variable
//! named `engine` narrowed to the field `rpm`.
//!
//! # Example
//!
//! ```rust
//! use banquo_online::parser::parse;
//!
//! let formula = parse("always (rise(req >= 3) -> eventually[1,2] always[3,4] gnt >= 3)").unwrap();
//!
//! assert_eq!(
//!     formula.name(),
//!     "always((rise((req)>=(3)))->(eventually[1,2](always[3,4]((gnt)>=(3)))))"
//! );
//! ```

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, satisfy};
use nom::combinator::{cut, map, map_opt, map_res, not, opt, recognize, value, verify};
use nom::error::{ErrorKind, FromExternalError};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::{IResult, Parser};
use thiserror::Error;

use crate::backend::Backend;
use crate::errors::{MalformedNodeError, UnsupportedBackendError};
use crate::interval::{Endpoint, Interval};
use crate::node::{
    ArithmeticOp, BinaryTemporalOp, ComparisonOp, EdgeOp, LogicOp, Node, UnaryTemporalOp, Variable,
};

const RESERVED: [&str; 16] = [
    "not",
    "and",
    "or",
    "xor",
    "implies",
    "iff",
    "abs",
    "rise",
    "fall",
    "once",
    "historically",
    "eventually",
    "always",
    "since",
    "until",
    "precedes",
];

/// Error produced when a text cannot be turned into a specification tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Syntax error at \"{0}\"")]
    Syntax(String),

    #[error("Could not parse remaining input \"{0}\"")]
    Incomplete(String),

    #[error("Malformed formula at \"{position}\": {source}")]
    Malformed {
        position: String,
        source: MalformedNodeError,
    },

    #[error(transparent)]
    UnsupportedBackend(#[from] UnsupportedBackendError),
}

#[derive(Debug, PartialEq)]
enum Failure<'a> {
    Nom(&'a str, ErrorKind),
    Malformed(&'a str, MalformedNodeError),
}

impl<'a> nom::error::ParseError<&'a str> for Failure<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::Nom(input, kind)
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        match self {
            Self::Malformed(..) => self,
            Self::Nom(..) => other,
        }
    }
}

impl<'a> FromExternalError<&'a str, MalformedNodeError> for Failure<'a> {
    fn from_external_error(input: &'a str, _: ErrorKind, err: MalformedNodeError) -> Self {
        Self::Malformed(input, err)
    }
}

impl<'a> From<Failure<'a>> for ParseError {
    fn from(failure: Failure<'a>) -> Self {
        match failure {
            Failure::Nom(position, _) => Self::Syntax(position.to_string()),
            Failure::Malformed(position, source) => Self::Malformed {
                position: position.to_string(),
                source,
            },
        }
    }
}

type PResult<'a, T> = IResult<&'a str, T, Failure<'a>>;

fn ws<'a, O, P>(parser: P) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    P: Parser<&'a str, O, Failure<'a>>,
{
    delimited(multispace0, parser, multispace0)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    ws(terminated(tag(word), not(satisfy(is_identifier_char))))
}

fn symbol<'a>(token: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    ws(tag(token))
}

fn number(input: &str) -> PResult<'_, f64> {
    let literal = recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1)))));
    map_opt(literal, |literal: &str| literal.parse().ok())(input)
}

fn offset(input: &str) -> PResult<'_, usize> {
    map_opt(digit1, |digits: &str| digits.parse().ok())(input)
}

fn endpoint(input: &str) -> PResult<'_, Endpoint> {
    alt((value(Endpoint::Infinite, tag("inf")), map(offset, Endpoint::Finite)))(input)
}

fn bounds(lower: usize, upper: Endpoint) -> Result<Interval, MalformedNodeError> {
    match upper {
        Endpoint::Finite(upper) => Interval::new(lower, upper),
        Endpoint::Infinite => Ok(Interval::unbounded(lower)),
    }
}

fn interval(input: &str) -> PResult<'_, Interval> {
    let inner = separated_pair(ws(offset), char(','), ws(endpoint));
    let checked = map_res(terminated(inner, char(']')), |(lower, upper): (usize, Endpoint)| {
        bounds(lower, upper)
    });

    ws(preceded(char('['), cut(checked)))(input)
}

fn segment(input: &str) -> PResult<'_, &str> {
    let head = alt((alpha1, tag("_")));
    let identifier = recognize(pair(head, many0(alt((alphanumeric1, tag("_"))))));
    verify(identifier, |name: &str| !RESERVED.contains(&name))(input)
}

fn variable(input: &str) -> PResult<'_, Variable> {
    let named = |segments: Vec<&str>| match segments.split_last() {
        Some((field, rest)) if !rest.is_empty() => Variable::new(rest.join(".")).with_field(*field),
        _ => Variable::new(segments.join(".")),
    };

    map(separated_list1(char('.'), segment), named)(input)
}

fn parenthesized(input: &str) -> PResult<'_, Node> {
    delimited(symbol("("), formula, symbol(")"))(input)
}

fn atom(input: &str) -> PResult<'_, Node> {
    alt((
        map(ws(number), Node::constant),
        map(preceded(keyword("abs"), parenthesized), Node::abs),
        parenthesized,
        map(ws(variable), Node::from_variable),
    ))(input)
}

fn multiplicative(input: &str) -> PResult<'_, Node> {
    let op = alt((
        value(ArithmeticOp::Multiplication, symbol("*")),
        value(ArithmeticOp::Division, symbol("/")),
    ));

    let (rest, first) = atom(input)?;
    let (rest, others) = many0(pair(op, atom))(rest)?;
    let node = others
        .into_iter()
        .fold(first, |left, (op, right)| Node::arithmetic(op, left, right));

    Ok((rest, node))
}

fn additive(input: &str) -> PResult<'_, Node> {
    let op = alt((
        value(ArithmeticOp::Addition, symbol("+")),
        value(ArithmeticOp::Subtraction, symbol("-")),
    ));

    let (rest, first) = multiplicative(input)?;
    let (rest, others) = many0(pair(op, multiplicative))(rest)?;
    let node = others
        .into_iter()
        .fold(first, |left, (op, right)| Node::arithmetic(op, left, right));

    Ok((rest, node))
}

fn comparison(input: &str) -> PResult<'_, ComparisonOp> {
    let token = alt((tag("<="), tag(">="), tag("=="), tag("!="), tag("<"), tag(">")));
    map_res(ws(token), |token: &str| token.parse::<ComparisonOp>())(input)
}

fn relational(input: &str) -> PResult<'_, Node> {
    let (rest, left) = additive(input)?;
    let (rest, right) = opt(pair(comparison, additive))(rest)?;
    let node = match right {
        Some((op, right)) => Node::predicate(op, left, right),
        None => left,
    };

    Ok((rest, node))
}

fn negation(input: &str) -> PResult<'_, Node> {
    map(preceded(alt((keyword("not"), symbol("!"))), unary), Node::neg)(input)
}

fn edge(input: &str) -> PResult<'_, Node> {
    let op = alt((value(EdgeOp::Rise, keyword("rise")), value(EdgeOp::Fall, keyword("fall"))));
    let build = |(op, operand): (EdgeOp, Node)| match op {
        EdgeOp::Rise => Node::rise(operand),
        EdgeOp::Fall => Node::fall(operand),
    };

    map(pair(op, unary), build)(input)
}

fn unary_temporal(input: &str) -> PResult<'_, Node> {
    let op = alt((
        value(UnaryTemporalOp::Once, keyword("once")),
        value(UnaryTemporalOp::Historically, keyword("historically")),
        value(UnaryTemporalOp::Eventually, keyword("eventually")),
        value(UnaryTemporalOp::Always, keyword("always")),
    ));

    let build = |(op, interval, operand): (UnaryTemporalOp, Option<Interval>, Node)| {
        Node::unary_temporal(op, interval, operand)
    };

    map(tuple((op, opt(interval), unary)), build)(input)
}

fn unary(input: &str) -> PResult<'_, Node> {
    alt((negation, edge, unary_temporal, relational))(input)
}

fn binary_temporal(input: &str) -> PResult<'_, Node> {
    let op = alt((
        value(BinaryTemporalOp::Since, keyword("since")),
        value(BinaryTemporalOp::Until, keyword("until")),
        value(BinaryTemporalOp::Precedes, keyword("precedes")),
    ));

    let (rest, first) = unary(input)?;
    let (rest, others) = many0(tuple((op, opt(interval), unary)))(rest)?;
    let node = others.into_iter().fold(first, |left, (op, interval, right)| {
        Node::binary_temporal(op, interval, left, right)
    });

    Ok((rest, node))
}

fn conjunction(input: &str) -> PResult<'_, Node> {
    let op = alt((keyword("and"), symbol("&&")));

    let (rest, first) = binary_temporal(input)?;
    let (rest, others) = many0(preceded(op, binary_temporal))(rest)?;

    Ok((rest, others.into_iter().fold(first, Node::conjunction)))
}

fn disjunction(input: &str) -> PResult<'_, Node> {
    let op = alt((keyword("or"), symbol("||")));

    let (rest, first) = conjunction(input)?;
    let (rest, others) = many0(preceded(op, conjunction))(rest)?;

    Ok((rest, others.into_iter().fold(first, Node::disjunction)))
}

fn implication(input: &str) -> PResult<'_, Node> {
    let op = alt((symbol("->"), keyword("implies")));

    let (rest, antecedent) = disjunction(input)?;
    let (rest, consequent) = opt(preceded(op, implication))(rest)?;
    let node = match consequent {
        Some(consequent) => Node::implies(antecedent, consequent),
        None => antecedent,
    };

    Ok((rest, node))
}

fn formula(input: &str) -> PResult<'_, Node> {
    let op = alt((
        value(LogicOp::Iff, symbol("<->")),
        value(LogicOp::Iff, keyword("iff")),
        value(LogicOp::Xor, keyword("xor")),
    ));

    let (rest, first) = implication(input)?;
    let (rest, others) = many0(pair(op, implication))(rest)?;
    let node = others
        .into_iter()
        .fold(first, |left, (op, right)| Node::logic(op, left, right));

    Ok((rest, node))
}

/// Parse a specification using the reference evaluation backend.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    match ws(formula)(input) {
        Ok(("", node)) => Ok(node),
        Ok((rest, _)) => Err(ParseError::Incomplete(rest.to_string())),
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => Err(failure.into()),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::Syntax(input.to_string())),
    }
}

/// Parse a specification and attach the evaluators of `backend` to its nodes.
pub fn parse_with_backend(input: &str, backend: Backend) -> Result<Node, ParseError> {
    let node = parse(input)?;
    Ok(node.with_backend(backend)?)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{parse, ParseError};
    use crate::errors::MalformedNodeError;
    use crate::interval::Interval;
    use crate::node::{ComparisonOp, Node, Variable};

    type TestResult = Result<(), Box<dyn Error>>;

    #[test]
    fn leaves() -> TestResult {
        assert_eq!(parse("2")?, Node::constant(2.0));
        assert_eq!(parse(" -1.5 ")?, Node::constant(-1.5));
        assert_eq!(parse("req")?, Node::variable("req"));
        assert_eq!(
            parse("myvar.req.val")?,
            Node::from_variable(Variable::new("myvar.req").with_field("val"))
        );

        Ok(())
    }

    #[test]
    fn precedence() -> TestResult {
        let formula = parse("a + b * 2 >= 3 and not c -> d or e")?;

        assert_eq!(formula.name(), "((((a)+((b)*(2)))>=(3))and(not(c)))->((d)or(e))");
        assert_eq!(parse("a -> b -> c")?.name(), "(a)->((b)->(c))");
        assert_eq!(parse("a - b - c")?.name(), "((a)-(b))-(c)");
        assert_eq!(parse("a xor b <-> c")?.name(), "((a)xor(b))<->(c)");

        Ok(())
    }

    #[test]
    fn temporal_operators() -> TestResult {
        let formula = parse("always (req until[1, 2] gnt) since historically[0,inf] ack")?;

        assert_eq!(formula.name(), "(always((req)until[1,2](gnt)))since(historically[0,inf](ack))");

        let expected = Node::once_bounded(Interval::new(0, 3)?, Node::fall(Node::variable("x")));
        assert_eq!(parse("once [0,3] fall(x)")?, expected);

        Ok(())
    }

    #[test]
    fn keywords_are_not_identifiers() -> TestResult {
        assert_eq!(parse("nothing and order")?.name(), "(nothing)and(order)");
        assert!(parse("once and x").is_err());

        Ok(())
    }

    #[test]
    fn canonical_names_round_trip() -> TestResult {
        let names = [
            "(once[6,6](req))>=(3)",
            "always((rise((once[6,6](req))>=(3)))->(once[0,1](historically[0,1]((gnt)>=(3)))))",
            "((once[4,4](req))precedes[1,2](once[4,4](gnt)))->(once[0,6](ack))",
            "abs((x)/(-2.5))",
            "(a)!=(b)",
            "(req)until(gnt)",
        ];

        for name in names {
            assert_eq!(parse(name)?.name(), name);
        }

        Ok(())
    }

    #[test]
    fn ambiguous_names() -> TestResult {
        let dotted = Node::variable("myvar.req");
        let expected = Node::from_variable(Variable::new("myvar").with_field("req"));
        assert_eq!(parse(&dotted.name())?, expected);

        let qualified = Node::from_variable(Variable::new("myvar.req").with_field("val"));
        assert_eq!(parse(&qualified.name())?, qualified);

        assert_eq!(parse(&Node::constant(f64::INFINITY).name())?, Node::variable("inf"));

        Ok(())
    }

    #[test]
    fn errors() {
        assert_eq!(parse("a and"), Err(ParseError::Incomplete("and".to_string())));
        assert!(matches!(parse("(a"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse(""), Err(ParseError::Syntax(_))));

        match parse("eventually[3,1] a") {
            Err(ParseError::Malformed { source, .. }) => {
                assert_eq!(source, MalformedNodeError::InvertedInterval { lower: 3, upper: 1 })
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn comparison_operators() -> TestResult {
        for op in ["<", "<=", ">", ">=", "==", "!="] {
            let formula = parse(&format!("x {} 1", op))?;
            let op = op.parse::<ComparisonOp>()?;
            let expected = Node::predicate(op, Node::variable("x"), Node::constant(1.0));

            assert_eq!(formula, expected);
        }

        Ok(())
    }
}
