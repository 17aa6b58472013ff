use winnow::ascii::till_line_ending;
use winnow::combinator::{alt, cut_err, opt, peek, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::types::{invoke, CircuitNode, Operator};

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.'
        }),
    )
        .take()
        .parse_next(input)
}

// -- Nodes ------------------------------------------------------------------

fn node(input: &mut &str) -> ModalResult<CircuitNode> {
    ws.parse_next(input)?;
    alt((reference, word_form))
        .context(StrContext::Expected(StrContextValue::Description(
            "circuit node",
        )))
        .parse_next(input)
}

fn reference(input: &mut &str) -> ModalResult<CircuitNode> {
    '@'.parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "capability name",
        )))
        .parse_next(input)?;
    Ok(CircuitNode::Reference(name.to_owned()))
}

/// A bare word is either a boolean literal or an operator invocation;
/// operator names are case-insensitive.
fn word_form(input: &mut &str) -> ModalResult<CircuitNode> {
    let name = ident.parse_next(input)?;
    ws.parse_next(input)?;

    if opt(peek('(')).parse_next(input)?.is_some() {
        let Some(operator) = Operator::from_name(&name.to_ascii_uppercase()) else {
            return Err(ErrMode::from_input(input).cut());
        };
        let operands = operand_list(input)?;
        return Ok(invoke(operator, operands));
    }

    match name {
        "true" => Ok(CircuitNode::Literal(true)),
        "false" => Ok(CircuitNode::Literal(false)),
        _ => Err(ErrMode::from_input(input)),
    }
}

fn operand_list(input: &mut &str) -> ModalResult<Vec<CircuitNode>> {
    '('.parse_next(input)?;
    let operands: Vec<CircuitNode> = separated(0.., node, (ws, ',')).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(')')
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    Ok(operands)
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_circuit(input: &mut &str) -> ModalResult<CircuitNode> {
    let circuit = node.parse_next(input)?;
    ws.parse_next(input)?;
    Ok(circuit)
}
