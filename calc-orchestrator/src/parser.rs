//! Expression parser. Tokenizes an infix arithmetic string and builds an
//! operator tree honoring precedence and left-associativity.

use calc_shared::error::CalcError;
use calc_shared::types::Operation;

/// Internal-vs-leaf is a sum type: a leaf carries a literal, an internal
/// node carries an operator and its two operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(f64),
    BinaryOp(Operation, Box<Node>, Box<Node>),
}

fn is_digit_or_bracket(c: u8) -> bool {
    c.is_ascii_digit() || c == b'.' || c == b'(' || c == b')'
}

/// Strips whitespace and rejects unbalanced parens, leading/trailing
/// operators, two adjacent operators, and an operator not flanked by a
/// digit/`.`/paren on both sides.
fn validate(expr: &str) -> Result<(), CalcError> {
    let bytes = expr.as_bytes();
    if bytes.is_empty() {
        return Err(CalcError::invalid_expression("empty expression"));
    }

    let mut open_brackets = 0i32;
    for (i, &c) in bytes.iter().enumerate() {
        match c {
            b'(' => open_brackets += 1,
            b')' => {
                open_brackets -= 1;
                if open_brackets < 0 {
                    return Err(CalcError::invalid_expression("unbalanced parentheses"));
                }
            }
            b'+' | b'-' | b'*' | b'/' => {
                let at_edge = i == 0 || i == bytes.len() - 1;
                let prev_ok = i > 0 && is_digit_or_bracket(bytes[i - 1]);
                let next_ok = i < bytes.len() - 1 && is_digit_or_bracket(bytes[i + 1]);
                if at_edge || !prev_ok || !next_ok {
                    return Err(CalcError::invalid_expression(
                        "operator in an invalid position",
                    ));
                }
            }
            b'0'..=b'9' | b'.' => {}
            _ => return Err(CalcError::invalid_expression(format!("unexpected character '{}'", c as char))),
        }
    }
    if open_brackets != 0 {
        return Err(CalcError::invalid_expression("unbalanced parentheses"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Op(Operation),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Tok>, CalcError> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            b'+' | b'-' | b'*' | b'/' => {
                tokens.push(Tok::Op(Operation::from_symbol(c as char).unwrap()));
                i += 1;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &expr[start..i];
                let num = text
                    .parse::<f64>()
                    .map_err(|_| CalcError::invalid_expression(format!("bad number '{text}'")))?;
                tokens.push(Tok::Num(num));
            }
            _ => return Err(CalcError::invalid_expression("unexpected character")),
        }
    }
    Ok(tokens)
}

/// Shunting-yard with a value stack of subtrees instead of a value stack
/// of numbers. The `>=` precedence comparison on pop preserves
/// left-associativity: `a-b-c` builds as `(a-b)-c`.
fn build_tree(tokens: &[Tok]) -> Result<Node, CalcError> {
    let mut values: Vec<Node> = Vec::new();
    let mut ops: Vec<Tok> = Vec::new();

    fn apply_top(values: &mut Vec<Node>, op: Operation) -> Result<(), CalcError> {
        let right = values
            .pop()
            .ok_or_else(|| CalcError::invalid_expression("malformed expression"))?;
        let left = values
            .pop()
            .ok_or_else(|| CalcError::invalid_expression("malformed expression"))?;
        values.push(Node::BinaryOp(op, Box::new(left), Box::new(right)));
        Ok(())
    }

    for &tok in tokens {
        match tok {
            Tok::Num(n) => values.push(Node::Literal(n)),
            Tok::LParen => ops.push(tok),
            Tok::RParen => {
                loop {
                    match ops.pop() {
                        Some(Tok::LParen) => break,
                        Some(Tok::Op(op)) => apply_top(&mut values, op)?,
                        _ => return Err(CalcError::invalid_expression("unbalanced parentheses")),
                    }
                }
            }
            Tok::Op(op) => {
                while let Some(Tok::Op(top)) = ops.last() {
                    if top.precedence() >= op.precedence() {
                        let top = *top;
                        ops.pop();
                        apply_top(&mut values, top)?;
                    } else {
                        break;
                    }
                }
                ops.push(Tok::Op(op));
            }
        }
    }

    while let Some(tok) = ops.pop() {
        match tok {
            Tok::Op(op) => apply_top(&mut values, op)?,
            _ => return Err(CalcError::invalid_expression("unbalanced parentheses")),
        }
    }

    if values.len() != 1 {
        return Err(CalcError::invalid_expression("malformed expression"));
    }
    Ok(values.pop().unwrap())
}

/// Evaluates the tree directly, erroring on divide-by-zero. This is the
/// submit-time sanity check the original does before building the task
/// graph; it operates on the literal expression only, not on dynamic
/// intermediate task results.
fn sanity_eval(node: &Node) -> Result<f64, CalcError> {
    match node {
        Node::Literal(n) => Ok(*n),
        Node::BinaryOp(op, left, right) => {
            let l = sanity_eval(left)?;
            let r = sanity_eval(right)?;
            match op {
                Operation::Divide if r == 0.0 => {
                    Err(CalcError::invalid_expression("division by zero"))
                }
                _ => Ok(op.apply(l, r)),
            }
        }
    }
}

/// Parses `expr` into an operator tree, validating shape and running the
/// submit-time sanity evaluation. Whitespace is stripped first.
pub fn parse(expr: &str) -> Result<Node, CalcError> {
    let stripped: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    validate(&stripped)?;
    let tokens = tokenize(&stripped)?;
    let tree = build_tree(&tokens)?;
    if matches!(tree, Node::Literal(_)) {
        return Err(CalcError::invalid_expression(
            "expression must contain at least one operation",
        ));
    }
    sanity_eval(&tree)?;
    Ok(tree)
}
