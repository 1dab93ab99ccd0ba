//! Expression parser.
//!
//! Two phases over the token stream. A bracket pass tracks every `(` with
//! an optional `,` on a stack: closing a bracket builds the interior
//! sub-expression(s) and either feeds them to the function token that
//! preceded the `(` or splices the group back in as a plain operand.
//! Flat ranges are then assembled by a shunting-yard walk over two stacks,
//! with an implicit `*` between adjacent operands and a synthesized `0` in
//! front of a leading `-`.
//!
//! `-` and `/` pop the operator stack at equal precedence (left
//! association); `+`, `*` and `^` pop only on strictly greater precedence.

use deriv_ast::{BuiltinFn, Context, Expr, ExprId};

use crate::error::ParseError;
use crate::token::{tokenize, Token};

/// Parse one input line into an expression tree.
pub fn parse(input: &str, ctx: &mut Context) -> Result<ExprId, ParseError> {
    let tokens = tokenize(input, ctx);
    parse_tokens(ctx, &tokens)
}

/// A resolved element of a flat expression range.
#[derive(Debug, Clone, Copy)]
enum Item {
    Operand(ExprId),
    Op(char),
    /// A function name not (yet) followed by its argument list.
    Func(BuiltinFn),
}

/// One open `(` with its owner and optional argument separator.
#[derive(Debug)]
struct Frame {
    func: Option<BuiltinFn>,
    items: Vec<Item>,
    comma: Option<usize>,
}

impl Frame {
    fn new(func: Option<BuiltinFn>) -> Self {
        Self {
            func,
            items: Vec::new(),
            comma: None,
        }
    }
}

/// Build a tree from an already-lexed token stream.
pub fn parse_tokens(ctx: &mut Context, tokens: &[Token]) -> Result<ExprId, ParseError> {
    let mut stack: Vec<Frame> = vec![Frame::new(None)];

    for &tok in tokens {
        match tok {
            Token::Int(v) => {
                let id = ctx.num(v);
                stack.last_mut().unwrap().items.push(Item::Operand(id));
            }
            Token::Var(sym) => {
                let id = ctx.add(Expr::Variable(sym));
                stack.last_mut().unwrap().items.push(Item::Operand(id));
            }
            Token::Func(f) => {
                stack.last_mut().unwrap().items.push(Item::Func(f));
            }
            Token::Op('(') => {
                let top = stack.last_mut().unwrap();
                let func = match top.items.last() {
                    Some(Item::Func(f)) => {
                        let f = *f;
                        top.items.pop();
                        Some(f)
                    }
                    _ => None,
                };
                stack.push(Frame::new(func));
            }
            Token::Op(',') => {
                if stack.len() == 1 {
                    return Err(ParseError::CommaOutsideBrackets);
                }
                let top = stack.last_mut().unwrap();
                if top.comma.is_some() {
                    return Err(ParseError::TooManyArguments);
                }
                top.comma = Some(top.items.len());
            }
            Token::Op(')') => {
                if stack.len() == 1 {
                    return Err(ParseError::UnmatchedBracket);
                }
                let frame = stack.pop().unwrap();
                let operand = match frame.comma {
                    Some(split) => {
                        let Some(f) = frame.func else {
                            return Err(ParseError::CommaWithoutFunction);
                        };
                        let first = build_range(ctx, &frame.items[..split])?;
                        let second = build_range(ctx, &frame.items[split..])?;
                        ctx.call(f, vec![first, second])
                    }
                    None => {
                        let inner = build_range(ctx, &frame.items)?;
                        match frame.func {
                            Some(f) => ctx.call(f, vec![inner]),
                            None => inner,
                        }
                    }
                };
                stack.last_mut().unwrap().items.push(Item::Operand(operand));
            }
            Token::Op(c) => {
                stack.last_mut().unwrap().items.push(Item::Op(c));
            }
        }
    }

    if stack.len() != 1 {
        return Err(ParseError::UnclosedBracket);
    }
    let root = build_range(ctx, &stack.pop().unwrap().items)?;
    check_arity(ctx, root)?;
    Ok(root)
}

#[inline]
fn level(c: char) -> u8 {
    match c {
        '+' | '-' => 1,
        '*' | '/' => 2,
        _ => 3,
    }
}

/// Should the operator on top of the stack be merged before `cur` pushes?
#[inline]
fn trigger_merge(top: char, cur: u8) -> bool {
    if top == '-' || top == '/' {
        level(top) >= cur
    } else {
        level(top) > cur
    }
}

fn merge_top(
    ctx: &mut Context,
    ops: &mut Vec<char>,
    operands: &mut Vec<ExprId>,
    cur: u8,
) -> Result<(), ParseError> {
    while let Some(&top) = ops.last() {
        if !trigger_merge(top, cur) {
            break;
        }
        let r = operands.pop().ok_or(ParseError::MissingOperand)?;
        let l = operands.pop().ok_or(ParseError::MissingOperand)?;
        let node = match top {
            '+' => Expr::Add(l, r),
            '-' => Expr::Sub(l, r),
            '*' => Expr::Mul(l, r),
            '/' => Expr::Div(l, r),
            _ => Expr::Pow(l, r),
        };
        let id = ctx.add(node);
        operands.push(id);
        ops.pop();
    }
    Ok(())
}

/// Shunting-yard assembly of a flat, bracket-free range.
fn build_range(ctx: &mut Context, items: &[Item]) -> Result<ExprId, ParseError> {
    if items.is_empty() {
        return Ok(ctx.num(0));
    }

    let mut operands: Vec<ExprId> = Vec::new();
    let mut ops: Vec<char> = Vec::new();
    let mut last_was_operand = false;

    // Leading '-' becomes a binary subtraction from zero.
    if matches!(items[0], Item::Op('-')) {
        let zero = ctx.num(0);
        operands.push(zero);
        last_was_operand = true;
    }

    for &item in items {
        match item {
            Item::Op(c) => {
                merge_top(ctx, &mut ops, &mut operands, level(c))?;
                ops.push(c);
                last_was_operand = false;
            }
            Item::Operand(id) => {
                if last_was_operand {
                    merge_top(ctx, &mut ops, &mut operands, 2)?;
                    ops.push('*');
                }
                operands.push(id);
                last_was_operand = true;
            }
            Item::Func(f) => {
                // A function name with no argument list parses as an empty
                // application; the arity check rejects it afterwards.
                if last_was_operand {
                    merge_top(ctx, &mut ops, &mut operands, 2)?;
                    ops.push('*');
                }
                let id = ctx.call(f, Vec::new());
                operands.push(id);
                last_was_operand = true;
            }
        }
    }
    merge_top(ctx, &mut ops, &mut operands, 0)?;

    match (operands.pop(), operands.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => Err(ParseError::MissingOperand),
    }
}

/// Ensure every function application carries exactly its declared arity.
fn check_arity(ctx: &Context, id: ExprId) -> Result<(), ParseError> {
    match ctx.get(id) {
        Expr::Integer(_) | Expr::Variable(_) => Ok(()),
        Expr::Add(l, r)
        | Expr::Sub(l, r)
        | Expr::Mul(l, r)
        | Expr::Div(l, r)
        | Expr::Pow(l, r) => {
            check_arity(ctx, *l)?;
            check_arity(ctx, *r)
        }
        Expr::Function(f, args) => {
            if args.len() != f.arity() {
                return Err(ParseError::WrongArity {
                    name: f.name(),
                    expected: f.arity(),
                    found: args.len(),
                });
            }
            for &arg in args {
                check_arity(ctx, arg)?;
            }
            Ok(())
        }
    }
}
