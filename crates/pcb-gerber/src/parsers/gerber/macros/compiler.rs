//! Aperture-macro compiler: macro source text to stack-machine instructions.
//!
//! The source is split into `*`-terminated blocks. A block is either a
//! primitive (`code,expr,expr,…`) or a variable assignment (`$n=expr`).
//! Expressions are converted to postfix with the shunting-yard algorithm, so
//! `1,1,$1x2,0,0` compiles to
//! `Push 1, Load 1, Push 2, Mul, Push 0, Push 0, Prim 1`.

use serde::Serialize;

use crate::error::GerberError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "arg", rename_all = "lowercase")]
pub enum Instruction {
    Push(f64),
    Load(u32),
    Store(u32),
    Add,
    Sub,
    Mul,
    Div,
    /// Emit a primitive descriptor from everything on the stack.
    Prim(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ExprToken {
    Num(f64),
    Var(u32),
    Plus,
    Minus,
    Mul,
    Div,
    LParen,
    RParen,
}

/// Entries of the shunting-yard operator stack.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    LParen,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
            Op::Neg => 3,
            Op::LParen => 0,
        }
    }

    fn emit(self, out: &mut Vec<Instruction>) {
        match self {
            Op::Add => out.push(Instruction::Add),
            Op::Sub => out.push(Instruction::Sub),
            Op::Mul => out.push(Instruction::Mul),
            Op::Div => out.push(Instruction::Div),
            Op::Neg => out.extend([Instruction::Push(-1.0), Instruction::Mul]),
            Op::LParen => {}
        }
    }
}

/// Compile macro source into a flat instruction list.
pub fn compile(source: &str) -> Result<Vec<Instruction>, GerberError> {
    let mut out = Vec::new();
    for raw in source.split('*') {
        if is_comment(raw.trim_start()) {
            continue;
        }
        let block: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if block.is_empty() {
            continue;
        }
        if let Some(assignment) = block.strip_prefix('$') {
            let (var, expr) = assignment.split_once('=').ok_or_else(|| {
                GerberError::Syntax(format!("AM: expected '=' in assignment: {block}"))
            })?;
            let var: u32 = var
                .parse()
                .map_err(|_| GerberError::Syntax(format!("AM: bad variable name: ${var}")))?;
            compile_expr(expr, &mut out)?;
            out.push(Instruction::Store(var));
        } else {
            let mut parts = block.split(',');
            let code_text = parts.next().unwrap_or_default();
            let code: u32 = code_text.parse().map_err(|_| {
                GerberError::Range(format!("AM: invalid primitive code: {code_text}"))
            })?;
            for expr in parts {
                compile_expr(expr, &mut out)?;
            }
            out.push(Instruction::Prim(code));
        }
    }
    Ok(out)
}

/// Primitive code 0 carries free text, which may itself start with digits
/// after a separator.
fn is_comment(block: &str) -> bool {
    match block.strip_prefix('0') {
        Some(rest) => !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'),
        None => false,
    }
}

fn compile_expr(expr: &str, out: &mut Vec<Instruction>) -> Result<(), GerberError> {
    let tokens = tokenize_expr(expr)?;
    if tokens.is_empty() {
        return Err(GerberError::Syntax("AM: empty expression".into()));
    }

    let mut ops: Vec<Op> = Vec::new();
    let mut prev: Option<ExprToken> = None;
    for token in tokens {
        // A minus with no left operand negates what follows.
        let unary = matches!(
            prev,
            None | Some(ExprToken::Plus)
                | Some(ExprToken::Minus)
                | Some(ExprToken::Mul)
                | Some(ExprToken::Div)
                | Some(ExprToken::LParen)
        );
        match token {
            ExprToken::Num(v) => out.push(Instruction::Push(v)),
            ExprToken::Var(n) => out.push(Instruction::Load(n)),
            ExprToken::Minus if unary => ops.push(Op::Neg),
            ExprToken::Plus if unary => {}
            ExprToken::Plus | ExprToken::Minus | ExprToken::Mul | ExprToken::Div => {
                let op = match token {
                    ExprToken::Plus => Op::Add,
                    ExprToken::Minus => Op::Sub,
                    ExprToken::Mul => Op::Mul,
                    _ => Op::Div,
                };
                while let Some(&top) = ops.last() {
                    if top == Op::LParen || top.precedence() < op.precedence() {
                        break;
                    }
                    top.emit(out);
                    ops.pop();
                }
                ops.push(op);
            }
            ExprToken::LParen => ops.push(Op::LParen),
            ExprToken::RParen => loop {
                match ops.pop() {
                    Some(Op::LParen) => break,
                    Some(op) => op.emit(out),
                    None => {
                        return Err(GerberError::Syntax(format!(
                            "AM: unbalanced ')' in: {expr}"
                        )))
                    }
                }
            },
        }
        prev = Some(token);
    }

    while let Some(op) = ops.pop() {
        if op == Op::LParen {
            return Err(GerberError::Syntax(format!("AM: unbalanced '(' in: {expr}")));
        }
        op.emit(out);
    }
    Ok(())
}

fn tokenize_expr(s: &str) -> Result<Vec<ExprToken>, GerberError> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            '+' => {
                chars.next();
                tokens.push(ExprToken::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(ExprToken::Minus);
            }
            'x' | 'X' => {
                chars.next();
                tokens.push(ExprToken::Mul);
            }
            '/' => {
                chars.next();
                tokens.push(ExprToken::Div);
            }
            '(' => {
                chars.next();
                tokens.push(ExprToken::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(ExprToken::RParen);
            }
            '$' => {
                chars.next();
                let mut num_str = String::new();
                while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
                    num_str.push(c);
                }
                let idx: u32 = num_str.parse().map_err(|_| {
                    GerberError::Syntax(format!("AM expr: bad variable: ${num_str}"))
                })?;
                tokens.push(ExprToken::Var(idx));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut num_str = String::new();
                while let Some(c) = chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
                    num_str.push(c);
                }
                let val: f64 = num_str.parse().map_err(|_| {
                    GerberError::Syntax(format!("AM expr: bad number: {num_str}"))
                })?;
                tokens.push(ExprToken::Num(val));
            }
            _ => {
                return Err(GerberError::Syntax(format!(
                    "AM expr: unexpected char '{ch}' in: {s}"
                )));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    #[test]
    fn test_compile_circle() {
        assert_eq!(
            compile("1,1,1.5,0,0*").unwrap(),
            vec![Push(1.0), Push(1.5), Push(0.0), Push(0.0), Prim(1)]
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            compile("1,1+2x3*").unwrap(),
            vec![Push(1.0), Push(2.0), Push(3.0), Mul, Add, Prim(1)]
        );
        assert_eq!(
            compile("1,8/2-1*").unwrap(),
            vec![Push(8.0), Push(2.0), Div, Push(1.0), Sub, Prim(1)]
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            compile("1,5-3-1*").unwrap(),
            vec![Push(5.0), Push(3.0), Sub, Push(1.0), Sub, Prim(1)]
        );
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(
            compile("1,(1+2)X$1*").unwrap(),
            vec![Push(1.0), Push(2.0), Add, Load(1), Mul, Prim(1)]
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            compile("1,-$1*").unwrap(),
            vec![Load(1), Push(-1.0), Mul, Prim(1)]
        );
        assert_eq!(
            compile("$2=-(1+1)*").unwrap(),
            vec![Push(1.0), Push(1.0), Add, Push(-1.0), Mul, Store(2)]
        );
    }

    #[test]
    fn test_assignment_and_comment() {
        let src = "0 Rounded rectangle*$3=$1/2*21,1,$1,$3,0,0,0*";
        assert_eq!(
            compile(src).unwrap(),
            vec![
                Load(1),
                Push(2.0),
                Div,
                Store(3),
                Push(1.0),
                Load(1),
                Load(3),
                Push(0.0),
                Push(0.0),
                Push(0.0),
                Prim(21),
            ]
        );
    }

    #[test]
    fn test_comment_starting_with_digits() {
        assert_eq!(
            compile("0 2 layer pad*1,1,$1,0,0*").unwrap(),
            vec![Push(1.0), Load(1), Push(0.0), Push(0.0), Prim(1)]
        );
        assert!(compile("\n0,10 mil*").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_and_newlines_ignored() {
        assert_eq!(
            compile("\n1, 1 ,\n0.5,0,0*\n").unwrap(),
            vec![Push(1.0), Push(0.5), Push(0.0), Push(0.0), Prim(1)]
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(compile("1,(1+2*"), Err(GerberError::Syntax(_))));
        assert!(matches!(compile("1,1+2)*"), Err(GerberError::Syntax(_))));
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(compile("1,1,#*"), Err(GerberError::Syntax(_))));
        assert!(matches!(compile("A,1*"), Err(GerberError::Range(_))));
        assert!(matches!(compile("$1 2*"), Err(GerberError::Syntax(_))));
        assert!(matches!(compile("1,,2*"), Err(GerberError::Syntax(_))));
    }
}
