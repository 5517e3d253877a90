//! The staged language's abstract syntax
use core::fmt;
use std::rc::Rc;

use arbitrary::Arbitrary;

use crate::ident::Identifier;

/// An immutable, freely shared expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(Identifier),
    Lambda {
        param: Identifier,
        body: Rc<Expr>,
    },
    App {
        fun: Rc<Expr>,
        arg: Rc<Expr>,
    },
    Int(i64),
    Bool(bool),
    /// `args` is ordered; its length is checked against the operator's arity when evaluated.
    Prim {
        op: PrimOp,
        args: Rc<[Rc<Expr>]>,
    },
    Logic {
        op: LogicOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    If {
        cond: Rc<Expr>,
        then: Rc<Expr>,
        otherwise: Rc<Expr>,
    },
    /// `body` must be a [`Expr::Lambda`]
    Fix {
        binder: Identifier,
        body: Rc<Expr>,
    },
    Quote(Rc<Expr>),
    /// Cross `shift` stage boundaries. Kept signed so a bad shift from the front end
    /// reaches the machine and is reported there.
    Splice {
        shift: i64,
        body: Rc<Expr>,
    },
    Let {
        id: Identifier,
        bound: Rc<Expr>,
        body: Rc<Expr>,
    },
}

// Constructors, mostly for building trees by hand.
impl Expr {
    pub fn var(name: impl AsRef<str>) -> Rc<Self> {
        Rc::new(Self::Var(Identifier::raw(name)))
    }

    pub fn lambda(param: impl AsRef<str>, body: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Lambda {
            param: Identifier::raw(param),
            body,
        })
    }

    pub fn app(fun: Rc<Self>, arg: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::App { fun, arg })
    }

    pub fn int(value: i64) -> Rc<Self> {
        Rc::new(Self::Int(value))
    }

    pub fn bool(value: bool) -> Rc<Self> {
        Rc::new(Self::Bool(value))
    }

    pub fn prim(op: PrimOp, args: impl IntoIterator<Item = Rc<Self>>) -> Rc<Self> {
        Rc::new(Self::Prim {
            op,
            args: args.into_iter().collect(),
        })
    }

    pub fn logic(op: LogicOp, left: Rc<Self>, right: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Logic { op, left, right })
    }

    pub fn if_(cond: Rc<Self>, then: Rc<Self>, otherwise: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::If {
            cond,
            then,
            otherwise,
        })
    }

    pub fn fix(binder: impl AsRef<str>, body: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Fix {
            binder: Identifier::raw(binder),
            body,
        })
    }

    pub fn quote(body: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Quote(body))
    }

    pub fn splice(shift: i64, body: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Splice { shift, body })
    }

    pub fn let_(id: impl AsRef<str>, bound: Rc<Self>, body: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Let {
            id: Identifier::raw(id),
            bound,
            body,
        })
    }
}

impl Expr {
    /// Whether `id` occurs free anywhere in this tree, at any stage.
    pub fn occurs_free(&self, id: &Identifier) -> bool {
        match self {
            Self::Var(var) => var == id,
            Self::Lambda { param, body } => param != id && body.occurs_free(id),
            Self::Fix { binder, body } => binder != id && body.occurs_free(id),
            Self::App { fun, arg } => fun.occurs_free(id) || arg.occurs_free(id),
            Self::Int(_) | Self::Bool(_) => false,
            Self::Prim { args, .. } => args.iter().any(|arg| arg.occurs_free(id)),
            Self::Logic { left, right, .. } => left.occurs_free(id) || right.occurs_free(id),
            Self::If {
                cond,
                then,
                otherwise,
            } => cond.occurs_free(id) || then.occurs_free(id) || otherwise.occurs_free(id),
            Self::Quote(body) | Self::Splice { body, .. } => body.occurs_free(id),
            Self::Let {
                id: binder,
                bound,
                body,
            } => bound.occurs_free(id) || (binder != id && body.occurs_free(id)),
        }
    }

    /// Whether the tree contains any quote or splice.
    pub fn is_staged(&self) -> bool {
        match self {
            Self::Quote(_) | Self::Splice { .. } => true,
            Self::Var(_) | Self::Int(_) | Self::Bool(_) => false,
            Self::Lambda { body, .. } | Self::Fix { body, .. } => body.is_staged(),
            Self::App { fun, arg } => fun.is_staged() || arg.is_staged(),
            Self::Prim { args, .. } => args.iter().any(|arg| arg.is_staged()),
            Self::Logic { left, right, .. } => left.is_staged() || right.is_staged(),
            Self::If {
                cond,
                then,
                otherwise,
            } => cond.is_staged() || then.is_staged() || otherwise.is_staged(),
            Self::Let { bound, body, .. } => bound.is_staged() || body.is_staged(),
        }
    }
}

/// The kinds of operand and result a primitive operator can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Int,
    Bool,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "integer"),
            Self::Bool => write!(f, "boolean"),
        }
    }
}

/// Primitive operators. Each has a fixed arity and operand kinds, see [`PrimOp::signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    /// Rounds toward negative infinity.
    Div,
    /// Takes the sign of the divisor.
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Boolean negation.
    Neg,
}

impl PrimOp {
    pub const ALL: [PrimOp; 12] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Neg,
    ];

    /// Operand kinds, in order, and the result kind.
    pub fn signature(self) -> (&'static [BaseType], BaseType) {
        use BaseType::*;
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod => (&[Int, Int], Int),
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => (&[Int, Int], Bool),
            Self::Neg => (&[Bool], Bool),
        }
    }

    pub fn arity(self) -> usize {
        self.signature().0.len()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Neg => "neg",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Neg => "not",
        }
    }

    // printing precedence of the infix form
    fn precedence(self) -> u8 {
        match self {
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => CMP,
            Self::Add | Self::Sub => SUM,
            Self::Mul | Self::Div | Self::Mod => TERM,
            Self::Neg => UNARY,
        }
    }
}

impl fmt::Display for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Short-circuiting boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum LogicOp {
    And,
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}

// Precedence levels, loosest first. They mirror the grammar in `parser`.
const EXPR: u8 = 0;
const OR: u8 = 1;
const AND: u8 = 2;
const CMP: u8 = 3;
const SUM: u8 = 4;
const TERM: u8 = 5;
const UNARY: u8 = 6;
const APP: u8 = 7;
const ATOM: u8 = 8;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::Lambda { .. } | Self::Fix { .. } | Self::Let { .. } | Self::If { .. } => EXPR,
            Self::Logic { op: LogicOp::Or, .. } => OR,
            Self::Logic {
                op: LogicOp::And, ..
            } => AND,
            Self::Prim { op, args } if args.len() == op.arity() => op.precedence(),
            Self::Int(n) if *n < 0 => UNARY,
            Self::App { .. } => APP,
            _ => ATOM,
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, context: u8) -> fmt::Result {
        if self.precedence() < context {
            write!(f, "(")?;
            self.fmt_bare(f)?;
            write!(f, ")")
        } else {
            self.fmt_bare(f)
        }
    }

    fn fmt_bare(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(id) => write!(f, "{id}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Lambda { param, body } => {
                write!(f, "fn {param} -> ")?;
                body.fmt_at(f, EXPR)
            }
            Self::Fix { binder, body } => {
                write!(f, "fix {binder} -> ")?;
                body.fmt_at(f, EXPR)
            }
            Self::Let { id, bound, body } => {
                write!(f, "let {id} = ")?;
                bound.fmt_at(f, EXPR)?;
                write!(f, " in ")?;
                body.fmt_at(f, EXPR)
            }
            Self::If {
                cond,
                then,
                otherwise,
            } => {
                write!(f, "if ")?;
                cond.fmt_at(f, EXPR)?;
                write!(f, " then ")?;
                then.fmt_at(f, EXPR)?;
                write!(f, " else ")?;
                otherwise.fmt_at(f, EXPR)
            }
            Self::App { fun, arg } => {
                fun.fmt_at(f, APP)?;
                write!(f, " ")?;
                arg.fmt_at(f, ATOM)
            }
            Self::Logic { op, left, right } => {
                let level = self.precedence();
                left.fmt_at(f, level)?;
                write!(f, " {op} ")?;
                right.fmt_at(f, level + 1)
            }
            Self::Prim { op: PrimOp::Neg, args } if args.len() == 1 => {
                write!(f, "not ")?;
                args[0].fmt_at(f, UNARY)
            }
            Self::Prim { op, args } if args.len() == 2 && args.len() == op.arity() => {
                let level = op.precedence();
                // comparisons do not chain
                let left_level = if level == CMP { level + 1 } else { level };
                args[0].fmt_at(f, left_level)?;
                write!(f, " {op} ")?;
                args[1].fmt_at(f, level + 1)
            }
            // malformed arity: prefix form
            Self::Prim { op, args } => {
                write!(f, "{}(", op.name())?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_at(f, EXPR)?;
                }
                write!(f, ")")
            }
            Self::Quote(body) => {
                write!(f, "`{{ ")?;
                body.fmt_at(f, EXPR)?;
                write!(f, " }}")
            }
            Self::Splice { shift, body } => {
                if *shift == 1 {
                    write!(f, "~{{ ")?;
                } else {
                    write!(f, "~{shift}{{ ")?;
                }
                body.fmt_at(f, EXPR)?;
                write!(f, " }}")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, EXPR)
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::{Expr, LogicOp, PrimOp};
    use crate::ident::Identifier;

    #[test]
    fn occurs_free_respects_binders() {
        let x = Identifier::raw("x");
        check!(Expr::var("x").occurs_free(&x));
        check!(!Expr::lambda("x", Expr::var("x")).occurs_free(&x));
        check!(Expr::lambda("y", Expr::var("x")).occurs_free(&x));
        check!(!Expr::fix("x", Expr::lambda("y", Expr::var("x"))).occurs_free(&x));
        // the bound expression is outside the let's scope
        check!(Expr::let_("x", Expr::var("x"), Expr::int(1)).occurs_free(&x));
        check!(!Expr::let_("x", Expr::int(1), Expr::var("x")).occurs_free(&x));
        // occurrences at any stage count
        check!(Expr::quote(Expr::splice(1, Expr::var("x"))).occurs_free(&x));
        check!(Expr::prim(PrimOp::Add, [Expr::int(1), Expr::var("x")]).occurs_free(&x));
    }

    #[test]
    fn staged_trees() {
        check!(!Expr::lambda("x", Expr::var("x")).is_staged());
        check!(Expr::quote(Expr::int(1)).is_staged());
        check!(Expr::let_("y", Expr::int(1), Expr::splice(0, Expr::var("y"))).is_staged());
        check!(Expr::prim(PrimOp::Add, [Expr::int(1), Expr::quote(Expr::int(2))]).is_staged());
    }

    #[test]
    fn signatures() {
        for op in PrimOp::ALL {
            check!(op.arity() == if op == PrimOp::Neg { 1 } else { 2 });
        }
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let sum = Expr::prim(PrimOp::Add, [Expr::int(1), Expr::int(2)]);
        let product = Expr::prim(PrimOp::Mul, [sum.clone(), Expr::int(3)]);
        check!(product.to_string() == "(1 + 2) * 3");

        let nested = Expr::prim(PrimOp::Sub, [Expr::int(1), sum]);
        check!(nested.to_string() == "1 - (1 + 2)");

        let app = Expr::app(
            Expr::app(Expr::var("f"), Expr::int(1)),
            Expr::app(Expr::var("g"), Expr::int(2)),
        );
        check!(app.to_string() == "f 1 (g 2)");

        let logic = Expr::logic(
            LogicOp::And,
            Expr::logic(LogicOp::Or, Expr::bool(true), Expr::bool(false)),
            Expr::prim(PrimOp::Neg, [Expr::bool(true)]),
        );
        check!(logic.to_string() == "(true || false) && not true");

        let staged = Expr::quote(Expr::lambda("x", Expr::splice(1, Expr::var("x"))));
        check!(staged.to_string() == "`{ fn x -> ~{ x } }");
        check!(Expr::splice(0, Expr::int(1)).to_string() == "~0{ 1 }");

        let malformed = Expr::prim(PrimOp::Add, [Expr::int(1)]);
        check!(malformed.to_string() == "add(1)");
    }
}
