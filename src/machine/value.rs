//! Runtime values of the machine
use core::fmt;
use std::rc::Rc;

use im_rc::Vector;

use crate::{
    expr::{BaseType, Expr},
    ident::Identifier,
};

use super::env::RenameEnv;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Closure(Rc<Closure>),
    /// A fully colored fragment: code one stage up.
    Code(Rc<Expr>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
            Self::Closure(_) => ValueKind::Function,
            Self::Code(_) => ValueKind::Code,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

// Closures compare by identity, code by structure.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            (Self::Code(a), Self::Code(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Closure(closure) => write!(f, "{closure}"),
            Self::Code(code) => write!(f, "`{{ {code} }}"),
        }
    }
}

/// What a value is, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Bool,
    Function,
    Code,
}

impl From<BaseType> for ValueKind {
    fn from(value: BaseType) -> Self {
        match value {
            BaseType::Int => Self::Int,
            BaseType::Bool => Self::Bool,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "integer"),
            Self::Bool => write!(f, "boolean"),
            Self::Function => write!(f, "function"),
            Self::Code => write!(f, "code"),
        }
    }
}

/// A function value: a lambda (or a fixpoint over one) with the renaming environment
/// of its creation site.
///
/// Variable *values* are not captured when the closure is made. They live in binding
/// frames on the continuation, and a closure only collects one when it is returned
/// past that frame. The collected bindings are pushed back onto the continuation
/// whenever the closure is called.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The fixpoint binder, which names the closure itself inside `body`.
    pub(crate) recursive: Option<Identifier>,
    pub(crate) param: Identifier,
    pub(crate) body: Rc<Expr>,
    pub(crate) env: RenameEnv,
    /// Most recently collected first.
    pub(crate) bindings: Vector<(Identifier, Value)>,
}

impl Closure {
    pub(crate) fn new(
        recursive: Option<Identifier>,
        param: Identifier,
        body: Rc<Expr>,
        env: RenameEnv,
    ) -> Self {
        Self {
            recursive,
            param,
            body,
            env,
            bindings: Vector::new(),
        }
    }

    pub fn param(&self) -> &Identifier {
        &self.param
    }

    pub fn body(&self) -> &Rc<Expr> {
        &self.body
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive.is_some()
    }

    /// Bindings this closure carries for its free variables.
    pub fn bindings(&self) -> impl Iterator<Item = &(Identifier, Value)> {
        self.bindings.iter()
    }

    /// This closure after being returned past the binding of `id`.
    pub(crate) fn capture(&self, id: Identifier, value: Value) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.push_front((id, value));
        Self {
            bindings,
            ..self.clone()
        }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.recursive {
            Some(binder) => write!(f, "<fix {binder} fn {}>", self.param),
            None => write!(f, "<fn {}>", self.param),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use assert2::check;

    use super::{Closure, Value, ValueKind};
    use crate::{
        expr::Expr,
        ident::Identifier,
        machine::env::RenameEnv,
    };

    fn identity() -> Closure {
        Closure::new(None, Identifier::raw("y"), Expr::var("y"), RenameEnv::new())
    }

    #[test]
    fn display() {
        check!(Value::Int(-3).to_string() == "-3");
        check!(Value::Bool(true).to_string() == "true");
        check!(Value::Code(Expr::int(1)).to_string() == "`{ 1 }");
        check!(Value::Closure(Rc::new(identity())).to_string() == "<fn y>");
    }

    #[test]
    fn equality() {
        let closure = Rc::new(identity());
        check!(Value::Closure(closure.clone()) == Value::Closure(closure));
        check!(Value::Closure(Rc::new(identity())) != Value::Closure(Rc::new(identity())));
        check!(Value::Code(Expr::int(1)) == Value::Code(Expr::int(1)));
        check!(Value::Int(1) != Value::Bool(true));
    }

    #[test]
    fn capture_keeps_the_original() {
        let closure = identity();
        let captured = closure.capture(Identifier::Colored("x".into(), 0), Value::Int(1));
        check!(closure.bindings().count() == 0);
        check!(captured.bindings().count() == 1);
        check!(captured.param() == closure.param());

        let twice = captured.capture(Identifier::Colored("z".into(), 1), Value::Bool(true));
        let order: Vec<_> = twice.bindings().map(|(id, _)| id.to_string()).collect();
        check!(order == ["z@1", "x@0"]);
        check!(Value::Int(0).kind() == ValueKind::Int);
    }
}
