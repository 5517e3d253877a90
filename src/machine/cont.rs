//! Continuations
//!
//! Stage-0 evaluation consumes [`ValueFrame`]s and code construction consumes
//! [`CodeFrame`]s. The two live on separate, separately typed stacks, linked at the
//! stage boundaries:
//!
//! - a quote entered from stage 0 starts a [`CodeCont`] whose bottom closes the quote and
//!   hands the finished code value back to the [`ValueCont`] it came from;
//! - a splice that lands on stage 0 starts a [`ValueCont`] whose bottom is an [`Escape`]
//!   that turns the resulting code value back into a fragment for the enclosing
//!   [`CodeCont`].
use std::rc::Rc;

use im_rc::Vector;

use crate::{
    expr::{Expr, LogicOp, PrimOp},
    ident::Identifier,
};

use super::{env::RenameEnv, value::Value};

/// Frames consumed by a value produced at stage 0.
#[derive(Debug, Clone)]
pub enum ValueFrame {
    /// The function is being evaluated; the argument comes next.
    AppFun { arg: Rc<Expr>, env: RenameEnv },
    /// The argument is being evaluated.
    AppArg { fun: Value },
    /// A variable's value for everything above this frame.
    Bind { id: Identifier, value: Value },
    /// Operands left of the one being evaluated are in `done`.
    Prim {
        op: PrimOp,
        done: Vec<Value>,
        args: Rc<[Rc<Expr>]>,
        env: RenameEnv,
    },
    IfBranch {
        then: Rc<Expr>,
        otherwise: Rc<Expr>,
        env: RenameEnv,
    },
    LogicLeft {
        op: LogicOp,
        right: Rc<Expr>,
        env: RenameEnv,
    },
    LogicRight { op: LogicOp },
    LetBound {
        id: Identifier,
        body: Rc<Expr>,
        env: RenameEnv,
    },
    /// `~0{ e }`: the value of `e` is code to run right here.
    Run,
}

/// Frames consumed by a code fragment produced above stage 0. Each holds the parts of a
/// skeleton already built and whatever is needed to build the rest.
#[derive(Debug, Clone)]
pub enum CodeFrame {
    Lambda { param: Identifier },
    Fix { binder: Identifier },
    AppFun { arg: Rc<Expr>, env: RenameEnv },
    AppArg { fun: Rc<Expr> },
    Prim {
        op: PrimOp,
        done: Vec<Rc<Expr>>,
        args: Rc<[Rc<Expr>]>,
        env: RenameEnv,
    },
    IfCond {
        then: Rc<Expr>,
        otherwise: Rc<Expr>,
        env: RenameEnv,
    },
    IfThen {
        cond: Rc<Expr>,
        otherwise: Rc<Expr>,
        env: RenameEnv,
    },
    IfElse { cond: Rc<Expr>, then: Rc<Expr> },
    LogicLeft {
        op: LogicOp,
        right: Rc<Expr>,
        env: RenameEnv,
    },
    LogicRight { op: LogicOp, left: Rc<Expr> },
    LetBound {
        id: Identifier,
        body: Rc<Expr>,
        env: RenameEnv,
    },
    LetBody { id: Identifier, bound: Rc<Expr> },
    /// A quote nested inside code; the fragment is one level deeper than the frame.
    Quote,
    /// A splice kept in the code; the fragment is `shift` levels below the frame.
    Splice { shift: usize },
}

impl CodeFrame {
    /// The identifier this frame binds for the fragment being built above it.
    fn binder(&self) -> Option<&Identifier> {
        match self {
            Self::Lambda { param } => Some(param),
            Self::Fix { binder } => Some(binder),
            Self::LetBody { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Escape {
    /// The level of the splice the value came from.
    pub shift: usize,
    pub outer: CodeCont,
}

/// The continuation of a value at stage 0.
#[derive(Debug, Clone, Default)]
pub struct ValueCont {
    /// Innermost frame first.
    frames: Vector<ValueFrame>,
    escape: Option<Rc<Escape>>,
}

/// The continuation of a code fragment above stage 0.
#[derive(Debug, Clone)]
pub struct CodeCont {
    /// Innermost frame first.
    frames: Vector<CodeFrame>,
    /// Receives the code value once the outermost quote closes.
    close: Rc<ValueCont>,
}

#[derive(Debug)]
pub enum ValueTop {
    Frame(ValueFrame, ValueCont),
    /// The bottom of a stage-0 region inside code.
    Escape { shift: usize, outer: CodeCont },
    Halt,
}

#[derive(Debug)]
pub enum CodeTop {
    Frame(CodeFrame, CodeCont),
    /// The bottom of a quote entered from stage 0.
    CloseQuote(ValueCont),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Value),
    /// Bound by code still under construction; it has no value at stage 0.
    Future,
    NotFound,
}

impl ValueCont {
    pub fn halt() -> Self {
        Self::default()
    }

    /// A stage-0 region spliced into code at level `shift`.
    pub fn escape(shift: usize, outer: CodeCont) -> Self {
        Self {
            frames: Vector::new(),
            escape: Some(Rc::new(Escape { shift, outer })),
        }
    }

    pub fn push(&self, frame: ValueFrame) -> Self {
        let mut frames = self.frames.clone();
        frames.push_front(frame);
        Self {
            frames,
            escape: self.escape.clone(),
        }
    }

    pub fn pop(self) -> ValueTop {
        let Self { mut frames, escape } = self;
        match frames.pop_front() {
            Some(frame) => ValueTop::Frame(frame, Self { frames, escape }),
            None => match escape {
                Some(escape) => ValueTop::Escape {
                    shift: escape.shift,
                    outer: escape.outer.clone(),
                },
                None => ValueTop::Halt,
            },
        }
    }

    /// Whether a value delivered here is the final result.
    pub fn is_halt(&self) -> bool {
        self.frames.is_empty() && self.escape.is_none()
    }

    /// Total frames of both kinds below this point.
    pub fn depth(&self) -> usize {
        self.frames.len()
            + self
                .escape
                .as_ref()
                .map_or(0, |escape| escape.outer.depth())
    }

    /// Searches the binding frames from the top down for `id`.
    ///
    /// The search crosses stage boundaries downwards: past an escape it continues below the
    /// code being built around the splice. If that code binds `id` itself, the variable
    /// belongs to a later stage and the result is [`Lookup::Future`].
    pub fn lookup(&self, id: &Identifier) -> Lookup {
        let mut cont = self;
        loop {
            let found = cont.frames.iter().find_map(|frame| match frame {
                ValueFrame::Bind { id: bound, value } if bound == id => Some(value),
                _ => None,
            });
            if let Some(value) = found {
                return Lookup::Found(value.clone());
            }
            let Some(escape) = &cont.escape else {
                return Lookup::NotFound;
            };
            if escape.outer.binds(id) {
                return Lookup::Future;
            }
            cont = escape.outer.close.as_ref();
        }
    }
}

impl CodeCont {
    /// The continuation of a quote's body entered from stage 0.
    pub fn closing(cont: ValueCont) -> Self {
        Self {
            frames: Vector::new(),
            close: Rc::new(cont),
        }
    }

    pub fn push(&self, frame: CodeFrame) -> Self {
        let mut frames = self.frames.clone();
        frames.push_front(frame);
        Self {
            frames,
            close: self.close.clone(),
        }
    }

    pub fn pop(self) -> CodeTop {
        let Self { mut frames, close } = self;
        match frames.pop_front() {
            Some(frame) => CodeTop::Frame(frame, Self { frames, close }),
            None => CodeTop::CloseQuote(ValueCont::clone(&close)),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len() + 1 + self.close.depth()
    }

    /// Whether a skeleton on this continuation binds `id`, up to the quote's close.
    fn binds(&self, id: &Identifier) -> bool {
        self.frames.iter().any(|frame| frame.binder() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::{CodeCont, CodeFrame, CodeTop, Lookup, ValueCont, ValueFrame, ValueTop};
    use crate::{ident::Identifier, machine::value::Value};

    fn colored(name: &str, tag: u64) -> Identifier {
        Identifier::Colored(name.into(), tag)
    }

    fn bind(cont: &ValueCont, id: Identifier, value: i64) -> ValueCont {
        cont.push(ValueFrame::Bind {
            id,
            value: Value::Int(value),
        })
    }

    #[test]
    fn innermost_binding_wins() {
        let x = colored("x", 0);
        let cont = bind(&bind(&ValueCont::halt(), x.clone(), 1), x.clone(), 2);
        check!(cont.lookup(&x) == Lookup::Found(Value::Int(2)));
        check!(cont.lookup(&colored("x", 1)) == Lookup::NotFound);
        check!(cont.depth() == 2);
    }

    #[test]
    fn lookup_crosses_stages() {
        let x = colored("x", 0);
        let y = colored("y", 1);
        let outer = bind(&ValueCont::halt(), x.clone(), 7);
        let code = CodeCont::closing(outer).push(CodeFrame::Lambda { param: y.clone() });
        let inner = ValueCont::escape(1, code);

        check!(inner.lookup(&x) == Lookup::Found(Value::Int(7)));
        check!(inner.lookup(&y) == Lookup::Future);
        check!(inner.lookup(&colored("z", 2)) == Lookup::NotFound);
    }

    #[test]
    fn continuations_are_persistent() {
        let base = bind(&ValueCont::halt(), colored("x", 0), 1);
        let left = bind(&base, colored("y", 1), 2);
        let right = base.push(ValueFrame::Run);

        check!(base.depth() == 1);
        check!(left.depth() == 2);
        check!(right.lookup(&colored("y", 1)) == Lookup::NotFound);
        let_assert!(ValueTop::Frame(ValueFrame::Bind { value, .. }, rest) = left.pop());
        check!(value == Value::Int(2));
        check!(rest.depth() == 1);
        check!(base.lookup(&colored("x", 0)) == Lookup::Found(Value::Int(1)));

        let code = CodeCont::closing(base).push(CodeFrame::Quote);
        let deeper = code.push(CodeFrame::Splice { shift: 1 });
        check!(code.depth() == 3);
        check!(deeper.depth() == 4);
    }

    #[test]
    fn popping() {
        let_assert!(ValueTop::Halt = ValueCont::halt().pop());

        let code = CodeCont::closing(ValueCont::halt()).push(CodeFrame::Quote);
        let_assert!(ValueTop::Escape { shift: 2, outer } = ValueCont::escape(2, code).pop());
        let_assert!(CodeTop::Frame(CodeFrame::Quote, rest) = outer.pop());
        let_assert!(CodeTop::CloseQuote(value) = rest.pop());
        check!(value.is_halt());

        let cont = ValueCont::halt().push(ValueFrame::Run);
        check!(!cont.is_halt());
        let_assert!(ValueTop::Frame(ValueFrame::Run, rest) = cont.pop());
        check!(rest.is_halt());
    }
}
