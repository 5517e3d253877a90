//! The staged abstract machine
//!
//! A state is one of three things: an expression waiting to be evaluated, a value on its
//! way to a stage-0 frame, or a code fragment on its way to a frame that builds code.
//! [`Machine::step`] performs exactly one transition; [`Machine::run`] steps until a value
//! reaches an empty continuation.
pub mod cont;
pub mod env;
pub mod fuel;
pub mod prim;
pub mod value;

use core::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::{
    expr::{Expr, LogicOp, PrimOp},
    ident::{Colorer, Identifier},
};

use self::{
    cont::{CodeCont, CodeFrame, CodeTop, Lookup, ValueCont, ValueFrame, ValueTop},
    env::RenameEnv,
    fuel::Fuel,
    value::{Closure, Value, ValueKind},
};

/// The construct that rejected a value of the wrong kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Primitive(PrimOp),
    If,
    Logic(LogicOp),
    Application,
    /// `~0{ ... }` at stage 0
    Run,
    /// a splice landing on stage 0 from inside code
    Splice,
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(op) => write!(f, "`{op}`"),
            Self::If => write!(f, "`if`"),
            Self::Logic(op) => write!(f, "`{op}`"),
            Self::Application => write!(f, "application"),
            Self::Run => write!(f, "`~0{{}}`"),
            Self::Splice => write!(f, "splice"),
        }
    }
}

/// Every way a run can fail. All of them are terminal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MachineError {
    #[error("unbound variable `{0}`")]
    UnboundVariable(Identifier),
    #[error("`{0}` is bound by code that is still being built")]
    FutureBindingReferenced(Identifier),
    #[error("no continuation left to step")]
    EmptyContinuation,
    #[error("the body of `fix {0}` must be a function")]
    MalformedFixpoint(Identifier),
    #[error("`{op}` takes {expected} operand(s), found {found}")]
    ArityMismatch {
        op: PrimOp,
        expected: usize,
        found: usize,
    },
    #[error("`{0}` applied to no operands")]
    EmptyPrimitiveArguments(PrimOp),
    #[error("{context} expected {expected}, found {found}")]
    TypeMismatch {
        context: Consumer,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("cannot splice across {shift} stage(s) at level {level}")]
    InvalidShift { shift: i64, level: usize },
    #[error("cannot splice below stage 0 (shift {shift})")]
    StagingViolation { shift: i64 },
    #[error("code referring to `{0}` escapes the scope of its binding")]
    ScopeExtrusion(Identifier),
    #[error("division by zero in `{0}`")]
    DivisionByZero(PrimOp),
    #[error("integer overflow in `{0}`")]
    Overflow(PrimOp),
    #[error("machine invariant violated: {0}")]
    Unreachable(&'static str),
}

impl MachineError {
    /// The variant name, for matching on errors as text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnboundVariable(_) => "UnboundVariable",
            Self::FutureBindingReferenced(_) => "FutureBindingReferenced",
            Self::EmptyContinuation => "EmptyContinuation",
            Self::MalformedFixpoint(_) => "MalformedFixpoint",
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::EmptyPrimitiveArguments(_) => "EmptyPrimitiveArguments",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::InvalidShift { .. } => "InvalidShift",
            Self::StagingViolation { .. } => "StagingViolation",
            Self::ScopeExtrusion(_) => "ScopeExtrusion",
            Self::DivisionByZero(_) => "DivisionByZero",
            Self::Overflow(_) => "Overflow",
            Self::Unreachable(_) => "Unreachable",
        }
    }
}

/// Where an expression's result goes: to stage-0 frames as a value, or to code frames as
/// a fragment at `level`.
#[derive(Debug, Clone)]
pub enum Cont {
    Value(ValueCont),
    Code { level: usize, cont: CodeCont },
}

#[derive(Debug, Clone)]
pub enum State {
    Eval {
        env: RenameEnv,
        expr: Rc<Expr>,
        cont: Cont,
    },
    /// Always at stage 0.
    ApplyValue { value: Value, cont: ValueCont },
    /// `level` is always above 0.
    ApplyCode {
        level: usize,
        code: Rc<Expr>,
        cont: CodeCont,
    },
}

impl State {
    /// Stage 0, no renamings, nothing to return to.
    pub fn initial(expr: Rc<Expr>) -> Self {
        Self::Eval {
            env: RenameEnv::new(),
            expr,
            cont: Cont::Value(ValueCont::halt()),
        }
    }

    pub fn level(&self) -> usize {
        match self {
            Self::Eval {
                cont: Cont::Code { level, .. },
                ..
            }
            | Self::ApplyCode { level, .. } => *level,
            Self::Eval {
                cont: Cont::Value(_),
                ..
            }
            | Self::ApplyValue { .. } => 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Eval { .. } => "eval",
            Self::ApplyValue { .. } => "apply-value",
            Self::ApplyCode { .. } => "apply-code",
        }
    }

    /// A value with nowhere left to go.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ApplyValue { cont, .. } if cont.is_halt())
    }

    /// The final value of a terminal state, or the state back.
    pub fn finish(self) -> Result<Value, Self> {
        match self {
            Self::ApplyValue { value, cont } if cont.is_halt() => Ok(value),
            state => Err(state),
        }
    }

    /// Frames of both kinds on the continuation.
    pub fn depth(&self) -> usize {
        match self {
            Self::Eval {
                cont: Cont::Value(cont),
                ..
            }
            | Self::ApplyValue { cont, .. } => cont.depth(),
            Self::Eval {
                cont: Cont::Code { cont, .. },
                ..
            }
            | Self::ApplyCode { cont, .. } => cont.depth(),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eval { expr, .. } => write!(f, "eval[{}] {expr}", self.level()),
            Self::ApplyValue { value, .. } => write!(f, "value {value}"),
            Self::ApplyCode { level, code, .. } => write!(f, "code[{level}] {code}"),
        }
    }
}

/// Builds the state that evaluates `expr` from scratch.
pub fn init_state(expr: Rc<Expr>) -> State {
    State::initial(expr)
}

/// Evaluates `expr` to completion on a fresh machine.
pub fn evaluate(expr: Rc<Expr>) -> Result<Value, MachineError> {
    Machine::new().run(State::initial(expr))
}

#[derive(Debug)]
pub enum Outcome {
    Finished(Value),
    /// Out of fuel or interrupted; pass the state back in to resume.
    Suspended(State),
}

/// Owns what is shared across transitions of one run: the colorer and a step count.
#[derive(Debug, Default)]
pub struct Machine {
    colorer: Colorer,
    steps: u64,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colorer(&self) -> &Colorer {
        &self.colorer
    }

    /// Restart coloring from tag 0 so a replayed run produces the same identifiers.
    pub fn reset_colors(&mut self) {
        self.colorer.reset();
    }

    /// Transitions taken since this machine was created.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn step(&mut self, state: State) -> Result<State, MachineError> {
        trace!(kind = state.kind(), level = state.level(), "step");
        self.steps += 1;
        match state {
            State::Eval {
                env,
                expr,
                cont: Cont::Value(cont),
            } => self.eval_value(env, expr, cont),
            State::Eval {
                env,
                expr,
                cont: Cont::Code { level, cont },
            } => self.eval_code(level, env, expr, cont),
            State::ApplyValue { value, cont } => self.apply_value(value, cont),
            State::ApplyCode { level, code, cont } => self.apply_code(level, code, cont),
        }
    }

    pub fn run(&mut self, state: State) -> Result<Value, MachineError> {
        let start = self.steps;
        let mut state = state;
        loop {
            state = match state.finish() {
                Ok(value) => {
                    debug!(steps = self.steps - start, %value, "run finished");
                    return Ok(value);
                }
                Err(state) => self.step(state).inspect_err(|error| {
                    debug!(steps = self.steps - start, %error, "run failed");
                })?,
            };
        }
    }

    /// Like [`Self::run`], but takes one unit of `fuel` per step and hands the state back
    /// when the fuel runs out.
    pub fn run_with_fuel(
        &mut self,
        state: State,
        fuel: &mut Fuel,
    ) -> Result<Outcome, MachineError> {
        let start = self.steps;
        let mut state = state;
        loop {
            state = match state.finish() {
                Ok(value) => {
                    debug!(steps = self.steps - start, %value, "run finished");
                    return Ok(Outcome::Finished(value));
                }
                Err(state) if !fuel.should_continue() => {
                    debug!(steps = self.steps - start, "run suspended");
                    return Ok(Outcome::Suspended(state));
                }
                Err(state) => {
                    fuel.consume(1);
                    self.step(state).inspect_err(|error| {
                        debug!(steps = self.steps - start, %error, "run failed");
                    })?
                }
            };
        }
    }

    fn eval_value(
        &mut self,
        env: RenameEnv,
        expr: Rc<Expr>,
        cont: ValueCont,
    ) -> Result<State, MachineError> {
        let eval = |env, expr, cont| State::Eval {
            env,
            expr,
            cont: Cont::Value(cont),
        };
        Ok(match &*expr {
            Expr::Var(id) => {
                let colored = env
                    .resolve(id)
                    .ok_or_else(|| MachineError::UnboundVariable(id.clone()))?;
                match cont.lookup(&colored) {
                    Lookup::Found(value) => State::ApplyValue { value, cont },
                    Lookup::Future => {
                        debug!(id = %colored, "future binding referenced");
                        return Err(MachineError::FutureBindingReferenced(id.clone()));
                    }
                    Lookup::NotFound => return Err(MachineError::UnboundVariable(id.clone())),
                }
            }
            Expr::Lambda { param, body } => State::ApplyValue {
                value: Value::Closure(Rc::new(Closure::new(
                    None,
                    param.clone(),
                    body.clone(),
                    env,
                ))),
                cont,
            },
            Expr::Fix { binder, body } => {
                let Expr::Lambda { param, body } = &**body else {
                    return Err(MachineError::MalformedFixpoint(binder.clone()));
                };
                let colored = self.colorer.color(binder);
                State::ApplyValue {
                    value: Value::Closure(Rc::new(Closure::new(
                        Some(colored.clone()),
                        param.clone(),
                        body.clone(),
                        env.bind(binder.clone(), colored),
                    ))),
                    cont,
                }
            }
            Expr::App { fun, arg } => eval(
                env.clone(),
                fun.clone(),
                cont.push(ValueFrame::AppFun {
                    arg: arg.clone(),
                    env,
                }),
            ),
            Expr::Int(n) => State::ApplyValue {
                value: Value::Int(*n),
                cont,
            },
            Expr::Bool(b) => State::ApplyValue {
                value: Value::Bool(*b),
                cont,
            },
            Expr::Prim { op, args } => {
                check_arity(*op, args)?;
                eval(
                    env.clone(),
                    args[0].clone(),
                    cont.push(ValueFrame::Prim {
                        op: *op,
                        done: Vec::with_capacity(args.len()),
                        args: args.clone(),
                        env,
                    }),
                )
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => eval(
                env.clone(),
                cond.clone(),
                cont.push(ValueFrame::IfBranch {
                    then: then.clone(),
                    otherwise: otherwise.clone(),
                    env,
                }),
            ),
            Expr::Logic { op, left, right } => eval(
                env.clone(),
                left.clone(),
                cont.push(ValueFrame::LogicLeft {
                    op: *op,
                    right: right.clone(),
                    env,
                }),
            ),
            Expr::Quote(body) => State::Eval {
                env,
                expr: body.clone(),
                cont: Cont::Code {
                    level: 1,
                    cont: CodeCont::closing(cont),
                },
            },
            Expr::Splice { shift, body } => {
                check_shift(*shift, 0)?;
                eval(env, body.clone(), cont.push(ValueFrame::Run))
            }
            Expr::Let { id, bound, body } => eval(
                env.clone(),
                bound.clone(),
                cont.push(ValueFrame::LetBound {
                    id: id.clone(),
                    body: body.clone(),
                    env,
                }),
            ),
        })
    }

    fn eval_code(
        &mut self,
        level: usize,
        env: RenameEnv,
        expr: Rc<Expr>,
        cont: CodeCont,
    ) -> Result<State, MachineError> {
        let eval = |env, expr, cont| State::Eval {
            env,
            expr,
            cont: Cont::Code { level, cont },
        };
        Ok(match &*expr {
            Expr::Var(id) => {
                let colored = env
                    .resolve(id)
                    .ok_or_else(|| MachineError::UnboundVariable(id.clone()))?;
                State::ApplyCode {
                    level,
                    code: Rc::new(Expr::Var(colored)),
                    cont,
                }
            }
            Expr::Lambda { param, body } => {
                let colored = self.colorer.color(param);
                eval(
                    env.bind(param.clone(), colored.clone()),
                    body.clone(),
                    cont.push(CodeFrame::Lambda { param: colored }),
                )
            }
            Expr::Fix { binder, body } => {
                // a spliced body can only be checked once it has been run
                if !matches!(**body, Expr::Lambda { .. } | Expr::Splice { .. }) {
                    return Err(MachineError::MalformedFixpoint(binder.clone()));
                }
                let colored = self.colorer.color(binder);
                eval(
                    env.bind(binder.clone(), colored.clone()),
                    body.clone(),
                    cont.push(CodeFrame::Fix { binder: colored }),
                )
            }
            Expr::App { fun, arg } => eval(
                env.clone(),
                fun.clone(),
                cont.push(CodeFrame::AppFun {
                    arg: arg.clone(),
                    env,
                }),
            ),
            Expr::Int(_) | Expr::Bool(_) => State::ApplyCode {
                level,
                code: expr.clone(),
                cont,
            },
            Expr::Prim { op, args } => {
                check_arity(*op, args)?;
                eval(
                    env.clone(),
                    args[0].clone(),
                    cont.push(CodeFrame::Prim {
                        op: *op,
                        done: Vec::with_capacity(args.len()),
                        args: args.clone(),
                        env,
                    }),
                )
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => eval(
                env.clone(),
                cond.clone(),
                cont.push(CodeFrame::IfCond {
                    then: then.clone(),
                    otherwise: otherwise.clone(),
                    env,
                }),
            ),
            Expr::Logic { op, left, right } => eval(
                env.clone(),
                left.clone(),
                cont.push(CodeFrame::LogicLeft {
                    op: *op,
                    right: right.clone(),
                    env,
                }),
            ),
            Expr::Quote(body) => State::Eval {
                env,
                expr: body.clone(),
                cont: Cont::Code {
                    level: level + 1,
                    cont: cont.push(CodeFrame::Quote),
                },
            },
            Expr::Splice { shift, body } => {
                let shift = check_shift(*shift, level)?;
                match level - shift {
                    0 => State::Eval {
                        env,
                        expr: body.clone(),
                        cont: Cont::Value(ValueCont::escape(shift, cont)),
                    },
                    target => State::Eval {
                        env,
                        expr: body.clone(),
                        cont: Cont::Code {
                            level: target,
                            cont: cont.push(CodeFrame::Splice { shift }),
                        },
                    },
                }
            }
            Expr::Let { id, bound, body } => eval(
                env.clone(),
                bound.clone(),
                cont.push(CodeFrame::LetBound {
                    id: id.clone(),
                    body: body.clone(),
                    env,
                }),
            ),
        })
    }

    fn apply_value(&mut self, value: Value, cont: ValueCont) -> Result<State, MachineError> {
        let eval = |env, expr, cont| State::Eval {
            env,
            expr,
            cont: Cont::Value(cont),
        };
        let (frame, cont) = match cont.pop() {
            ValueTop::Frame(frame, cont) => (frame, cont),
            ValueTop::Escape { shift, outer } => {
                return match value {
                    Value::Code(code) => Ok(State::ApplyCode {
                        level: shift,
                        code,
                        cont: outer,
                    }),
                    other => Err(MachineError::TypeMismatch {
                        context: Consumer::Splice,
                        expected: ValueKind::Code,
                        found: other.kind(),
                    }),
                };
            }
            ValueTop::Halt => return Err(MachineError::EmptyContinuation),
        };

        Ok(match frame {
            ValueFrame::AppFun { arg, env } => {
                eval(env, arg, cont.push(ValueFrame::AppArg { fun: value }))
            }
            ValueFrame::AppArg { fun } => self.call(fun, value, cont)?,
            ValueFrame::Bind { id, value: bound } => State::ApplyValue {
                value: leave_binding(value, id, bound)?,
                cont,
            },
            ValueFrame::Prim {
                op,
                mut done,
                args,
                env,
            } => {
                done.push(value);
                match args.get(done.len()) {
                    Some(next) => {
                        let next = next.clone();
                        eval(
                            env.clone(),
                            next,
                            cont.push(ValueFrame::Prim {
                                op,
                                done,
                                args,
                                env,
                            }),
                        )
                    }
                    None => State::ApplyValue {
                        value: prim::apply(op, &done)?,
                        cont,
                    },
                }
            }
            ValueFrame::IfBranch {
                then,
                otherwise,
                env,
            } => {
                let branch = if expect_bool(Consumer::If, &value)? {
                    then
                } else {
                    otherwise
                };
                eval(env, branch, cont)
            }
            ValueFrame::LogicLeft { op, right, env } => {
                match (op, expect_bool(Consumer::Logic(op), &value)?) {
                    (LogicOp::And, false) | (LogicOp::Or, true) => {
                        State::ApplyValue { value, cont }
                    }
                    _ => eval(env, right, cont.push(ValueFrame::LogicRight { op })),
                }
            }
            ValueFrame::LogicRight { op } => {
                expect_bool(Consumer::Logic(op), &value)?;
                State::ApplyValue { value, cont }
            }
            ValueFrame::LetBound { id, body, env } => {
                let colored = self.colorer.color(&id);
                eval(
                    env.bind(id, colored.clone()),
                    body,
                    cont.push(ValueFrame::Bind { id: colored, value }),
                )
            }
            ValueFrame::Run => match value {
                // code is fully colored, so it needs no renamings of its own
                Value::Code(code) => eval(RenameEnv::new(), code, cont),
                other => {
                    return Err(MachineError::TypeMismatch {
                        context: Consumer::Run,
                        expected: ValueKind::Code,
                        found: other.kind(),
                    })
                }
            },
        })
    }

    /// Enters `fun`'s body: its collected bindings go back on the continuation (oldest
    /// first), then the fixpoint's self binding, then the freshly colored parameter.
    fn call(&mut self, fun: Value, arg: Value, cont: ValueCont) -> Result<State, MachineError> {
        let Value::Closure(closure) = fun else {
            return Err(MachineError::TypeMismatch {
                context: Consumer::Application,
                expected: ValueKind::Function,
                found: fun.kind(),
            });
        };

        let mut cont = closure.bindings().fold(cont, |cont, (id, value)| {
            cont.push(ValueFrame::Bind {
                id: id.clone(),
                value: value.clone(),
            })
        });
        if let Some(binder) = &closure.recursive {
            cont = cont.push(ValueFrame::Bind {
                id: binder.clone(),
                value: Value::Closure(closure.clone()),
            });
        }
        let param = self.colorer.color(&closure.param);
        let env = closure.env.bind(closure.param.clone(), param.clone());
        Ok(State::Eval {
            env,
            expr: closure.body.clone(),
            cont: Cont::Value(cont.push(ValueFrame::Bind { id: param, value: arg })),
        })
    }

    fn apply_code(
        &mut self,
        level: usize,
        code: Rc<Expr>,
        cont: CodeCont,
    ) -> Result<State, MachineError> {
        let (frame, cont) = match cont.pop() {
            CodeTop::Frame(frame, cont) => (frame, cont),
            CodeTop::CloseQuote(cont) if level == 1 => {
                return Ok(State::ApplyValue {
                    value: Value::Code(code),
                    cont,
                })
            }
            CodeTop::CloseQuote(_) => {
                return Err(MachineError::Unreachable("quote closed above level 1"))
            }
        };
        let eval = |env, expr, cont| State::Eval {
            env,
            expr,
            cont: Cont::Code { level, cont },
        };
        let built = |expr| State::ApplyCode {
            level,
            code: Rc::new(expr),
            cont: cont.clone(),
        };

        Ok(match frame {
            CodeFrame::Lambda { param } => built(Expr::Lambda { param, body: code }),
            CodeFrame::Fix { binder } => built(Expr::Fix { binder, body: code }),
            CodeFrame::AppFun { arg, env } => {
                eval(env, arg, cont.push(CodeFrame::AppArg { fun: code }))
            }
            CodeFrame::AppArg { fun } => built(Expr::App { fun, arg: code }),
            CodeFrame::Prim {
                op,
                mut done,
                args,
                env,
            } => {
                done.push(code);
                match args.get(done.len()) {
                    Some(next) => {
                        let next = next.clone();
                        eval(
                            env.clone(),
                            next,
                            cont.push(CodeFrame::Prim {
                                op,
                                done,
                                args,
                                env,
                            }),
                        )
                    }
                    None => built(Expr::Prim {
                        op,
                        args: Rc::from(done),
                    }),
                }
            }
            CodeFrame::IfCond {
                then,
                otherwise,
                env,
            } => eval(
                env.clone(),
                then,
                cont.push(CodeFrame::IfThen {
                    cond: code,
                    otherwise,
                    env,
                }),
            ),
            CodeFrame::IfThen {
                cond,
                otherwise,
                env,
            } => eval(env, otherwise, cont.push(CodeFrame::IfElse { cond, then: code })),
            CodeFrame::IfElse { cond, then } => built(Expr::If {
                cond,
                then,
                otherwise: code,
            }),
            CodeFrame::LogicLeft { op, right, env } => {
                eval(env, right, cont.push(CodeFrame::LogicRight { op, left: code }))
            }
            CodeFrame::LogicRight { op, left } => built(Expr::Logic {
                op,
                left,
                right: code,
            }),
            CodeFrame::LetBound { id, body, env } => {
                let colored = self.colorer.color(&id);
                eval(
                    env.bind(id, colored.clone()),
                    body,
                    cont.push(CodeFrame::LetBody {
                        id: colored,
                        bound: code,
                    }),
                )
            }
            CodeFrame::LetBody { id, bound } => built(Expr::Let {
                id,
                bound,
                body: code,
            }),
            CodeFrame::Quote if level >= 2 => State::ApplyCode {
                level: level - 1,
                code: Rc::new(Expr::Quote(code)),
                cont: cont.clone(),
            },
            CodeFrame::Quote => {
                return Err(MachineError::Unreachable("nested quote closed at level 1"))
            }
            CodeFrame::Splice { shift } => State::ApplyCode {
                level: level + shift,
                code: Rc::new(Expr::Splice {
                    shift: i64::try_from(shift)
                        .map_err(|_| MachineError::Unreachable("splice shift out of range"))?,
                    body: code,
                }),
                cont: cont.clone(),
            },
        })
    }
}

/// A value leaving the scope of `id`. Closures take the binding along; code that still
/// mentions `id` would outlive it.
fn leave_binding(value: Value, id: Identifier, bound: Value) -> Result<Value, MachineError> {
    match value {
        Value::Closure(closure) => Ok(Value::Closure(Rc::new(closure.capture(id, bound)))),
        Value::Code(code) if code.occurs_free(&id) => {
            debug!(id = %id, "scope extrusion");
            Err(MachineError::ScopeExtrusion(id))
        }
        value => Ok(value),
    }
}

fn expect_bool(context: Consumer, value: &Value) -> Result<bool, MachineError> {
    value.as_bool().ok_or(MachineError::TypeMismatch {
        context,
        expected: ValueKind::Bool,
        found: value.kind(),
    })
}

fn check_arity(op: PrimOp, args: &[Rc<Expr>]) -> Result<(), MachineError> {
    if args.is_empty() {
        Err(MachineError::EmptyPrimitiveArguments(op))
    } else if args.len() != op.arity() {
        Err(MachineError::ArityMismatch {
            op,
            expected: op.arity(),
            found: args.len(),
        })
    } else {
        Ok(())
    }
}

/// The shift as a stage count, if a splice at `level` may cross that many boundaries.
fn check_shift(shift: i64, level: usize) -> Result<usize, MachineError> {
    let invalid = MachineError::InvalidShift { shift, level };
    let stages = usize::try_from(shift).map_err(|_| invalid.clone())?;
    if level == 0 && stages > 0 {
        Err(MachineError::StagingViolation { shift })
    } else if stages > level {
        Err(invalid)
    } else {
        Ok(stages)
    }
}
