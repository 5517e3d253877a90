//! A static type checker for unstaged expressions
//!
//! Monomorphic inference by unification. It knows nothing about stages: any quote or
//! splice is rejected outright. The machine never consults it.
use core::fmt;
use std::rc::Rc;

use im_rc::HashMap;

use crate::{
    expr::{BaseType, Expr, PrimOp},
    ident::Identifier,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Fun(Rc<Type>, Rc<Type>),
    /// An inference variable. Only unsolved ones appear in a finished type.
    Var(u32),
}

impl From<BaseType> for Type {
    fn from(value: BaseType) -> Self {
        match value {
            BaseType::Int => Self::Int,
            BaseType::Bool => Self::Bool,
        }
    }
}

impl Type {
    fn fun(param: Type, result: Type) -> Self {
        Self::Fun(Rc::new(param), Rc::new(result))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::Fun(param, result) if matches!(**param, Self::Fun(..)) => {
                write!(f, "({param}) -> {result}")
            }
            Self::Fun(param, result) => write!(f, "{param} -> {result}"),
            Self::Var(id) => write!(f, "'t{id}"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch { expected: Type, found: Type },
    #[error("unbound variable `{0}`")]
    Unbound(Identifier),
    #[error("infinite type: 't{var} occurs in {ty}")]
    Infinite { var: u32, ty: Type },
    #[error("quotes and splices cannot be type checked")]
    Staged,
    #[error("the body of `fix {0}` must be a function")]
    MalformedFixpoint(Identifier),
    #[error("`{op}` takes {expected} operand(s), found {found}")]
    Arity {
        op: PrimOp,
        expected: usize,
        found: usize,
    },
}

/// Infers the type of a closed, unstaged expression.
pub fn check(expr: &Expr) -> Result<Type, TypeError> {
    let mut checker = Checker::default();
    let ty = checker.infer(&HashMap::new(), expr)?;
    Ok(checker.zonk(&ty))
}

#[derive(Debug, Default)]
struct Checker {
    /// Solutions for inference variables, indexed by id.
    solved: Vec<Option<Type>>,
}

impl Checker {
    fn fresh(&mut self) -> Type {
        let id = self.solved.len() as u32;
        self.solved.push(None);
        Type::Var(id)
    }

    /// Follows solved variables until reaching a constructor or an unsolved one.
    fn resolve(&self, ty: &Type) -> Type {
        let mut ty = ty.clone();
        while let Type::Var(id) = ty {
            match self.solved.get(id as usize).and_then(Option::as_ref) {
                Some(solution) => ty = solution.clone(),
                None => break,
            }
        }
        ty
    }

    /// Fully substitutes solved variables.
    fn zonk(&self, ty: &Type) -> Type {
        match self.resolve(ty) {
            Type::Fun(param, result) => Type::fun(self.zonk(&param), self.zonk(&result)),
            ty => ty,
        }
    }

    fn occurs(&self, var: u32, ty: &Type) -> bool {
        match self.resolve(ty) {
            Type::Var(id) => id == var,
            Type::Fun(param, result) => self.occurs(var, &param) || self.occurs(var, &result),
            Type::Int | Type::Bool => false,
        }
    }

    fn unify(&mut self, expected: &Type, found: &Type) -> Result<(), TypeError> {
        let expected = self.resolve(expected);
        let found = self.resolve(found);
        match (&expected, &found) {
            (Type::Int, Type::Int) | (Type::Bool, Type::Bool) => Ok(()),
            (Type::Var(a), Type::Var(b)) if a == b => Ok(()),
            (Type::Var(var), other) | (other, Type::Var(var)) => {
                if self.occurs(*var, other) {
                    return Err(TypeError::Infinite {
                        var: *var,
                        ty: self.zonk(other),
                    });
                }
                self.solved[*var as usize] = Some(other.clone());
                Ok(())
            }
            (Type::Fun(p1, r1), Type::Fun(p2, r2)) => {
                self.unify(p1, p2)?;
                self.unify(r1, r2)
            }
            _ => Err(TypeError::Mismatch {
                expected: self.zonk(&expected),
                found: self.zonk(&found),
            }),
        }
    }

    fn infer(&mut self, env: &HashMap<Identifier, Type>, expr: &Expr) -> Result<Type, TypeError> {
        match expr {
            Expr::Var(id) => env
                .get(id)
                .cloned()
                .ok_or_else(|| TypeError::Unbound(id.clone())),
            Expr::Int(_) => Ok(Type::Int),
            Expr::Bool(_) => Ok(Type::Bool),
            Expr::Lambda { param, body } => {
                let param_ty = self.fresh();
                let body_ty = self.infer(&env.update(param.clone(), param_ty.clone()), body)?;
                Ok(Type::fun(param_ty, body_ty))
            }
            Expr::App { fun, arg } => {
                let fun_ty = self.infer(env, fun)?;
                let arg_ty = self.infer(env, arg)?;
                let result = self.fresh();
                self.unify(&fun_ty, &Type::fun(arg_ty, result.clone()))?;
                Ok(result)
            }
            Expr::Prim { op, args } => {
                let (kinds, result) = op.signature();
                if args.len() != kinds.len() {
                    return Err(TypeError::Arity {
                        op: *op,
                        expected: kinds.len(),
                        found: args.len(),
                    });
                }
                for (arg, kind) in args.iter().zip(kinds) {
                    let ty = self.infer(env, arg)?;
                    self.unify(&Type::from(*kind), &ty)?;
                }
                Ok(Type::from(result))
            }
            Expr::Logic { left, right, .. } => {
                for operand in [left, right] {
                    let ty = self.infer(env, operand)?;
                    self.unify(&Type::Bool, &ty)?;
                }
                Ok(Type::Bool)
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                let cond_ty = self.infer(env, cond)?;
                self.unify(&Type::Bool, &cond_ty)?;
                let then_ty = self.infer(env, then)?;
                let otherwise_ty = self.infer(env, otherwise)?;
                self.unify(&then_ty, &otherwise_ty)?;
                Ok(then_ty)
            }
            Expr::Fix { binder, body } => {
                if !matches!(**body, Expr::Lambda { .. }) {
                    return Err(TypeError::MalformedFixpoint(binder.clone()));
                }
                let itself = self.fresh();
                let body_ty = self.infer(&env.update(binder.clone(), itself.clone()), body)?;
                self.unify(&itself, &body_ty)?;
                Ok(body_ty)
            }
            Expr::Let { id, bound, body } => {
                let bound_ty = self.infer(env, bound)?;
                self.infer(&env.update(id.clone(), bound_ty), body)
            }
            Expr::Quote(_) | Expr::Splice { .. } => Err(TypeError::Staged),
        }
    }
}
