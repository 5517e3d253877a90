use std::rc::Rc;

use arbitrary::{Result, Unstructured};
use arbtest::arbtest;
use assert2::{check, let_assert};
use stagehand::{
    evaluate, parse,
    typecheck::{check as type_of, Type},
    Expr, Identifier, LogicOp, Machine, MachineError, PrimOp, State, Value,
};

const NAMES: [&str; 3] = ["a", "b", "c"];

/// A closed, unstaged expression no deeper than `depth`. Functions only appear applied,
/// so every well-typed result is an integer or a boolean.
fn gen_expr(u: &mut Unstructured, depth: u32, scope: &mut Vec<&'static str>) -> Result<Rc<Expr>> {
    if depth == 0 {
        return gen_leaf(u, scope);
    }
    Ok(match u.int_in_range(0..=6)? {
        0 => gen_leaf(u, scope)?,
        1 => {
            let op: PrimOp = u.arbitrary()?;
            let args = (0..op.arity())
                .map(|_| gen_expr(u, depth - 1, scope))
                .collect::<Result<Vec<_>>>()?;
            Expr::prim(op, args)
        }
        2 => {
            let op: LogicOp = u.arbitrary()?;
            Expr::logic(op, gen_expr(u, depth - 1, scope)?, gen_expr(u, depth - 1, scope)?)
        }
        3 => Expr::if_(
            gen_expr(u, depth - 1, scope)?,
            gen_expr(u, depth - 1, scope)?,
            gen_expr(u, depth - 1, scope)?,
        ),
        4 => {
            let name = *u.choose(&NAMES)?;
            let bound = gen_expr(u, depth - 1, scope)?;
            scope.push(name);
            let body = gen_expr(u, depth - 1, scope);
            scope.pop();
            Expr::let_(name, bound, body?)
        }
        _ => {
            let name = *u.choose(&NAMES)?;
            let arg = gen_expr(u, depth - 1, scope)?;
            scope.push(name);
            let body = gen_expr(u, depth - 1, scope);
            scope.pop();
            Expr::app(Expr::lambda(name, body?), arg)
        }
    })
}

fn gen_leaf(u: &mut Unstructured, scope: &[&'static str]) -> Result<Rc<Expr>> {
    Ok(match u.int_in_range(0..=2)? {
        0 if !scope.is_empty() => Expr::var(*u.choose(scope)?),
        // negative literals print as `0 - n`, so keep them out of the generator
        0 | 1 => Expr::int(u.int_in_range(0..=9)?),
        _ => Expr::bool(u.arbitrary()?),
    })
}

#[test]
fn well_typed_programs_agree_with_the_checker() {
    arbtest(|u| {
        let expr = gen_expr(u, 4, &mut Vec::new())?;
        match (type_of(&expr), evaluate(expr.clone())) {
            (Err(_), _) => {}
            (Ok(_), Err(MachineError::DivisionByZero(_) | MachineError::Overflow(_))) => {}
            (Ok(ty), result) => {
                let agrees = matches!(
                    (&ty, &result),
                    (Type::Int, Ok(Value::Int(_))) | (Type::Bool, Ok(Value::Bool(_)))
                );
                check!(agrees, "{expr} : {ty} evaluated to {result:?}");
            }
        }
        Ok(())
    });
}

#[test]
fn quoting_then_running_changes_nothing() {
    arbtest(|u| {
        let expr = gen_expr(u, 4, &mut Vec::new())?;
        let direct = evaluate(expr.clone());
        let staged = evaluate(Expr::splice(0, Expr::quote(expr.clone())));
        check!(direct == staged, "{expr}");
        Ok(())
    });
}

#[test]
fn generated_programs_reparse() {
    arbtest(|u| {
        let expr = gen_expr(u, 4, &mut Vec::new())?;
        let_assert!(Ok(reparsed) = parse(&expr.to_string()));
        check!(reparsed == expr);
        Ok(())
    });
}

#[test]
fn replay_after_reset_is_deterministic() {
    let programs = [
        "`{ fn x -> fn y -> x + y }",
        "let power = fix p -> fn n -> fn x -> if n == 0 then `{ 1 } else `{ ~{x} * ~{ p (n - 1) x } } in `{ fn y -> ~{ power 3 `{ y } } }",
        "`{ let a = 1 in `{ fn b -> ~{ `{ a + b } } } }",
    ];
    for source in programs {
        let_assert!(Ok(expr) = parse(source));
        let mut machine = Machine::new();
        let_assert!(Ok(first) = machine.run(State::initial(expr.clone())));
        machine.reset_colors();
        let_assert!(Ok(second) = machine.run(State::initial(expr)));
        check!(first == second, "{source}");
    }
}

#[test]
fn colorings_in_one_run_never_collide() {
    let_assert!(Ok(expr) = parse("`{ fn x -> fn x -> let x = x in x }"));
    let_assert!(Ok(Value::Code(code)) = evaluate(expr));
    let mut binders = Vec::new();
    let mut node: &Expr = &code;
    loop {
        match node {
            Expr::Lambda { param, body } => {
                binders.push(param.clone());
                node = &**body;
            }
            Expr::Let { id, body, .. } => {
                binders.push(id.clone());
                node = &**body;
            }
            _ => break,
        }
    }
    check!(binders.len() == 3);
    check!(binders.iter().all(|id| id.base_name() == "x" && !id.is_raw()));
    check!(binders[0] != binders[1]);
    check!(binders[1] != binders[2]);
    check!(binders[0] != binders[2]);
    check!(*node == Expr::Var(binders[2].clone()));
    check!(binders.iter().all(|id| matches!(id, Identifier::Colored(..))));
}
