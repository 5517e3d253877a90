pub mod expr;
pub mod ident;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod typecheck;

pub use expr::{BaseType, Expr, LogicOp, PrimOp};
pub use ident::{Colorer, Identifier};
pub use machine::{
    evaluate, fuel::Fuel, init_state, value::Value, Machine, MachineError, Outcome, State,
};
pub use parser::{parse, SyntaxError};
