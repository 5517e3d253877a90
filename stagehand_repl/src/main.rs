use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use codesnake::{Block, CodeWidth, Label, LineIndex};
use rustyline::{error::ReadlineError, DefaultEditor};
use stagehand::{
    lexer::{LexerError, Span, Token},
    parse, typecheck, Fuel, Machine, Outcome, State, SyntaxError,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

/// Evaluate programs of the staged lambda calculus.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Evaluate this file and exit instead of starting the prompt
    file: Option<PathBuf>,
    /// Give up after this many machine steps per evaluation
    #[arg(long)]
    fuel: Option<u64>,
    /// Log every machine step to stderr
    #[arg(long)]
    trace: bool,
    /// Also print the static type when the checker accepts the input
    #[arg(long)]
    types: bool,
}

const HELP: &str = "\
:tokens <expr>  show how the input is tokenized
:type <expr>    show the static type of an unstaged expression
:help           show this message
:quit           leave";

fn make_block<'a>(
    idx: &'a LineIndex,
    labels: impl IntoIterator<Item = (Span, Result<Token, LexerError>)>,
) -> Option<Block<&'a str, String>> {
    Block::new(
        idx,
        labels.into_iter().map(|(range, tok)| {
            let text = match &tok {
                Ok(tok) => format!("{tok:?}"),
                Err(err) => err.to_string(),
            };
            Label::new(range)
                .with_text(if tok.is_ok() {
                    text.green().to_string()
                } else {
                    text.red().to_string()
                })
                .with_style(move |s| match tok {
                    Ok(Token::Identifier(_)) => s.blue().to_string(),
                    Ok(Token::Integer(_) | Token::Boolean(_)) => s.yellow().to_string(),
                    Ok(Token::QuoteOpen | Token::Tilde) => s.magenta().to_string(),
                    Ok(_) => s,
                    Err(_) => s.red().to_string(),
                })
        }),
    )
}

fn print_block(name: &str, block: Option<Block<&str, String>>) {
    if let Some(block) = block.map(|blk| blk.map_code(|c| CodeWidth::new(c, c.len()))) {
        println!("{}[{name}]", block.prologue());
        print!("{block}");
        println!("{}", block.epilogue());
    }
}

fn show_tokens(src: &str) {
    let idx = LineIndex::new(src);
    let labels: Vec<_> = Token::lexer(src)
        .spanned()
        .filter(|(_, span)| !span.is_empty())
        .map(|(tok, span)| (span, tok))
        .collect();
    if labels.is_empty() {
        println!("{}", "no tokens".dim());
        return;
    }
    print_block("input", make_block(&idx, labels));
}

/// A label needs at least one character under it; an error at the end of input
/// points at the last one instead.
fn widen(src: &str, range: Span) -> Option<Span> {
    if !range.is_empty() {
        return Some(range);
    }
    if let Some(c) = src.get(range.start..).and_then(|rest| rest.chars().next()) {
        return Some(range.start..range.start + c.len_utf8());
    }
    let c = src.get(..range.start)?.chars().next_back()?;
    Some(range.start - c.len_utf8()..range.start)
}

fn report_syntax_error(name: &str, src: &str, error: &SyntaxError) {
    println!("{} {error}", "syntax error:".red().bold());
    let Some(range) = widen(src, error.range.clone()) else {
        return;
    };
    let idx = LineIndex::new(src);
    let label = Label::new(range)
        .with_text(error.message.clone().red().to_string())
        .with_style(|s| s.red().to_string());
    print_block(name, Block::new(&idx, [label]));
}

/// Parses and runs `src`, printing the outcome. Returns whether it produced a value.
fn evaluate_source(cli: &Cli, name: &str, src: &str) -> bool {
    let expr = match parse(src) {
        Ok(expr) => expr,
        Err(error) => {
            report_syntax_error(name, src, &error);
            return false;
        }
    };

    if cli.types && expr.is_staged() {
        debug!("staged input has no static type");
    } else if cli.types {
        match typecheck::check(&expr) {
            Ok(ty) => println!("{} {ty}", "type:".dim()),
            Err(error) => debug!(%error, "no static type"),
        }
    }

    let mut machine = Machine::new();
    let mut fuel = cli.fuel.map_or_else(Fuel::unbounded, Fuel::with);
    match machine.run_with_fuel(State::initial(expr), &mut fuel) {
        Ok(Outcome::Finished(value)) => {
            println!("{value}");
            true
        }
        Ok(Outcome::Suspended(state)) => {
            println!(
                "{} out of fuel after {} steps, stopped at level {} with {} frames pending",
                "note:".yellow().bold(),
                machine.steps(),
                state.level(),
                state.depth()
            );
            false
        }
        Err(error) => {
            println!("{} {error}", "error:".red().bold());
            false
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.trace { "stagehand=trace" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &cli.file {
        let src = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let name = path.display().to_string();
        debug!(file = %name, "evaluating file");
        if !evaluate_source(&cli, &name, &src) {
            anyhow::bail!("evaluating {name} failed");
        }
        return Ok(());
    }

    let mut readline = DefaultEditor::new()?;
    loop {
        let input = match readline.readline(">> ") {
            Ok(input) => input,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        readline.add_history_entry(input)?;

        if input == ":quit" || input == ":q" {
            break;
        } else if input == ":help" {
            println!("{HELP}");
        } else if let Some(rest) = input.strip_prefix(":tokens") {
            show_tokens(rest.trim());
        } else if let Some(rest) = input.strip_prefix(":type") {
            let src = rest.trim();
            match parse(src) {
                Ok(expr) => match typecheck::check(&expr) {
                    Ok(ty) => println!("{ty}"),
                    Err(error) => println!("{} {error}", "type error:".red().bold()),
                },
                Err(error) => report_syntax_error("input", src, &error),
            }
        } else if input.starts_with(':') {
            println!("unknown command, try :help");
        } else {
            evaluate_source(&cli, "input", input);
        }
    }

    Ok(())
}
