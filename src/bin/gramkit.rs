//! Command-line interface for gramkit
//! Runs the bundled demo grammars as a REPL or against a one-shot source
//! string, optionally dumping parse trees instead of evaluating.
//!
//! Usage:
//!   gramkit [--grammar `<math|simple>`] [--dump-tree] [`<source>`]

use std::io::{self, BufRead, Write};

use clap::{Arg, ArgAction, Command};
use gramkit::gramkit::demos::{math_engine, simplelang_engine, Output};
use gramkit::{Engine, Input, Session};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn main() {
    let matches = Command::new("gramkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run the bundled demo grammars")
        .arg(
            Arg::new("grammar")
                .long("grammar")
                .short('g')
                .help("Which demo grammar to load ('math' or 'simple')")
                .default_value("math"),
        )
        .arg(
            Arg::new("dump-tree")
                .long("dump-tree")
                .help("Print the parse tree as JSON instead of evaluating")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("source")
                .help("Source to run once; omit for an interactive session")
                .index(1),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let grammar = matches
        .get_one::<String>("grammar")
        .map(String::as_str)
        .unwrap_or("math");
    let built = match grammar {
        "math" => math_engine(),
        "simple" => simplelang_engine(),
        other => {
            eprintln!("Error: unknown grammar {:?} (expected 'math' or 'simple')", other);
            std::process::exit(2);
        }
    };
    let (engine, output) = match built {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let dump_tree = matches.get_flag("dump-tree");
    match matches.get_one::<String>("source") {
        Some(source) => {
            let mut session = Session::new();
            if !run_line(&engine, &output, &mut session, source, dump_tree) {
                std::process::exit(1);
            }
        }
        None => repl(&engine, &output, dump_tree),
    }
}

fn repl(engine: &Engine, output: &Output, dump_tree: bool) {
    let stdin = io::stdin();
    let mut session = Session::new();
    print_prompt();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed == "exit" {
            break;
        }
        if !trimmed.is_empty() {
            run_line(engine, output, &mut session, trimmed, dump_tree);
        }
        print_prompt();
    }
}

fn print_prompt() {
    print!("gramkit > ");
    let _ = io::stdout().flush();
}

/// Run one input; reports errors and returns whether it succeeded.
fn run_line(
    engine: &Engine,
    output: &Output,
    session: &mut Session,
    source: &str,
    dump_tree: bool,
) -> bool {
    if dump_tree {
        return dump_parse_tree(engine, source);
    }
    match engine.interpret(Input::Text(source), session) {
        Ok(value) => {
            for line in output.drain() {
                println!("{}", line);
            }
            if !value.is_unit() {
                println!("{}", value);
            }
            true
        }
        Err(e) => {
            for line in output.drain() {
                println!("{}", line);
            }
            eprintln!("Error: {}", e);
            false
        }
    }
}

fn dump_parse_tree(engine: &Engine, source: &str) -> bool {
    let result = engine
        .tokenize(source)
        .map_err(gramkit::EngineError::from)
        .and_then(|tokens| {
            let start = engine
                .select_start(&tokens)
                .ok_or(gramkit::EngineError::NoStartRule)?;
            engine.parse(&tokens, &start)
        });
    match result {
        Ok(tree) => match serde_json::to_string_pretty(&tree) {
            Ok(json) => {
                println!("{}", json);
                true
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                false
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}
