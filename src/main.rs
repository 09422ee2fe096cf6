mod logger;
mod pipeline;
mod redirect;
mod signal;
mod tokenize;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

use anyhow::Result;

use logger::AuditLog;
use tokenize::{parse_line, split_words};

const EXIT_USAGE: i32 = 2;

const BANNER: &str = "pipesh 0.1.0 (type 'help' for usage)";

const HELP: &str = "\
pipesh, an interactive pipeline shell
Internal commands: 'cd [dir]', 'help', ':q'
Pipelines run up to 20 processes: 'ls -la | grep name | wc -l'
Redirections: 'ls > file', 'sort < file'
Both mix: 'ls -la | grep name > results.txt'
";

fn main() -> Result<()> {
    // No flags, no operands; anything else is a usage error.
    if env::args().count() != 1 {
        eprintln!("pipesh takes no arguments\nusage: pipesh");
        process::exit(EXIT_USAGE);
    }
    signal::install_handlers()?;

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        println!("{BANNER}");
    }

    let log = AuditLog::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        signal::reset();
        if interactive {
            prompt();
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("read error: {e}");
                break;
            }
        }
        // A notice arrived while the line was being typed: drop the line
        // and prompt again rather than executing it.
        if signal::poll() {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !dispatch(line, &log) {
            break;
        }
    }
    if interactive {
        println!("BYE");
    }
    Ok(())
}

fn prompt() {
    let cwd = env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| String::from("?"));
    print!("\x1b[32mpipesh\x1b[0m \x1b[34m{cwd}\x1b[0m $ ");
    let _ = io::stdout().flush();
}

/// Routes one input line. Returns false when the loop should end.
fn dispatch(line: &str, log: &AuditLog) -> bool {
    if line.contains('|') || line.contains('<') || line.contains('>') {
        run_engine(line, log);
        return true;
    }
    let words = split_words(line);
    match words[0].as_str() {
        ":q" => return false,
        "cd" => run_cd(&words),
        "help" => print!("{HELP}"),
        _ => run_engine(line, log),
    }
    true
}

fn run_engine(line: &str, log: &AuditLog) {
    match parse_line(line) {
        Ok(stages) => {
            if let Err(e) = pipeline::run(&stages, log) {
                eprintln!("{e}");
            }
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn run_cd(words: &[String]) {
    if words.len() > 2 {
        eprintln!("cd: too many arguments");
        return;
    }
    let target = words.get(1).map(String::as_str).unwrap_or("/");
    if env::set_current_dir(Path::new(target)).is_err() {
        eprintln!("{target}: no such directory");
    }
}
