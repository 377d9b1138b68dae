//! REPL command parsing

use anyhow::{bail, Context, Result};

pub(crate) const HELP: &str = "\
Commands:
  generate <concept>   build a new mind map
  expand <row>         show (and fetch) a node's sub-concepts
  collapse <row>       hide a node's sub-concepts
  explain <row>        open the explanation for a node
  close                close the explanation
  show                 print the outline again
  help                 this text
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Generate(String),
    Expand(usize),
    Collapse(usize),
    Explain(usize),
    Close,
    Show,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub(crate) fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word.to_ascii_lowercase().as_str() {
        "generate" | "g" => Command::Generate(rest.to_string()),
        "expand" | "e" => Command::Expand(row(word, rest)?),
        "collapse" | "c" => Command::Collapse(row(word, rest)?),
        "explain" | "x" => Command::Explain(row(word, rest)?),
        "close" => Command::Close,
        "show" | "ls" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}' (try 'help')"),
    };
    Ok(Some(command))
}

fn row(word: &str, arg: &str) -> Result<usize> {
    if arg.is_empty() {
        bail!("'{word}' needs a row number");
    }
    arg.parse()
        .with_context(|| format!("'{arg}' is not a row number"))
}
