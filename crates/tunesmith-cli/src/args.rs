//! Command-line arguments.

use anyhow::{bail, Context, Result};
use tunesmith_core::GenerationRequest;

pub const USAGE: &str = "\
Usage: tunesmith [OPTIONS] <PROMPT>...

Submit one music generation and follow it until it finishes.

Options:
      --tags <A,B,..>     style tags, comma separated
      --mood <MOOD>
      --title <TITLE>
      --lyrics <TEXT>
      --model <VERSION>   overrides TUNESMITH_MODEL
      --skill <TEXT>      skill context appended to the prompt
      --instrumental      no vocals
      --simulate          use the in-process simulated service
      --json              print each state change as a JSON line
  -h, --help              print this help
";

#[derive(Debug, PartialEq)]
pub enum Command {
    Help,
    Generate(Options),
}

#[derive(Debug, PartialEq)]
pub struct Options {
    pub request: GenerationRequest,
    pub simulate: bool,
    pub json: bool,
}

pub fn parse<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut request = GenerationRequest::default();
    let mut words = Vec::new();
    let mut simulate = false;
    let mut json = false;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--simulate" => simulate = true,
            "--json" => json = true,
            "--instrumental" => request.instrumental = true,
            "--tags" => {
                request.tags = value("--tags")?
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "--mood" => request.mood = Some(value("--mood")?),
            "--title" => request.title = Some(value("--title")?),
            "--lyrics" => request.lyrics = Some(value("--lyrics")?),
            "--model" => request.model_version = Some(value("--model")?),
            "--skill" => request.skill_context = Some(value("--skill")?),
            "--" => {
                words.extend(args.by_ref());
                break;
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n\n{USAGE}"),
            other => words.push(other.to_string()),
        }
    }

    if words.is_empty() {
        bail!("a prompt is required\n\n{USAGE}");
    }
    request.prompt = words.join(" ");

    Ok(Command::Generate(Options {
        request,
        simulate,
        json,
    }))
}
