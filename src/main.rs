// rucfront: front end of the RuC compiler

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use crossterm::style::Stylize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rucfront::{compile, FrontendOptions};

struct Args {
    file: String,
    dump_tree: bool,
    options: FrontendOptions,
}

fn usage(program_name: &str) {
    eprintln!("Usage: {} [options] <file.c>", program_name);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --dump-tree       Print the checked syntax tree");
    eprintln!("  --no-main         Do not require a definition of main");
    eprintln!("  --max-errors N    Stop after N errors");
    eprintln!("  --no-warnings     Do not report warnings");
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut file = None;
    let mut dump_tree = false;
    let mut options = FrontendOptions::default();

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--dump-tree" => dump_tree = true,
            "--no-main" => options.require_main = false,
            "--no-warnings" => options.warnings = false,
            "--max-errors" => {
                let value = rest
                    .next()
                    .ok_or_else(|| "--max-errors needs a number".to_string())?;
                let limit = value
                    .parse()
                    .map_err(|_| format!("invalid error limit '{}'", value))?;
                options.max_errors = Some(limit);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            path => {
                if file.replace(path.to_string()).is_some() {
                    return Err("more than one input file".to_string());
                }
            }
        }
    }

    let file = file.ok_or_else(|| "no input file provided".to_string())?;
    Ok(Args {
        file,
        dump_tree,
        options,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("rucfront");

    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            eprintln!();
            usage(program_name);
            return ExitCode::FAILURE;
        }
    };

    if !Path::new(&args.file).exists() {
        eprintln!("{} file '{}' not found", "error:".red().bold(), args.file);
        return ExitCode::FAILURE;
    }
    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{} cannot read '{}': {}", "error:".red().bold(), args.file, e);
            return ExitCode::FAILURE;
        }
    };

    let module = match compile(&source, &args.options) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("{}: {} {}", args.file, "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    for warning in module.warnings() {
        eprintln!("{}: {} {}", args.file, "warning:".yellow().bold(), warning);
    }
    for error in module.errors() {
        eprintln!("{}: {} {}", args.file, "error:".red().bold(), error);
    }

    if args.dump_tree {
        print!("{}", module.dump());
    }

    if module.had_errors() {
        eprintln!(
            "{} error(s) in {}",
            module.errors().len().to_string().red(),
            args.file
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("rucfront")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(&args(&["--dump-tree", "--max-errors", "3", "prog.c"])).unwrap();
        assert_eq!(parsed.file, "prog.c");
        assert!(parsed.dump_tree);
        assert_eq!(parsed.options.max_errors, Some(3));
        assert!(parsed.options.require_main);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--max-errors", "many", "a.c"])).is_err());
        assert!(parse_args(&args(&["--verbose", "a.c"])).is_err());
        assert!(parse_args(&args(&["a.c", "b.c"])).is_err());
    }
}
