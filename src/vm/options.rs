use std::{ffi::OsString, str::FromStr};

use crate::callconv::{ARGS_IN_REGISTERS, CALL_ARGUMENTS_LIMIT};

use super::values::MULTIPLE_VALUES_LIMIT;

pub const USAGE: &str = "\
Usage: lcc-bench [options]
Options:
  -h, --help: Print this help message
  --nargs <n>: Arguments passed per call (default: 5)
  --iterations <n>: Calls to perform (default: 1000000)
  --path <path>: auto, fast, general or frame (default: auto)
  --values <n>: Values returned per call (default: 2)";

pub struct BenchOptions {
    pub nargs: usize,
    pub iterations: u64,
    pub path: CallPath,
    pub values: usize,
    pub help: bool,
}

impl BenchOptions {
    pub fn new() -> Self {
        BenchOptions {
            nargs: 5,
            iterations: 1_000_000,
            path: CallPath::Auto,
            values: 2,
            help: false,
        }
    }

    /// Parses the process arguments. `--help` prints the usage and exits.
    pub fn parse() -> Result<Self, String> {
        let options = parse_from(pico_args::Arguments::from_env())?;
        if options.help {
            println!("{}", USAGE);
            std::process::exit(0);
        }
        Ok(options)
    }

    pub fn parse_vec(args: Vec<OsString>) -> Result<Self, String> {
        parse_from(pico_args::Arguments::from_vec(args))
    }
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPath {
    /// Whatever the dispatcher picks for the argument count.
    Auto,
    /// Fixed-arity fast path; only valid for up to three arguments.
    Fast,
    /// Cursor path regardless of the argument count.
    General,
    /// Arguments materialized in a frame.
    Frame,
}

impl AsRef<str> for CallPath {
    fn as_ref(&self) -> &str {
        match self {
            CallPath::Auto => "auto",
            CallPath::Fast => "fast",
            CallPath::General => "general",
            CallPath::Frame => "frame",
        }
    }
}

impl FromStr for CallPath {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        let s: &str = &s;

        match s {
            "auto" => Ok(CallPath::Auto),
            "fast" => Ok(CallPath::Fast),
            "general" => Ok(CallPath::General),
            "frame" => Ok(CallPath::Frame),
            _ => Err("Invalid call path"),
        }
    }
}

pub fn parse_from(mut args: pico_args::Arguments) -> Result<BenchOptions, String> {
    let mut options = BenchOptions::new();

    if args.contains(["-h", "--help"]) {
        options.help = true;
        return Ok(options);
    }

    match args.opt_value_from_str::<_, usize>("--nargs") {
        Ok(Some(nargs)) => options.nargs = nargs,
        Ok(None) => (),
        Err(e) => return Err(e.to_string()),
    }

    match args.opt_value_from_str::<_, u64>("--iterations") {
        Ok(Some(iterations)) => options.iterations = iterations,
        Ok(None) => (),
        Err(e) => return Err(e.to_string()),
    }

    match args.opt_value_from_str::<_, CallPath>("--path") {
        Ok(Some(path)) => options.path = path,
        Ok(None) => (),
        Err(e) => return Err(e.to_string()),
    }

    match args.opt_value_from_str::<_, usize>("--values") {
        Ok(Some(values)) => options.values = values,
        Ok(None) => (),
        Err(e) => return Err(e.to_string()),
    }

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(format!("unexpected arguments: {:?}", rest));
    }

    if options.nargs > CALL_ARGUMENTS_LIMIT {
        return Err(format!(
            "--nargs {} exceeds the call limit of {}",
            options.nargs, CALL_ARGUMENTS_LIMIT
        ));
    }

    if options.path == CallPath::Fast && options.nargs > ARGS_IN_REGISTERS {
        return Err(format!(
            "the fast path takes at most {} arguments, got {}",
            ARGS_IN_REGISTERS, options.nargs
        ));
    }

    if !(2..=MULTIPLE_VALUES_LIMIT).contains(&options.values) {
        return Err(format!(
            "--values must be between 2 and {}",
            MULTIPLE_VALUES_LIMIT
        ));
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<BenchOptions, String> {
        BenchOptions::parse_vec(args.iter().map(OsString::from).collect())
    }

    #[test]
    fn defaults() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.nargs, 5);
        assert_eq!(options.iterations, 1_000_000);
        assert_eq!(options.path, CallPath::Auto);
        assert_eq!(options.values, 2);
        assert!(!options.help);
    }

    #[test]
    fn explicit_values() {
        let options = parse(&[
            "--nargs", "2", "--iterations", "10", "--path", "FAST", "--values", "4",
        ])
        .unwrap();
        assert_eq!(options.nargs, 2);
        assert_eq!(options.iterations, 10);
        assert_eq!(options.path, CallPath::Fast);
        assert_eq!(options.values, 4);
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["-h", "--nargs", "junk"]).unwrap().help);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--path", "sideways"]).is_err());
        assert!(parse(&["--nargs", "many"]).is_err());
        assert!(parse(&["--nargs", "4", "--path", "fast"]).is_err());
        assert!(parse(&["--nargs", "65"]).is_err());
        assert!(parse(&["--values", "1"]).is_err());
        assert!(parse(&["stray"]).is_err());
    }
}
