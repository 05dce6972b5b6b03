//! CHTL command line compiler
//!
//! Compiles a `.chtl` file and writes the HTML/CSS/JS artifacts next to
//! it (or to `--out`), printing diagnostics to stderr.
//!
//! Usage:
//!   chtlc <input.chtl> [options]
//!
//! Options:
//!   --out <dir>            Output directory (default: alongside input)
//!   --stdout               Print artifacts to stdout instead of writing
//!   --emit <what>          html, css, js, tokens, ast, or tree
//!   --minify               Minify CSS output
//!   --no-comments          Drop generator comments from the output
//!   --strict               Treat warnings as errors
//!   --stop-on-first-error  Abort on the first diagnostic
//!   -I <path>              Add an import search path (repeatable)

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use chtl::diagnostics::Severity;
use chtl::{CompileOptions, Compiler, DumpFormat};

fn main() -> ExitCode {
    let matches = Command::new("chtlc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("CHTL compiler: produces HTML, CSS, and JavaScript")
        .arg(
            Arg::new("input")
                .help("Input CHTL file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("DIR")
                .help("Output directory (default: alongside the input file)"),
        )
        .arg(
            Arg::new("stdout")
                .long("stdout")
                .help("Print artifacts to stdout instead of writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .value_name("WHAT")
                .help("Emit a single artifact: html, css, js, tokens, ast, tree"),
        )
        .arg(
            Arg::new("minify")
                .long("minify")
                .help("Minify CSS output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-comments")
                .long("no-comments")
                .help("Drop generator comments from the output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Treat warnings as errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stop-on-first-error")
                .long("stop-on-first-error")
                .help("Abort on the first diagnostic")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("include")
                .short('I')
                .value_name("PATH")
                .help("Add an import search path")
                .action(ArgAction::Append),
        )
        .get_matches();

    let input = PathBuf::from(matches.get_one::<String>("input").expect("required"));

    let mut options = CompileOptions::default();
    options.minify_output = matches.get_flag("minify");
    options.preserve_comments = !matches.get_flag("no-comments");
    options.strict_mode = matches.get_flag("strict");
    options.stop_on_first_error = matches.get_flag("stop-on-first-error");
    if let Some(paths) = matches.get_many::<String>("include") {
        options.import_paths = paths.map(PathBuf::from).collect();
    }

    // The debug emits work on the source directly, before full compilation.
    if let Some(emit) = matches.get_one::<String>("emit") {
        if let Ok(format) = emit.parse::<DumpFormat>() {
            return run_dump(&input, format);
        }
    }

    let mut compiler = Compiler::new(options);
    let result = compiler.compile_file(&input);

    print_diagnostics(&result);

    if !result.success {
        return ExitCode::FAILURE;
    }

    let emit = matches.get_one::<String>("emit").map(String::as_str);
    if matches.get_flag("stdout") || emit.is_some() {
        let mut stdout = std::io::stdout();
        let payloads: &[(&str, &str)] = &[
            ("html", &result.html),
            ("css", &result.css),
            ("js", &result.js),
        ];
        for (name, payload) in payloads {
            if emit.map_or(true, |e| e == *name) && !payload.is_empty() {
                let _ = writeln!(stdout, "{}", payload);
            }
        }
        return ExitCode::SUCCESS;
    }

    let out_dir = matches
        .get_one::<String>("out")
        .map(PathBuf::from)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());

    for (extension, payload) in [
        ("html", &result.html),
        ("css", &result.css),
        ("js", &result.js),
    ] {
        if payload.is_empty() {
            continue;
        }
        let path = out_dir.join(format!("{}.{}", stem, extension));
        if let Err(err) = std::fs::write(&path, payload) {
            eprintln!("error: cannot write {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
        eprintln!("wrote {}", path.display());
    }

    ExitCode::SUCCESS
}

fn run_dump(input: &Path, format: DumpFormat) -> ExitCode {
    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", input.display(), err);
            return ExitCode::FAILURE;
        }
    };
    match chtl::dump(&source, format) {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn print_diagnostics(result: &chtl::CompileResult) {
    let choice = if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);

    for diagnostic in result.warnings.iter().chain(result.errors.iter()) {
        let color = match diagnostic.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(stderr, "{}", diagnostic.severity);
        let _ = stderr.reset();
        let _ = writeln!(
            stderr,
            ": {}:{}: [{}] {}",
            diagnostic.position.line,
            diagnostic.position.column,
            diagnostic.phase,
            diagnostic.message
        );
    }
}
