use std::{
    error::Error,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use lispc::{
    ast::Node,
    codegen::TargetCompiler,
    host::{Detached, Host, ProcessHost},
    lexer, reader,
};
use target::{Emit, Target};

mod target;

/// Compiles Lisp source into Ruby or JavaScript.
///
/// Without FILE, starts an interactive session which compiles one form per
/// line and runs it. Macro functions are evaluated by a `ruby` or `node`
/// child process, started when first needed.
#[derive(Parser)]
#[command(name = "lispc", version)]
struct Args {
    /// Language of the emitted fragments.
    #[arg(long, value_enum, default_value_t = Target::Ruby)]
    target: Target,

    /// Stage whose output is printed.
    #[arg(long, value_enum, default_value_t = Emit::Code)]
    emit: Emit,

    /// Source compiled (and run) ahead of FILE or of the interactive session.
    #[arg(long)]
    prelude: Option<PathBuf>,

    /// Interpreter which evaluates macros, instead of `ruby` or `node`.
    #[arg(long, conflicts_with = "detached")]
    interpreter: Option<PathBuf>,

    /// Compile without an interpreter. Defining a macro is then an error.
    #[arg(long)]
    detached: bool,

    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = if args.detached {
        start(&args, &mut Detached)
    } else {
        let target = args.target.into();
        let mut host = match args.interpreter {
            Some(ref program) => ProcessHost::with_program(target, program.as_os_str()),
            None => ProcessHost::new(target),
        };
        start(&args, &mut host)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn start<H: Host>(args: &Args, host: &mut H) -> Result<(), Box<dyn Error>> {
    match args.file {
        Some(ref file) => batch(args, file, host),
        None => repl(args, host),
    }
}

fn read_source(path: &Path) -> Result<String, String> {
    log::debug!("reading {}", path.display());
    fs::read_to_string(path).map_err(|error| format!("failed to read {}: {error}", path.display()))
}

/// Nothing reaches stdout unless every stage succeeds.
fn batch<H: Host>(args: &Args, file: &Path, host: &mut H) -> Result<(), Box<dyn Error>> {
    let mut out = Vec::with_capacity(4096);
    match args.emit {
        Emit::Tokens | Emit::Ast => {
            let mut sources = Vec::with_capacity(2);
            sources.extend(args.prelude.as_deref());
            sources.push(file);
            for path in sources {
                let src = read_source(path)?;
                let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
                if args.emit == Emit::Tokens {
                    lexer::lex(&src, &mut tokens);
                    for token in &tokens {
                        writeln!(out, "{token:?}")?;
                    }
                } else {
                    let forms = reader::read_all(&src, &mut tokens)
                        .map_err(|error| format!("{}:{error:#}", path.display()))?;
                    print_forms(&mut out, &forms)?;
                }
            }
        }
        Emit::Code => {
            let mut compiler = TargetCompiler::new(args.target.into(), host);
            out.extend_from_slice(compiler.prologue().as_bytes());
            if let Some(ref prelude) = args.prelude {
                let src = read_source(prelude)?;
                let fragments = compiler
                    .load(&src)
                    .map_err(|error| format!("{}:{error}", prelude.display()))?;
                for fragment in fragments {
                    writeln!(out, "{fragment}")?;
                }
            }

            let src = read_source(file)?;
            let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
            let forms = reader::read_all(&src, &mut tokens)
                .map_err(|error| format!("{}:{error:#}", file.display()))?;
            compiler
                .emit(&mut out, &forms)
                .map_err(|error| format!("{}:{error}", file.display()))?;
        }
    }

    let mut stdout = io::stdout().lock();
    stdout.write_all(&out)?;
    stdout.flush()?;
    Ok(())
}

fn print_forms(out: &mut impl Write, forms: &[Node]) -> io::Result<()> {
    for form in forms {
        writeln!(out, "{form}")?;
    }
    Ok(())
}

fn repl<H: Host>(args: &Args, host: &mut H) -> Result<(), Box<dyn Error>> {
    let mut compiler = TargetCompiler::new(args.target.into(), host);
    if let Some(ref prelude) = args.prelude {
        let src = read_source(prelude)?;
        let fragments = compiler.load(&src)?;
        log::debug!("prelude emitted {} fragments", fragments.len());
    }

    let mut input = String::new();
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    loop {
        print!("user> ");
        io::stdout().flush()?;

        input.clear();
        let n = io::stdin().read_line(&mut input)?;

        if n == 0 {
            println!("^D");
            return Ok(());
        }

        tokens.clear();
        if args.emit == Emit::Tokens {
            lexer::lex(&input, &mut tokens);
            println!("{tokens:?}");
            continue;
        }

        let node = match reader::read(&input, &mut tokens) {
            Ok(Some(node)) => node,
            Ok(None) => continue,
            Err(error) => {
                println!("error: {error:#}");
                continue;
            }
        };
        if args.emit == Emit::Ast {
            println!("{node}");
            continue;
        }
        match compiler.compile(&node) {
            Ok(Some(fragment)) => {
                println!("{fragment}");
                if let Err(error) = compiler.run(&fragment) {
                    println!("error: {error}");
                }
            }
            Ok(None) => {}
            Err(error) => println!("error: {error}"),
        }
    }
}
