use std::{
    cell::RefCell,
    ffi::{OsStr, OsString},
    io::{self, BufRead, BufReader, Write},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    rc::Rc,
};

use crate::{
    ast::Node,
    codegen::{
        env::{Env, JavaScript, Ruby},
        Target,
    },
    host::{Host, HostError},
    macros::Macro,
    printer::quote_string,
    reader,
};

/// A host backed by a `ruby` or `node` child process.
///
/// The interpreter is started on the first request and runs a small driver
/// which reads one request per line from its stdin and answers with one
/// reply per line on its stdout. Output of the evaluated code goes to the
/// inherited stderr.
///
/// Requests are JSON arrays `[command, name, code]` where `command` is one of
/// `macro`, `expand` or `run`. Replies are `ok`, `ok <s-expression>` or
/// `error <json string>`.
pub struct ProcessHost {
    target: Target,
    program: OsString,
    session: Option<Rc<RefCell<Session>>>,
}

impl ProcessHost {
    /// Uses the interpreter of `target` found on the `PATH`.
    pub fn new(target: Target) -> ProcessHost {
        Self::with_program(target, interpreter(target))
    }

    pub fn with_program(target: Target, program: impl Into<OsString>) -> ProcessHost {
        ProcessHost {
            target,
            program: program.into(),
            session: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    fn session(&mut self) -> Result<Rc<RefCell<Session>>, HostError> {
        if let Some(session) = &self.session {
            return Ok(Rc::clone(session));
        }
        let mut session = Session::spawn(&self.program, driver(self.target)).map_err(|error| {
            let program = self.program.to_string_lossy();
            HostError::Process(format!("failed to start `{program}`: {error}"))
        })?;
        session.request("run", "", prologue(self.target))?;
        let session = Rc::new(RefCell::new(session));
        self.session = Some(Rc::clone(&session));
        Ok(session)
    }
}

impl Host for ProcessHost {
    fn eval_macro(&mut self, name: &str, fragment: &str) -> Result<Macro, HostError> {
        let session = self.session()?;
        session.borrow_mut().request("macro", name, fragment)?;

        let name = name.to_string();
        let literal = literal_fn(self.target);
        Ok(Macro::new(move |args| {
            let args: Vec<_> = args.iter().map(literal).collect();
            let args = format!("[{}]", args.join(", "));
            let reply = session.borrow_mut().request("expand", &name, &args)?;
            reply.ok_or_else(|| HostError::Process(format!("macro `{name}` returned no form")))
        }))
    }

    fn run(&mut self, fragment: &str) -> Result<(), HostError> {
        self.session()?.borrow_mut().request("run", "", fragment)?;
        Ok(())
    }
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl Session {
    fn spawn(program: &OsStr, driver: &str) -> io::Result<Session> {
        let mut child = Command::new(program)
            .arg("-e")
            .arg(driver)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            _ = child.kill();
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "missing stdio pipes"));
        };
        log::debug!("started interpreter (pid {})", child.id());
        Ok(Session {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::with_capacity(256),
        })
    }

    fn request(&mut self, command: &str, name: &str, code: &str) -> Result<Option<Node>, HostError> {
        log::trace!("{command} request for `{name}`");
        let lost = |error: io::Error| HostError::Process(format!("lost the interpreter: {error}"));
        writeln!(self.stdin, "{}", request_line(command, name, code)).map_err(lost)?;
        self.stdin.flush().map_err(lost)?;

        self.line.clear();
        if self.stdout.read_line(&mut self.line).map_err(lost)? == 0 {
            return Err(HostError::Process("the interpreter exited".into()));
        }
        parse_reply(self.line.trim_end())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        _ = self.child.kill();
        _ = self.child.wait();
    }
}

fn request_line(command: &str, name: &str, code: &str) -> String {
    format!(
        "[{}, {}, {}]",
        quote_string(command),
        quote_string(name),
        quote_string(code)
    )
}

fn parse_reply(line: &str) -> Result<Option<Node>, HostError> {
    let malformed = || HostError::Process(format!("malformed reply `{line}`"));
    let (status, payload) = line.split_once(' ').unwrap_or((line, ""));
    let payload = reader::read(payload, &mut Vec::new()).map_err(|_| malformed())?;
    match (status, payload) {
        ("ok", form) => Ok(form),
        ("error", Some(Node::String(message))) => Err(HostError::Raised(message.into())),
        _ => Err(malformed()),
    }
}

fn interpreter(target: Target) -> &'static str {
    match target {
        Target::ruby => "ruby",
        Target::javascript => "node",
    }
}

fn prologue(target: Target) -> &'static str {
    match target {
        Target::ruby => Ruby::PROLOGUE,
        Target::javascript => JavaScript::PROLOGUE,
    }
}

fn literal_fn(target: Target) -> fn(&Node) -> String {
    match target {
        Target::ruby => Ruby::literal,
        Target::javascript => JavaScript::literal,
    }
}

fn driver(target: Target) -> &'static str {
    match target {
        Target::ruby => RUBY_DRIVER,
        Target::javascript => NODE_DRIVER,
    }
}

const RUBY_DRIVER: &str = r#"
require "json"

LISPC_OUT = $stdout.dup
$stdout = $stderr
LISPC_MACROS = {}

def lispc_session
  binding
end
LISPC_SESSION = lispc_session

def lispc_sexp(value)
  case value
  when Array then "(" + value.map { |item| lispc_sexp(item) }.join(" ") + ")"
  when Symbol then value.to_s
  when String then JSON.generate(value)
  when nil then "nil"
  else value.inspect
  end
end

def lispc_reply(line)
  LISPC_OUT.puts(line)
  LISPC_OUT.flush
end

while (line = $stdin.gets)
  command, name, code = JSON.parse(line)
  begin
    case command
    when "macro"
      LISPC_MACROS[name] = LISPC_SESSION.eval(code)
      lispc_reply("ok")
    when "expand"
      args = LISPC_SESSION.eval(code)
      lispc_reply("ok " + lispc_sexp(LISPC_MACROS.fetch(name).call(*args)))
    else
      LISPC_SESSION.eval(code)
      lispc_reply("ok")
    end
  rescue StandardError, ScriptError => e
    lispc_reply("error " + JSON.generate(e.message))
  end
end
"#;

const NODE_DRIVER: &str = r#"
const fs = require("fs");
const readline = require("readline");

console.log = (...args) => console.error(...args);
const lispcMacros = new Map();
const lispcEval = (code) => (0, eval)(code);

const lispcSexp = (value) =>
  Array.isArray(value) ? `(${value.map(lispcSexp).join(" ")})`
  : typeof value === "symbol" ? Symbol.keyFor(value)
  : typeof value === "string" ? JSON.stringify(value)
  : value === null || value === undefined ? "nil"
  : String(value);

const lispcReply = (line) => fs.writeSync(1, line + "\n");

readline.createInterface({ input: process.stdin }).on("line", (line) => {
  const [command, name, code] = JSON.parse(line);
  try {
    if (command === "macro") {
      lispcMacros.set(name, lispcEval(code));
      lispcReply("ok");
    } else if (command === "expand") {
      const expander = lispcMacros.get(name);
      lispcReply("ok " + lispcSexp(expander(...lispcEval(code))));
    } else {
      lispcEval(code);
      lispcReply("ok");
    }
  } catch (e) {
    lispcReply("error " + JSON.stringify(e instanceof Error ? e.message : String(e)));
  }
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_line_is_a_json_array() {
        assert_eq!(
            request_line("run", "", "puts \"hi\"\nx = 1"),
            r#"["run", "", "puts \"hi\"\nx = 1"]"#
        );
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply("ok"), Ok(None));
        assert_eq!(
            parse_reply(r#"ok (if c (do "x" 1.5) nil)"#),
            Ok(Some(Node::list([
                Node::symbol("if"),
                Node::symbol("c"),
                Node::list([Node::symbol("do"), Node::string("x"), Node::Float(1.5)]),
                Node::Nil,
            ])))
        );
        assert_eq!(
            parse_reply(r#"error "undefined local variable `x'""#),
            Err(HostError::Raised("undefined local variable `x'".into()))
        );
    }

    #[test]
    fn test_malformed_replies() {
        for line in ["", "okay", "error", "error 42", "ok (unclosed", "what \"?\""] {
            assert_eq!(
                parse_reply(line),
                Err(HostError::Process(format!("malformed reply `{line}`"))),
                "line: {line}"
            );
        }
    }

    #[test]
    fn test_missing_interpreter() {
        let mut host = ProcessHost::with_program(Target::ruby, "lispc-missing-interpreter");
        let Err(HostError::Process(message)) = host.run("1") else {
            panic!("running without an interpreter should fail");
        };
        assert!(message.starts_with("failed to start `lispc-missing-interpreter`: "));
    }
}
