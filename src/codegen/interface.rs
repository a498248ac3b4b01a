use std::io;

use crate::{
    ast::Node,
    codegen::env::{Env, JavaScript, Ruby},
    compiler::{self, Compiler},
    host::Host,
    macros::MacroTable,
};

/// Writes the prologue of `target`, followed by the fragment of every form
/// which emits one, each on its own line.
pub fn generate<W, H>(
    mut writer: W,
    host: &mut H,
    target: Target,
    forms: &[Node],
) -> Result<(), GenerateError>
where
    W: io::Write,
    H: Host,
{
    log::debug!("generating {} forms for {target}", forms.len());
    let mut compiler = TargetCompiler::new(target, host);
    writer.write_all(compiler.prologue().as_bytes())?;
    compiler.emit(writer, forms)
}

type RubyCompiler<'host, H> = Compiler<'host, H, Ruby>;
type JavaScriptCompiler<'host, H> = Compiler<'host, H, JavaScript>;

/// A compilation session whose target is picked at runtime.
pub enum TargetCompiler<'host, H> {
    Ruby(RubyCompiler<'host, H>),
    JavaScript(JavaScriptCompiler<'host, H>),
}

impl<'host, H> TargetCompiler<'host, H>
where
    H: Host,
{
    pub fn new(target: Target, host: &'host mut H) -> TargetCompiler<'host, H> {
        Self::with_macros(target, host, MacroTable::with_capacity(32))
    }

    pub fn with_macros(target: Target, host: &'host mut H, macros: MacroTable) -> TargetCompiler<'host, H> {
        match target {
            Target::ruby => TargetCompiler::Ruby(Compiler::with_macros(host, macros)),
            Target::javascript => TargetCompiler::JavaScript(Compiler::with_macros(host, macros)),
        }
    }

    pub fn target(&self) -> Target {
        match self {
            TargetCompiler::Ruby(_) => Target::ruby,
            TargetCompiler::JavaScript(_) => Target::javascript,
        }
    }

    pub fn prologue(&self) -> &'static str {
        match self {
            TargetCompiler::Ruby(_) => Ruby::PROLOGUE,
            TargetCompiler::JavaScript(_) => JavaScript::PROLOGUE,
        }
    }

    pub fn compile(&mut self, node: &Node) -> compiler::Result<Option<String>> {
        match self {
            TargetCompiler::Ruby(compiler) => compiler.compile(node),
            TargetCompiler::JavaScript(compiler) => compiler.compile(node),
        }
    }

    pub fn load(&mut self, src: &str) -> compiler::Result<Vec<String>> {
        match self {
            TargetCompiler::Ruby(compiler) => compiler.load(src),
            TargetCompiler::JavaScript(compiler) => compiler.load(src),
        }
    }

    /// Writes the fragment of every form which emits one, each on its own
    /// line. Stops at the first error.
    pub fn emit<W: io::Write>(&mut self, mut writer: W, forms: &[Node]) -> Result<(), GenerateError> {
        for form in forms {
            if let Some(fragment) = self.compile(form)? {
                writeln!(writer, "{fragment}")?;
            }
        }
        Ok(())
    }

    pub fn run(&mut self, fragment: &str) -> compiler::Result<()> {
        match self {
            TargetCompiler::Ruby(compiler) => compiler.run(fragment),
            TargetCompiler::JavaScript(compiler) => compiler.run(fragment),
        }
    }

    pub fn macros(&self) -> &MacroTable {
        match self {
            TargetCompiler::Ruby(compiler) => compiler.macros(),
            TargetCompiler::JavaScript(compiler) => compiler.macros(),
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    ruby,
    javascript,
}

impl Target {
    pub const ALL: &[Target] = &[Target::ruby, Target::javascript];

    pub const fn name(&self) -> &'static str {
        match self {
            Target::ruby => Ruby::NAME,
            Target::javascript => JavaScript::NAME,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .iter()
            .copied()
            .find(|target| target.name() == s)
            .ok_or_else(|| UnknownTarget(s.into()))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownTarget(pub Box<str>);

#[derive(Debug)]
pub enum GenerateError {
    Compile(compiler::Error),
    Io(io::Error),
}

impl From<compiler::Error> for GenerateError {
    fn from(value: compiler::Error) -> Self {
        GenerateError::Compile(value)
    }
}

impl From<io::Error> for GenerateError {
    fn from(value: io::Error) -> Self {
        GenerateError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{host::Detached, reader::read_all, util::test_utils::StubHost};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_target_names() {
        for target in Target::ALL {
            assert_eq!(target.to_string().parse::<Target>(), Ok(*target));
        }
        assert_eq!(
            "cobol".parse::<Target>(),
            Err(UnknownTarget("cobol".into()))
        );
    }

    #[test]
    fn test_generate_writes_prologue_then_fragments() {
        let forms = read_all("(def x 1) (print x)", &mut Vec::new()).unwrap();
        let mut out = Vec::new();
        generate(&mut out, &mut Detached, Target::javascript, &forms).unwrap();

        let out = String::from_utf8(out).unwrap();
        let expected = format!("{}var x; (x = 1)\nprint(x)\n", JavaScript::PROLOGUE);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_emit_keeps_macros_of_the_session() {
        let mut host = StubHost::new();
        let mut compiler = TargetCompiler::new(Target::ruby, &mut host);
        compiler.load("(defmacro when (fn [c & b] nil))").unwrap();

        let forms = read_all("(when a (f)) (defmacro defn (fn [n p & b] nil))", &mut Vec::new()).unwrap();
        let mut out = Vec::new();
        compiler.emit(&mut out, &forms).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "(a ? (f.()) : nil)\n");
        assert!(compiler.macros().contains("defn"));
    }

    #[test]
    fn test_run_hands_fragment_to_host() {
        let mut host = StubHost::new();
        TargetCompiler::new(Target::javascript, &mut host).run("f()").unwrap();
        assert_eq!(host.ran, ["f()"]);
    }

    #[test]
    fn test_generate_stops_at_first_error() {
        let forms = read_all("(print 1) (if 1)", &mut Vec::new()).unwrap();
        let mut out = Vec::new();
        let error = generate(&mut out, &mut Detached, Target::ruby, &forms).unwrap_err();
        assert!(matches!(error, GenerateError::Compile(compiler::Error::Arity { .. })));
    }
}
