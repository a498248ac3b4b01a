use std::collections::HashMap;

use crate::{
    ast::Node,
    codegen::env::{Env, JavaScript, Ruby},
    compiler::Compiler,
    host::{Host, HostError},
    macros::Macro,
    reader,
};

/// A host whose macro functions are native expanders, registered up front
/// by name. Records every fragment it is handed.
pub struct StubHost {
    expanders: HashMap<&'static str, Macro>,
    pub evaluated: Vec<(String, String)>,
    pub ran: Vec<String>,
}

impl StubHost {
    pub fn new() -> StubHost {
        let mut expanders = HashMap::new();

        // (when c body...) => (if c (do body...) nil)
        expanders.insert(
            "when",
            Macro::new(|args| {
                let (cond, body) = args
                    .split_first()
                    .ok_or_else(|| HostError::Raised("when: missing condition".into()))?;
                let body = std::iter::once(Node::symbol("do")).chain(body.iter().cloned());
                Ok(Node::list([
                    Node::symbol("if"),
                    cond.clone(),
                    Node::list(body),
                    Node::Nil,
                ]))
            }),
        );
        // (unless c body...) => (when (not? c) body...)
        expanders.insert(
            "unless",
            Macro::new(|args| {
                let (cond, body) = args
                    .split_first()
                    .ok_or_else(|| HostError::Raised("unless: missing condition".into()))?;
                let negated = Node::list([Node::symbol("not?"), cond.clone()]);
                let head = [Node::symbol("when"), negated];
                Ok(Node::list(head.into_iter().chain(body.iter().cloned())))
            }),
        );
        // (defn name params body...) => (def name (fn params body...))
        expanders.insert(
            "defn",
            Macro::new(|args| {
                let [name, params, body @ ..] = args else {
                    return Err(HostError::Raised("defn: missing name or params".into()));
                };
                let head = [Node::symbol("fn"), params.clone()];
                let function = Node::list(head.into_iter().chain(body.iter().cloned()));
                Ok(Node::list([Node::symbol("def"), name.clone(), function]))
            }),
        );
        // (forever) => (forever)
        expanders.insert(
            "forever",
            Macro::new(|_| Ok(Node::list([Node::symbol("forever")]))),
        );
        expanders.insert(
            "if",
            Macro::new(|_| Err(HostError::Raised("special forms can't be redefined".into()))),
        );
        // (nest) => '((((...)))), deeper than any source form may be
        expanders.insert(
            "nest",
            Macro::new(|_| {
                let mut datum = Node::list([]);
                for _ in 0..300 {
                    datum = Node::list([datum]);
                }
                Ok(Node::marked("quote", datum))
            }),
        );
        expanders.insert(
            "explode",
            Macro::new(|_| Err(HostError::Raised("boom".into()))),
        );

        StubHost {
            expanders,
            evaluated: Vec::new(),
            ran: Vec::new(),
        }
    }
}

impl Host for StubHost {
    fn eval_macro(&mut self, name: &str, fragment: &str) -> Result<Macro, HostError> {
        self.evaluated.push((name.to_string(), fragment.to_string()));
        self.expanders
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::Raised(format!("undefined method `{name}'")))
    }

    fn run(&mut self, fragment: &str) -> Result<(), HostError> {
        self.ran.push(fragment.to_string());
        Ok(())
    }
}

/// Each variant contains the input.
pub enum Test {
    Ruby(&'static str),
    JavaScript(&'static str),
}

pub enum Assertion {
    FragmentOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Compiles every form of the input, joining the fragments with newlines.
/// Compilation stops at the first error.
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    match test {
        Test::Ruby(input) => compile_all::<Ruby>(input),
        Test::JavaScript(input) => compile_all::<JavaScript>(input),
    }
}

fn compile_all<E: Env>(input: &str) -> (String, Vec<String>) {
    let forms = match reader::read_all(input, &mut Vec::with_capacity(1024)) {
        Ok(forms) => forms,
        Err(error) => return (String::new(), vec![format!("{error:#}")]),
    };

    let mut host = StubHost::new();
    let mut compiler = Compiler::<_, E>::new(&mut host);
    let mut fragments = Vec::with_capacity(forms.len());
    let mut errors = Vec::new();
    for form in &forms {
        match compiler.compile(form) {
            Ok(Some(fragment)) => fragments.push(fragment),
            Ok(None) => {}
            Err(error) => {
                errors.push(error.to_string());
                break;
            }
        }
    }
    (fragments.join("\n"), errors)
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_fragment: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::FragmentOk(expected_fragment) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(
                formatted_actual_fragment.trim(),
                expected_fragment.trim()
            );
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! compile_tests {
    (
        use $target:ident;

        $(
            fn $test_name:ident() {
                let source = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    compile_tests!(@@get_test($target), $source);
                let (formatted_actual_fragment, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_fragment, &formatted_actual_errors);
                compile_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            compile_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        compile_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, fragment_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::FragmentOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(ruby), $source:expr) => {
        crate::util::test_utils::Test::Ruby($source)
    };
    (@@get_test(javascript), $source:expr) => {
        crate::util::test_utils::Test::JavaScript($source)
    };
}
pub(crate) use compile_tests;
