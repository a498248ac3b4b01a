use std::{fmt, marker::PhantomData};

use crate::{
    ast::{markers, Node, SpecialForm, MAX_NESTING_DEPTH},
    codegen::env::Env,
    host::{Host, HostError},
    lexer::SUGGESTED_TOKENS_CAPACITY,
    macros::{Macro, MacroTable},
    names::sanitize,
    quasiquote, reader,
    token::Spanned,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Nested macro expansions allowed while compiling a single form.
pub const MAX_EXPANSION_DEPTH: usize = 512;

/// A compilation session.
///
/// Owns the macro table, which `defmacro` forms populate as they are
/// compiled, and borrows the host which evaluates macro functions. Fragments
/// are produced in the surface syntax of `E`.
pub struct Compiler<'host, H, E> {
    host: &'host mut H,
    macros: MacroTable,
    /// Names bound by `def`, one frame per enclosing lambda. The first frame
    /// belongs to the top-level form.
    scopes: Vec<Vec<String>>,
    depth: usize,
    /// Lists entered on the way to the node being compiled. A macro call
    /// doesn't count, as its expansion takes its place.
    nesting: usize,
    _env: PhantomData<E>,
}

impl<'host, H, E> Compiler<'host, H, E>
where
    H: Host,
    E: Env,
{
    pub fn new(host: &'host mut H) -> Compiler<'host, H, E> {
        Self::with_macros(host, MacroTable::with_capacity(32))
    }

    pub fn with_macros(host: &'host mut H, macros: MacroTable) -> Compiler<'host, H, E> {
        Compiler {
            host,
            macros,
            scopes: Vec::with_capacity(8),
            depth: 0,
            nesting: 0,
            _env: PhantomData,
        }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn into_macros(self) -> MacroTable {
        self.macros
    }

    /// Compiles one top-level form.
    ///
    /// Returns `None` for forms which emit nothing, such as `defmacro`.
    pub fn compile(&mut self, node: &Node) -> Result<Option<String>> {
        self.scopes.clear();
        self.scopes.push(Vec::new());
        self.depth = 0;
        self.nesting = 0;

        let code = self.c_node(node)?;
        let locals = self.scopes.pop().unwrap_or_default();
        Ok(code.map(|code| E::top_level(&locals, &code)))
    }

    /// Reads and compiles every form of `src`, handing each fragment to the
    /// host before compiling the next form. Returns the emitted fragments.
    pub fn load(&mut self, src: &str) -> Result<Vec<String>> {
        let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
        let forms = reader::read_all(src, &mut tokens)?;
        let mut fragments = Vec::with_capacity(forms.len());
        for form in &forms {
            if let Some(fragment) = self.compile(form)? {
                self.run(&fragment)?;
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    /// Hands a compiled top-level fragment to the host.
    pub fn run(&mut self, fragment: &str) -> Result<()> {
        self.host.run(fragment).map_err(Error::Runtime)
    }
}

impl<H, E> Compiler<'_, H, E>
where
    H: Host,
    E: Env,
{
    /// Yields `None` only for forms which emit nothing.
    fn c_node(&mut self, node: &Node) -> Result<Option<String>> {
        let code = match node {
            Node::List(items) => {
                if self.nesting >= MAX_NESTING_DEPTH {
                    return Err(Error::NestingTooDeep);
                }
                self.nesting += 1;
                let code = self.c_list(items);
                self.nesting -= 1;
                return code;
            }
            Node::Symbol(name) => match name.strip_prefix(':') {
                Some(keyword) if !keyword.is_empty() => E::keyword(keyword),
                _ => sanitize(name),
            },
            Node::Integer(int) => E::integer(*int),
            Node::Float(float) => E::float(*float),
            Node::String(string) => E::string(string),
            Node::Bool(bool) => E::bool(*bool),
            Node::Nil => E::NIL.to_string(),
        };
        Ok(Some(code))
    }

    /// Compiles a node in a position where a value is required.
    fn c_expr(&mut self, node: &Node) -> Result<String> {
        Ok(self
            .c_node(node)?
            .unwrap_or_else(|| E::NIL.to_string()))
    }

    fn c_exprs(&mut self, nodes: &[Node]) -> Result<Vec<String>> {
        let mut exprs = Vec::with_capacity(nodes.len());
        for node in nodes {
            exprs.push(self.c_expr(node)?);
        }
        Ok(exprs)
    }

    /// Compiles a node which is called or receives a method call, grouping
    /// it unless it already binds tighter than a call.
    fn c_operand(&mut self, node: &Node) -> Result<String> {
        let code = self.c_expr(node)?;
        if self.is_tight(node) {
            Ok(code)
        } else {
            Ok(format!("({code})"))
        }
    }

    fn is_tight(&self, node: &Node) -> bool {
        match node {
            Node::Symbol(name) => !name.starts_with(':'),
            Node::String(_) => true,
            Node::Integer(_) | Node::Float(_) | Node::Bool(_) | Node::Nil => false,
            Node::List(items) => match items.first().and_then(Node::as_symbol) {
                Some(head) => match SpecialForm::lookup(head) {
                    Some(SpecialForm::Send | SpecialForm::Do) => true,
                    Some(_) => false,
                    None => !self.macros.contains(head),
                },
                None => true,
            },
        }
    }

    fn c_list(&mut self, items: &[Node]) -> Result<Option<String>> {
        let Some((head, args)) = items.split_first() else {
            return Err(Error::EmptyApplication);
        };

        if let Some(name) = head.as_symbol() {
            if let Some(form) = SpecialForm::lookup(name) {
                return self.c_special_form(form, args);
            }
            if let Some(expander) = self.macros.get(name).cloned() {
                return self.c_macro_call(name, &expander, args);
            }
        }

        let function = self.c_operand(head)?;
        let args = self.c_exprs(args)?;
        Ok(Some(E::call(&function, &args)))
    }

    fn c_macro_call(&mut self, name: &str, expander: &Macro, args: &[Node]) -> Result<Option<String>> {
        if self.depth >= MAX_EXPANSION_DEPTH {
            return Err(Error::ExpansionDepthExceeded { name: name.into() });
        }
        log::trace!("expanding macro `{name}`");
        let expansion = expander
            .expand(args)
            .map_err(|error| Error::MacroExpansion {
                name: name.into(),
                error,
            })?;

        self.depth += 1;
        self.nesting -= 1;
        let code = self.c_node(&expansion);
        self.nesting += 1;
        self.depth -= 1;
        code
    }

    fn c_special_form(&mut self, form: SpecialForm, args: &[Node]) -> Result<Option<String>> {
        let code = match form {
            SpecialForm::Apply => {
                let [function, list] = arity::<2>(form, args)?;
                let function = self.c_operand(function)?;
                let list = self.c_expr(list)?;
                E::apply(&function, &list)
            }
            SpecialForm::Block => {
                let [function] = arity::<1>(form, args)?;
                E::block(&self.c_expr(function)?)
            }
            SpecialForm::Def => {
                let [name, value] = arity::<2>(form, args)?;
                let name = sanitize(expect_symbol(form, name)?);
                let value = self.c_expr(value)?;
                self.declare(&name);
                E::def(&name, &value)
            }
            SpecialForm::DefMacro => {
                let [name, function] = arity::<2>(form, args)?;
                let name = expect_symbol(form, name)?;
                self.define_macro(name, function)?;
                return Ok(None);
            }
            SpecialForm::Do => E::sequence(&self.c_body(args)?),
            SpecialForm::Fn => {
                let [params, body @ ..] = args else {
                    return Err(Error::Arity {
                        form,
                        expected: Arity::AtLeast(1),
                        actual: 0,
                    });
                };
                self.c_lambda(params, body)?
            }
            SpecialForm::If => {
                let [predicate, then_arm, else_arm] = arity::<3>(form, args)?;
                let predicate = self.c_expr(predicate)?;
                let then_arm = self.c_expr(then_arm)?;
                let else_arm = self.c_expr(else_arm)?;
                E::conditional(&predicate, &then_arm, &else_arm)
            }
            SpecialForm::Send => {
                let [receiver, message, rest @ ..] = args else {
                    return Err(Error::Arity {
                        form,
                        expected: Arity::AtLeast(2),
                        actual: args.len(),
                    });
                };
                let receiver = self.c_operand(receiver)?;
                let args = self.c_exprs(rest)?;
                match message {
                    Node::String(method) => E::send(&receiver, method, &args),
                    dynamic => {
                        let message = self.c_expr(dynamic)?;
                        E::dynamic_send(&receiver, &message, &args)
                    }
                }
            }
            SpecialForm::Quasiquote => {
                let [template] = arity::<1>(form, args)?;
                within_nesting_limit(template)?;
                let expanded = quasiquote::expand(template)?;
                return self.c_node(&expanded);
            }
            SpecialForm::Quote => {
                let [datum] = arity::<1>(form, args)?;
                within_nesting_limit(datum)?;
                E::literal(datum)
            }
            SpecialForm::Try => {
                let [body, clause] = arity::<2>(form, args)?;
                let (binding, handler) = catch_clause(clause)?;
                let body = self.c_expr(body)?;
                let binding = sanitize(binding);
                let handler = self.c_expr(handler)?;
                E::guard(&body, &binding, &handler)
            }
        };
        Ok(Some(code))
    }

    /// Compiles a sequence of forms, dropping those which emit nothing.
    fn c_body(&mut self, body: &[Node]) -> Result<Vec<String>> {
        let mut exprs = Vec::with_capacity(body.len());
        for node in body {
            if let Some(code) = self.c_node(node)? {
                exprs.push(code);
            }
        }
        Ok(exprs)
    }

    fn c_lambda(&mut self, params: &Node, body: &[Node]) -> Result<String> {
        let (fixed, rest) = parameters(params)?;

        self.scopes.push(Vec::new());
        let body = self.c_body(body);
        let mut locals = self.scopes.pop().unwrap_or_default();
        let body = E::sequence(&body?);

        locals.retain(|local| !fixed.contains(local) && rest.as_ref() != Some(local));
        Ok(E::lambda(&fixed, rest.as_deref(), &locals, &body))
    }

    fn define_macro(&mut self, name: &str, function: &Node) -> Result<()> {
        let fragment = self.c_expr(function)?;
        let expander = self
            .host
            .eval_macro(name, &fragment)
            .map_err(|error| Error::MacroDefinition {
                name: name.into(),
                error,
            })?;
        if self.macros.define(name, expander).is_some() {
            log::debug!("redefined macro `{name}`");
        } else {
            log::debug!("registered macro `{name}`");
        }
        Ok(())
    }

    /// Records a `def` binding in the innermost scope.
    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.iter().any(|declared| declared == name) {
                scope.push(name.to_string());
            }
        }
    }
}

fn arity<const N: usize>(form: SpecialForm, args: &[Node]) -> Result<&[Node; N]> {
    args.try_into().map_err(|_| Error::Arity {
        form,
        expected: Arity::Exactly(N),
        actual: args.len(),
    })
}

/// Data built by macros never went through the reader, so its depth is
/// checked before walking it.
fn within_nesting_limit(node: &Node) -> Result<()> {
    if node.depth() > MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep);
    }
    Ok(())
}

fn expect_symbol(form: SpecialForm, node: &Node) -> Result<&str> {
    node.as_symbol().ok_or_else(|| Error::ExpectedSymbol {
        form,
        actual: node.clone(),
    })
}

/// Splits `[a b & rest]` into the sanitized fixed parameters and the
/// sanitized variadic one.
fn parameters(params: &Node) -> Result<(Vec<String>, Option<String>)> {
    let invalid = || Error::InvalidParameters(params.clone());
    let items = params.as_list().ok_or_else(invalid)?;
    let (fixed, rest) = match items {
        [fixed @ .., marker, rest] if marker.is_symbol(markers::REST) => (fixed, Some(rest)),
        all => (all, None),
    };
    let name = |node: &Node| match node.as_symbol() {
        Some(name) if name != markers::REST => Ok(sanitize(name)),
        _ => Err(invalid()),
    };
    let fixed = fixed.iter().map(name).collect::<Result<Vec<_>>>()?;
    let rest = rest.map(name).transpose()?;
    Ok((fixed, rest))
}

/// Destructures `(catch binding handler)`.
fn catch_clause(clause: &Node) -> Result<(&str, &Node)> {
    if let Some([head, binding, handler]) = clause.as_list() {
        if let (true, Some(binding)) = (head.is_symbol(markers::CATCH), binding.as_symbol()) {
            return Ok((binding, handler));
        }
    }
    Err(Error::MalformedCatch(clause.clone()))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, n) = match *self {
            Arity::Exactly(n) => ("", n),
            Arity::AtLeast(n) => ("at least ", n),
        };
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{prefix}{n} operand{plural}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Read(Spanned<reader::Error>),
    Quasiquote(quasiquote::Error),
    Arity {
        form: SpecialForm,
        expected: Arity,
        actual: usize,
    },
    ExpectedSymbol {
        form: SpecialForm,
        actual: Node,
    },
    InvalidParameters(Node),
    MalformedCatch(Node),
    EmptyApplication,
    MacroDefinition {
        name: Box<str>,
        error: HostError,
    },
    MacroExpansion {
        name: Box<str>,
        error: HostError,
    },
    ExpansionDepthExceeded {
        name: Box<str>,
    },
    /// Lists nested deeper than [`MAX_NESTING_DEPTH`], counting the lists
    /// macros and quasiquote produce.
    NestingTooDeep,
    /// The host failed to run a top-level fragment.
    Runtime(HostError),
}

impl From<Spanned<reader::Error>> for Error {
    fn from(value: Spanned<reader::Error>) -> Self {
        Error::Read(value)
    }
}

impl From<quasiquote::Error> for Error {
    fn from(value: quasiquote::Error) -> Self {
        Error::Quasiquote(value)
    }
}

#[cfg(test)]
mod tests;
