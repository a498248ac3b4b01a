use crate::{ast::Node, printer::quote_string};

/// The surface syntax of a target language.
///
/// Every function receives already compiled operands and returns the
/// fragment for one construct. Fragments must be expressions, so that they
/// can nest anywhere an operand is expected.
pub trait Env {
    const NAME: &'static str;

    /// Runtime support which whole-program output starts with.
    const PROLOGUE: &'static str;

    const NIL: &'static str;

    fn integer(int: i64) -> String {
        int.to_string()
    }

    fn float(float: f64) -> String {
        format!("{float:?}")
    }

    fn bool(bool: bool) -> String {
        bool.to_string()
    }

    fn string(string: &str) -> String;

    /// A self-evaluating `:name` symbol. `name` excludes the leading colon.
    fn keyword(name: &str) -> String;

    /// The literal data structure for a quoted node.
    fn literal(node: &Node) -> String;

    fn call(function: &str, args: &[String]) -> String;

    /// Calls `function` with the elements of the sequence `args` as arguments.
    fn apply(function: &str, args: &str) -> String;

    /// Passes `function` where a callable block is expected.
    fn block(function: &str) -> String;

    fn def(name: &str, value: &str) -> String;

    fn sequence(exprs: &[String]) -> String;

    /// `locals` are the names bound by `def` directly inside the body.
    fn lambda(params: &[String], rest: Option<&str>, locals: &[String], body: &str) -> String;

    fn conditional(predicate: &str, then_arm: &str, else_arm: &str) -> String;

    /// Invokes a method known at compile time.
    fn send(receiver: &str, method: &str, args: &[String]) -> String;

    /// Invokes the method whose name `message` evaluates to.
    fn dynamic_send(receiver: &str, message: &str, args: &[String]) -> String;

    /// Evaluates `body`; if it raises, binds the failure to `binding` and
    /// evaluates `handler` instead.
    fn guard(body: &str, binding: &str, handler: &str) -> String;

    /// Wraps a top-level expression, declaring the names it binds with `def`.
    fn top_level(locals: &[String], expr: &str) -> String;
}

pub struct Ruby;

pub struct JavaScript;

impl Env for Ruby {
    const NAME: &'static str = "ruby";

    const PROLOGUE: &'static str = concat!(
        "def print_value(value)\n",
        "  return value.to_s if value.is_a?(Symbol)\n",
        "  return value.inspect unless value.is_a?(Array)\n",
        "  \"'(#{value.map { |item| print_value(item) }.join(' ')})\"\n",
        "end\n",
    );

    const NIL: &'static str = "nil";

    fn string(string: &str) -> String {
        // `#` would start an interpolation inside double quotes.
        quote_string(string).replace('#', "\\#")
    }

    fn keyword(name: &str) -> String {
        ruby_symbol(name)
    }

    fn literal(node: &Node) -> String {
        match node {
            Node::List(items) => {
                let items: Vec<_> = items.iter().map(Self::literal).collect();
                format!("[{}]", items.join(", "))
            }
            Node::Symbol(name) => ruby_symbol(name),
            Node::Integer(int) => Self::integer(*int),
            Node::Float(float) => Self::float(*float),
            Node::String(string) => Self::string(string),
            Node::Bool(bool) => Self::bool(*bool),
            Node::Nil => Self::NIL.to_string(),
        }
    }

    fn call(function: &str, args: &[String]) -> String {
        format!("{function}.({})", args.join(", "))
    }

    fn apply(function: &str, args: &str) -> String {
        format!("{function}.(*{args})")
    }

    fn block(function: &str) -> String {
        format!("&{function}")
    }

    fn def(name: &str, value: &str) -> String {
        format!("{name} = {value}")
    }

    fn sequence(exprs: &[String]) -> String {
        format!("({})", exprs.join("; "))
    }

    fn lambda(params: &[String], rest: Option<&str>, _locals: &[String], body: &str) -> String {
        let mut all: Vec<String> = params.to_vec();
        all.extend(rest.map(|rest| format!("*{rest}")));
        format!("->({}) {{ {body} }}", all.join(", "))
    }

    fn conditional(predicate: &str, then_arm: &str, else_arm: &str) -> String {
        format!("({predicate} ? {then_arm} : {else_arm})")
    }

    fn send(receiver: &str, method: &str, args: &[String]) -> String {
        if is_ruby_method_name(method) {
            format!("{receiver}.{method}({})", args.join(", "))
        } else {
            Self::dynamic_send(receiver, &Self::string(method), args)
        }
    }

    fn dynamic_send(receiver: &str, message: &str, args: &[String]) -> String {
        let mut all = vec![message.to_string()];
        all.extend_from_slice(args);
        format!("{receiver}.public_send({})", all.join(", "))
    }

    fn guard(body: &str, binding: &str, handler: &str) -> String {
        format!("begin; {body}; rescue => {binding}; {handler}; end")
    }

    fn top_level(_locals: &[String], expr: &str) -> String {
        expr.to_string()
    }
}

impl Env for JavaScript {
    const NAME: &'static str = "javascript";

    const PROLOGUE: &'static str = concat!(
        "const print_value = (value) =>\n",
        "  Array.isArray(value) ? `'(${value.map(print_value).join(\" \")})`\n",
        "  : typeof value === \"symbol\" ? Symbol.keyFor(value)\n",
        "  : value === null || value === undefined ? \"nil\"\n",
        "  : JSON.stringify(value);\n",
    );

    const NIL: &'static str = "null";

    fn string(string: &str) -> String {
        quote_string(string)
    }

    fn keyword(name: &str) -> String {
        format!("Symbol.for({})", quote_string(name))
    }

    fn literal(node: &Node) -> String {
        match node {
            Node::List(items) => {
                let items: Vec<_> = items.iter().map(Self::literal).collect();
                format!("[{}]", items.join(", "))
            }
            Node::Symbol(name) => Self::keyword(name),
            Node::Integer(int) => Self::integer(*int),
            Node::Float(float) => Self::float(*float),
            Node::String(string) => Self::string(string),
            Node::Bool(bool) => Self::bool(*bool),
            Node::Nil => Self::NIL.to_string(),
        }
    }

    fn call(function: &str, args: &[String]) -> String {
        format!("{function}({})", args.join(", "))
    }

    fn apply(function: &str, args: &str) -> String {
        format!("{function}(...{args})")
    }

    fn block(function: &str) -> String {
        function.to_string()
    }

    fn def(name: &str, value: &str) -> String {
        format!("({name} = {value})")
    }

    fn sequence(exprs: &[String]) -> String {
        if exprs.is_empty() {
            return "(void 0)".to_string();
        }
        format!("({})", exprs.join(", "))
    }

    fn lambda(params: &[String], rest: Option<&str>, locals: &[String], body: &str) -> String {
        let mut all: Vec<String> = params.to_vec();
        all.extend(rest.map(|rest| format!("...{rest}")));
        let params = all.join(", ");
        if locals.is_empty() {
            format!("(({params}) => {body})")
        } else {
            let locals = locals.join(", ");
            format!("(({params}) => {{ let {locals}; return {body}; }})")
        }
    }

    fn conditional(predicate: &str, then_arm: &str, else_arm: &str) -> String {
        format!("({predicate} ? {then_arm} : {else_arm})")
    }

    fn send(receiver: &str, method: &str, args: &[String]) -> String {
        if is_js_identifier(method) {
            format!("{receiver}.{method}({})", args.join(", "))
        } else {
            Self::dynamic_send(receiver, &Self::string(method), args)
        }
    }

    fn dynamic_send(receiver: &str, message: &str, args: &[String]) -> String {
        format!("{receiver}[{message}]({})", args.join(", "))
    }

    fn guard(body: &str, binding: &str, handler: &str) -> String {
        format!(
            "(() => {{ try {{ return {body}; }} catch ({binding}) {{ return {handler}; }} }})()"
        )
    }

    fn top_level(locals: &[String], expr: &str) -> String {
        if locals.is_empty() {
            expr.to_string()
        } else {
            format!("var {}; {expr}", locals.join(", "))
        }
    }
}

fn ruby_symbol(name: &str) -> String {
    if is_ruby_method_name(name) {
        format!(":{name}")
    } else {
        format!(":{}", Ruby::string(name))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*` optionally followed by `?`, `!` or `=`.
fn is_ruby_method_name(name: &str) -> bool {
    let base = name.strip_suffix(&['?', '!', '='][..]).unwrap_or(name);
    is_identifier(base, |_| false)
}

fn is_js_identifier(name: &str) -> bool {
    is_identifier(name, |c| c == '$')
}

fn is_identifier(name: &str, extra: impl Fn(char) -> bool) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start = |c: char| c.is_ascii_alphabetic() || c == '_' || extra(c);
    start(first) && chars.all(|c| start(c) || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ruby_literals() {
        let node = Node::list([
            Node::Integer(1),
            Node::symbol("a"),
            Node::symbol("list?"),
            Node::symbol("a-b"),
            Node::string("#{x}"),
            Node::Nil,
            Node::list([]),
        ]);
        assert_eq!(
            Ruby::literal(&node),
            r#"[1, :a, :list?, :"a-b", "\#{x}", nil, []]"#
        );
    }

    #[test]
    fn test_javascript_literals() {
        let node = Node::list([Node::Float(2.5), Node::symbol("a"), Node::Bool(false), Node::Nil]);
        assert_eq!(
            JavaScript::literal(&node),
            r#"[2.5, Symbol.for("a"), false, null]"#
        );
    }

    #[test]
    fn test_send_falls_back_to_dispatch_for_odd_names() {
        assert_eq!(Ruby::send("s", "upcase", &[]), "s.upcase()");
        assert_eq!(Ruby::send("s", "empty?", &[]), "s.empty?()");
        assert_eq!(
            Ruby::send("a", "+", &["b".to_string()]),
            r#"a.public_send("+", b)"#
        );
        assert_eq!(JavaScript::send("s", "toUpperCase", &[]), "s.toUpperCase()");
        assert_eq!(JavaScript::send("m", "has-key", &[]), r#"m["has-key"]()"#);
    }

    #[test]
    fn test_lambda_locals() {
        let params = ["a".to_string()];
        let locals = ["x".to_string(), "y".to_string()];
        assert_eq!(
            JavaScript::lambda(&params, Some("rest"), &locals, "(x = a, y = rest)"),
            "((a, ...rest) => { let x, y; return (x = a, y = rest); })"
        );
        assert_eq!(
            Ruby::lambda(&params, Some("rest"), &locals, "(x = a; y = rest)"),
            "->(a, *rest) { (x = a; y = rest) }"
        );
    }
}
