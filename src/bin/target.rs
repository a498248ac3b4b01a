#[derive(Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Target {
    Ruby,
    #[value(alias = "js")]
    Javascript,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        lispc::codegen::Target::from(*self).fmt(f)
    }
}

impl From<Target> for lispc::codegen::Target {
    fn from(value: Target) -> Self {
        match value {
            Target::Ruby => lispc::codegen::Target::ruby,
            Target::Javascript => lispc::codegen::Target::javascript,
        }
    }
}

/// What the compiler prints for each input.
#[derive(Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Emit {
    Tokens,
    Ast,
    Code,
}
