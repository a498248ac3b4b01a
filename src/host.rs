use crate::macros::Macro;

mod process;

pub use process::ProcessHost;

/// The execution environment which runs emitted fragments.
///
/// The compiler never runs code itself. It only asks the host to turn the
/// fragment of a `defmacro` function into a callable [`Macro`], and (when
/// loading whole sources) hands it each top-level fragment.
pub trait Host {
    /// Evaluates the compiled function of macro `name`.
    fn eval_macro(&mut self, name: &str, fragment: &str) -> Result<Macro, HostError>;

    /// Runs a top-level fragment in the session scope.
    fn run(&mut self, fragment: &str) -> Result<(), HostError> {
        _ = fragment;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The host has no evaluator attached.
    Detached,
    /// The evaluated code raised, with the host's description of the failure.
    Raised(String),
    /// The evaluator itself could not be reached or misbehaved.
    Process(String),
}

/// A compile-only host. Defining a macro always fails.
#[derive(Copy, Clone, Debug, Default)]
pub struct Detached;

impl Host for Detached {
    fn eval_macro(&mut self, _name: &str, _fragment: &str) -> Result<Macro, HostError> {
        Err(HostError::Detached)
    }
}
