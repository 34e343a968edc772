pub mod bassline;
pub mod clock;
pub mod drums;
pub mod project;
pub mod scheduler;
pub mod tempo;

/// What an edit means for the running step program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rebuild {
    None,
    Program,
}
