use std::fmt::{self, Display, Formatter};

/// Severity ordering used to gate a [`Log`] message against a caller-configured minimum.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Level {
    None,
    Default,
    Success,
    Result,
    Verbose,
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::None => "none",
            Level::Default => "default",
            Level::Success => "success",
            Level::Result => "result",
            Level::Verbose => "verbose",
        };
        f.write_str(s)
    }
}

/// A leveled diagnostic value consulted by the table builder and parser driver.
///
/// Ordered `None < Default < Success < Result < Verbose`; a caller picks one level and
/// every diagnostic call site compares its own level against it via [`Log::level`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T> Log<T> {
    pub fn level(&self) -> Level {
        match self {
            Log::None => Level::None,
            Log::Default(_) => Level::Default,
            Log::Success(_) => Level::Success,
            Log::Result(_) => Level::Result,
            Log::Verbose(_) => Level::Verbose,
        }
    }

    pub fn enabled_at(&self, min_level: Level) -> bool {
        self.level() >= min_level
    }

    /// Emit a single diagnostic line gated both by the configured level and by
    /// `debug_assertions`, matching the conditional-println idiom used throughout this
    /// crate's lineage of parsing tools.
    pub fn emit(&self, min_level: Level, message: impl FnOnce() -> String) {
        #[cfg(debug_assertions)]
        {
            if self.enabled_at(min_level) {
                println!("[{}]: {}", self.level(), message());
            }
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = min_level;
            let _ = message;
        }
    }
}
