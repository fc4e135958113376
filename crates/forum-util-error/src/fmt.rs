use std::fmt;

/// Renders an error and its `source()` chain on a single line.
///
/// Useful in `tracing` fields (`err = %err.fmt_compact()`), where a
/// multi-line `{:?}` dump would break log parsing.
pub struct FmtCompactDisplay<'e>(&'e (dyn std::error::Error + 'e));

impl fmt::Display for FmtCompactDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut cur = self.0.source();
        while let Some(source) = cur {
            write!(f, ": {source}")?;
            cur = source.source();
        }
        Ok(())
    }
}

pub trait FmtCompact {
    fn fmt_compact(&self) -> FmtCompactDisplay<'_>;
}

impl<E> FmtCompact for E
where
    E: std::error::Error,
{
    fn fmt_compact(&self) -> FmtCompactDisplay<'_> {
        FmtCompactDisplay(self)
    }
}

#[cfg(test)]
mod tests {
    use snafu::Snafu;

    use super::*;

    #[derive(Debug, Snafu)]
    #[snafu(display("inner failed"))]
    struct Inner;

    #[derive(Debug, Snafu)]
    #[snafu(display("outer failed"))]
    struct Outer {
        source: Inner,
    }

    #[test]
    fn chains_source_on_one_line() {
        let err = Outer { source: Inner };
        assert_eq!(err.fmt_compact().to_string(), "outer failed: inner failed");
    }

    #[test]
    fn single_error_has_no_colon() {
        let err = Inner;
        assert_eq!(err.fmt_compact().to_string(), "inner failed");
    }
}
