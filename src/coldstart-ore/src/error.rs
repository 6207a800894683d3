//! Error formatting helpers.

use std::fmt::Write;

/// Extension methods for displaying the full cause chain of an error.
pub trait ErrorExt {
    /// Renders this error together with the `Caused by: ...` chain of its
    /// sources, for the one place (the top of `main`) where we print an
    /// error directly to the user instead of logging it.
    fn display_with_causes(&self) -> String;
}

impl ErrorExt for anyhow::Error {
    fn display_with_causes(&self) -> String {
        let mut out = self.to_string();
        for cause in self.chain().skip(1) {
            write!(out, "\ncaused by: {cause}").expect("writing to a String cannot fail");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_are_rendered_in_order() {
        let err = anyhow::anyhow!("outer").context("middle").context("top");
        let rendered = err.display_with_causes();
        assert!(rendered.starts_with("top"));
        assert!(rendered.contains("caused by: middle"));
        assert!(rendered.contains("caused by: outer"));
    }
}
