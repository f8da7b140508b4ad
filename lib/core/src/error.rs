//! Result alias for client-wrapper boundaries.
//!
//! Calls into external systems (SMTP relay, NATS) return
//! `Result<T, SomeError>`, where the error travels inside a rootcause
//! [`Report`] so attachments can be added on the way up. Domain logic keeps
//! its plain error enums.

use rootcause::Report;

/// `Result` whose error is a [`Report`] with context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Unreachable;

    impl fmt::Display for Unreachable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "relay unreachable")
        }
    }

    impl std::error::Error for Unreachable {}

    fn connect(up: bool) -> Result<u16, Unreachable> {
        if !up {
            return Err(Unreachable.into());
        }
        Ok(587)
    }

    #[test]
    fn context_converts_with_question_mark() {
        fn wrapper() -> Result<u16, Unreachable> {
            let port = connect(false)?;
            Ok(port)
        }

        assert_eq!(connect(true).expect("up"), 587);
        let report = wrapper().expect_err("down");
        assert!(report.to_string().contains("relay unreachable"));
    }
}
