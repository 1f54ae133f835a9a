use std::{ops::Deref, sync::OnceLock};

use regex::Regex;

/// A regular expression compiled on first use, so that it can be
/// declared as a `static`.
pub(crate) struct LazyRegex {
    once: OnceLock<Regex>,
    pattern: &'static str,
}

impl LazyRegex {
    pub(crate) const fn new(pattern: &'static str) -> Self {
        LazyRegex {
            once: OnceLock::new(),
            pattern,
        }
    }
}

impl Deref for LazyRegex {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        self.once.get_or_init(|| match Regex::new(self.pattern) {
            Ok(r) => r,
            Err(e) => {
                panic!("'{}' is not a valid regular expression: {e}", self.pattern,);
            }
        })
    }
}

/// `C'EOF'` or `X'05'`.
pub(super) static CONSTANT: LazyRegex = LazyRegex::new(r"^([CX])'([^']*)'$");

/// A constant whose closing quote is missing.
pub(super) static UNTERMINATED_CONSTANT: LazyRegex = LazyRegex::new(r"^[CX]'[^']*$");

pub(super) static HEX_DIGITS: LazyRegex = LazyRegex::new(r"^[0-9A-Fa-f]+$");
