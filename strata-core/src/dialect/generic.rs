use crate::{Dialect, IdentifierQuote};

/// ANSI flavoured SQL without identifier quoting.
#[derive(Default, Clone, Debug)]
pub struct GenericDialect {
    quote: IdentifierQuote,
}

impl GenericDialect {
    pub fn new(quote: Option<IdentifierQuote>) -> Self {
        Self {
            quote: quote.unwrap_or_default(),
        }
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &str {
        "generic"
    }

    fn identifier_quote(&self) -> &IdentifierQuote {
        &self.quote
    }
}
