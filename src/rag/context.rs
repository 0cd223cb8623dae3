//! Context assembly from retrieved documents

/// Prompt context plus how many leading documents made it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub included: usize,
}

/// Joins retrieved lines into the prompt context within a character budget
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_context_chars: usize,
}

impl ContextAssembler {
    #[must_use]
    pub const fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    #[must_use]
    pub const fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// One document per line, in the given order
    ///
    /// The first document is always included, even when it alone exceeds
    /// the budget; later ones stop at the first that would not fit.
    #[must_use]
    pub fn assemble<'a, I>(&self, documents: I) -> AssembledContext
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut context = String::new();
        let mut total_chars = 0;
        let mut included = 0;

        for (idx, text) in documents.into_iter().enumerate() {
            let entry_chars = text.chars().count() + usize::from(idx > 0);
            if idx > 0 && total_chars + entry_chars > self.max_context_chars {
                break;
            }
            if idx > 0 {
                context.push('\n');
            }
            context.push_str(text);
            total_chars += entry_chars;
            included += 1;
        }

        AssembledContext {
            text: context,
            included,
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(4000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_one_per_line() {
        let assembler = ContextAssembler::default();
        let context = assembler.assemble(["a", "b", "c"]);
        assert_eq!(context.text, "a\nb\nc");
        assert_eq!(context.included, 3);
    }

    #[test]
    fn test_budget_stops_at_first_overflow() {
        let assembler = ContextAssembler::new(7);
        // "aaa" (3) + "\nbbb" (4) fits exactly, "\nc" does not
        let context = assembler.assemble(["aaa", "bbb", "c", "d"]);
        assert_eq!(context.text, "aaa\nbbb");
        assert_eq!(context.included, 2);
    }

    #[test]
    fn test_first_document_always_kept() {
        let assembler = ContextAssembler::new(2);
        let context = assembler.assemble(["too long", "x"]);
        assert_eq!(context.text, "too long");
        assert_eq!(context.included, 1);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let assembler = ContextAssembler::new(5);
        assert_eq!(assembler.assemble(["µµ", "µµ"]).text, "µµ\nµµ");
    }

    #[test]
    fn test_empty_input() {
        let assembler = ContextAssembler::default();
        let context = assembler.assemble(Vec::<&str>::new());
        assert_eq!(context.text, "");
        assert_eq!(context.included, 0);
    }
}
