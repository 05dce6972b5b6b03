//! Style scope management for local style blocks
//!
//! Every local style block gets a scope selector when first visited. The
//! scope is the enclosing element's `#id` when it has one; otherwise a
//! fresh `chtl-s<N>` class is allocated and added to the element. The
//! counter is per-document and assigned in generation encounter order,
//! which keeps scope ids stable across runs for identical input.

/// Allocates document-unique scope classes.
pub struct ScopeAllocator {
    next: usize,
}

impl Default for ScopeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next scope class name (`chtl-s1`, `chtl-s2`, ...).
    pub fn fresh_class(&mut self) -> String {
        let class = format!("chtl-s{}", self.next);
        self.next += 1;
        class
    }
}

/// Rewrite a local-block selector into its scoped form: `&` references
/// are replaced by the scope selector, anything else nests under it.
pub fn scope_selector(selector: &str, scope: &str) -> String {
    if selector.contains('&') {
        selector.replace('&', scope)
    } else {
        format!("{} {}", scope, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_counts_from_one() {
        let mut scopes = ScopeAllocator::new();
        assert_eq!(scopes.fresh_class(), "chtl-s1");
        assert_eq!(scopes.fresh_class(), "chtl-s2");
    }

    #[test]
    fn test_reference_selector_replacement() {
        assert_eq!(scope_selector("&:hover", ".chtl-s1"), ".chtl-s1:hover");
        assert_eq!(scope_selector("& + &", "#top"), "#top + #top");
    }

    #[test]
    fn test_plain_selector_nests_under_scope() {
        assert_eq!(scope_selector(".note", ".chtl-s1"), ".chtl-s1 .note");
        assert_eq!(scope_selector("span", "#box"), "#box span");
    }
}
