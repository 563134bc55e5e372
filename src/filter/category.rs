/// A category posts can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub key: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
}

/// Known categories, in display order. Number keys 1-9 map onto this list.
pub const CATEGORIES: [Category; 9] = [
    Category { key: "education", icon: "📚", label: "Education" },
    Category { key: "insights", icon: "💡", label: "Thoughts & Ideas" },
    Category { key: "news", icon: "📰", label: "News" },
    Category { key: "art", icon: "🎨", label: "Art" },
    Category { key: "tech", icon: "💻", label: "Technology" },
    Category { key: "lifestyle", icon: "🌱", label: "Lifestyle & Wellness" },
    Category { key: "personal", icon: "📷", label: "Personal Stories" },
    Category { key: "humor", icon: "😂", label: "Humor" },
    Category { key: "question", icon: "❓", label: "Question" },
];

/// Catalog entry for `key`. Posts may carry keys outside the catalog.
pub fn lookup(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.key == key)
}

/// Category bound to number key `n` (1-based).
pub fn by_number(n: usize) -> Option<&'static Category> {
    n.checked_sub(1).and_then(|i| CATEGORIES.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(lookup("tech").map(|c| c.label), Some("Technology"));
        assert!(lookup("cooking").is_none());
    }

    #[test]
    fn test_by_number() {
        assert_eq!(by_number(1).map(|c| c.key), Some("education"));
        assert_eq!(by_number(9).map(|c| c.key), Some("question"));
        assert!(by_number(0).is_none());
        assert!(by_number(10).is_none());
    }
}
