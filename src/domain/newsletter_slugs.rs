/// The comma-separated list of newsletter slugs a request names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewsletterSlugs(Vec<String>);

impl NewsletterSlugs {
    /// Blank entries are dropped and duplicates collapsed, keeping first-seen order.
    pub fn parse(s: &str) -> NewsletterSlugs {
        let mut slugs: Vec<String> = Vec::new();

        for slug in s.split(',').map(str::trim).filter(|slug| !slug.is_empty()) {
            if !slugs.iter().any(|seen| seen == slug) {
                slugs.push(slug.to_string());
            }
        }

        Self(slugs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.0.iter().any(|s| s == slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}
