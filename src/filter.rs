use regex::{Regex, RegexBuilder};

/// Which drained lines get printed. An empty or missing pattern lets
/// everything through.
#[derive(Debug, Default)]
pub struct LineFilter {
    re: Option<Regex>,
}

impl LineFilter {
    pub fn new(pattern: Option<&str>) -> anyhow::Result<Self> {
        let re = match pattern {
            Some(p) if !p.is_empty() => Some(RegexBuilder::new(p).case_insensitive(true).build()?),
            _ => None,
        };
        Ok(Self { re })
    }

    pub fn matches(&self, line: &str) -> bool {
        self.re.as_ref().is_none_or(|re| re.is_match(line))
    }
}
