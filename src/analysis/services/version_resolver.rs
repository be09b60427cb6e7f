use semver::{Version as SemVersion, VersionReq};

/// VersionResolver picks the concrete version a declared range resolves to.
///
/// Ranges are interpreted with the `semver` crate after normalising npm
/// (space-separated comparators, `||` alternatives, hyphen ranges) and PyPI
/// (`==`, `~=`, `!=`) syntax. Versions that are not semver are padded
/// (`2.1` -> `2.1.0`) or, failing that, only ever matched exactly.
pub struct VersionResolver;

impl VersionResolver {
    /// Returns the highest available version satisfying `range`
    pub fn resolve<'a, I>(range: &str, available: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let available: Vec<&str> = available.into_iter().collect();
        let range = range.trim();

        if Self::is_wildcard(range) {
            return Self::highest(&available, |v| v.pre.is_empty())
                .or_else(|| available.last().map(|v| v.to_string()));
        }

        // Exact string match wins for non-semver versions ("2024.1b1", git tags)
        if let Some(exact) = available
            .iter()
            .find(|v| **v == range || **v == range.trim_start_matches("=="))
        {
            if Self::parse_version(exact).is_none() {
                return Some(exact.to_string());
            }
        }

        let (requirements, excluded) = Self::parse_range(range)?;
        Self::highest(&available, |v| {
            requirements.iter().any(|req| req.matches(v)) && !excluded.contains(v)
        })
    }

    fn is_wildcard(range: &str) -> bool {
        matches!(range, "" | "*" | "x" | "X" | "latest")
    }

    fn highest<F>(available: &[&str], accept: F) -> Option<String>
    where
        F: Fn(&SemVersion) -> bool,
    {
        available
            .iter()
            .filter_map(|raw| Self::parse_version(raw).map(|parsed| (parsed, *raw)))
            .filter(|(parsed, _)| accept(parsed))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, raw)| raw.to_string())
    }

    /// Lenient version parsing: strips a leading `v` and pads missing components
    pub fn parse_version(raw: &str) -> Option<SemVersion> {
        let raw = raw.trim().trim_start_matches('v');
        if let Ok(v) = SemVersion::parse(raw) {
            return Some(v);
        }
        let numeric: Vec<&str> = raw.split('.').collect();
        if numeric.is_empty()
            || numeric.len() > 3
            || !numeric
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        {
            return None;
        }
        let mut padded = numeric.clone();
        while padded.len() < 3 {
            padded.push("0");
        }
        SemVersion::parse(&padded.join(".")).ok()
    }

    /// Splits `||` alternatives into requirements plus `!=` exclusions
    fn parse_range(range: &str) -> Option<(Vec<VersionReq>, Vec<SemVersion>)> {
        let mut requirements = Vec::new();
        let mut excluded = Vec::new();

        for alternative in range.split("||") {
            let mut comparators = Vec::new();
            for part in Self::comparators(alternative.trim()) {
                if let Some(version) = part.strip_prefix("!=") {
                    excluded.push(Self::parse_version(version.trim())?);
                } else if let Some(version) = part.strip_prefix("===") {
                    comparators.push(format!("={}", version.trim()));
                } else if let Some(version) = part.strip_prefix("==") {
                    comparators.push(format!("={}", version.trim().trim_end_matches(".*")));
                } else if let Some(version) = part.strip_prefix("~=") {
                    comparators.push(format!("~{}", version.trim()));
                } else {
                    comparators.push(part);
                }
            }
            if comparators.is_empty() {
                comparators.push("*".to_string());
            }
            requirements.push(VersionReq::parse(&comparators.join(", ")).ok()?);
        }

        Some((requirements, excluded))
    }

    /// Tokenises one alternative into comparator strings
    fn comparators(alternative: &str) -> Vec<String> {
        // Hyphen range: "1.2.3 - 2.0.0"
        if let Some((low, high)) = alternative.split_once(" - ") {
            return vec![format!(">={}", low.trim()), format!("<={}", high.trim())];
        }

        let mut out: Vec<String> = Vec::new();
        let mut pending_operator: Option<String> = None;
        for token in alternative
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            if token.chars().all(|c| "<>=!~^".contains(c)) {
                pending_operator = Some(token.to_string());
                continue;
            }
            match pending_operator.take() {
                Some(op) => out.push(format!("{}{}", op, token)),
                None => out.push(Self::bare_version(token)),
            }
        }
        out
    }

    /// npm reads an operator-less `1.2.3` as exact and `1.2` as `1.2.x`;
    /// the semver crate would read both as caret requirements
    fn bare_version(token: &str) -> String {
        let starts_numeric = token.trim_start_matches('v').starts_with(|c: char| c.is_ascii_digit());
        if !starts_numeric || token.contains(['x', 'X', '*']) {
            return token.to_string();
        }
        let version = token.trim_start_matches('v');
        if version.split('.').count() >= 3 {
            format!("={}", version)
        } else {
            format!("~{}", version)
        }
    }
}
