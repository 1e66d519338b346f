use crate::domain::product::ProductType;
use std::collections::HashMap;
use std::path::Path;

/// Prefixes `https://` when the value carries no scheme. Blank stays blank.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn normalize_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = lowered.replace("주식회사", "").replace("(주)", "");
    stripped
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '·' | 'ㆍ' | '_' | '.' | '/' | '(' | ')' | '-'))
        .collect()
}

fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.contains('|') {
        return trimmed
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
    }
    trimmed
        .split('|')
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

/// Official-page overrides read from a `key=url` file.
///
/// A key is either a product id or a `|`-joined combination of product type, provider and
/// product name (`card|신한카드|생활혜택 플러스`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOverrides {
    entries: HashMap<String, String>,
}

impl UrlOverrides {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, url)) = line.split_once('=') else {
                continue;
            };
            let key = normalize_key(key);
            let url = normalize_url(url);
            if !key.is_empty() && !url.is_empty() {
                entries.insert(key, url);
            }
        }
        Self { entries }
    }

    /// A missing file means no overrides; an unreadable one is logged and ignored.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let overrides = Self::parse(&text);
                tracing::info!(path = %path.display(), entries = overrides.len(), "loaded product url overrides");
                overrides
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no product url override file");
                Self::default()
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read product url overrides");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(
        &self,
        product_id: &str,
        product_type: ProductType,
        provider: &str,
        name: &str,
        fallback_url: &str,
    ) -> String {
        if self.entries.is_empty() {
            return normalize_url(fallback_url);
        }

        let kind = normalize_token(product_type.as_str());
        let provider = normalize_token(provider);
        let name = normalize_token(name);

        let mut keys = vec![normalize_key(product_id)];
        if !provider.is_empty() && !name.is_empty() {
            keys.push(format!("{kind}|{provider}|{name}"));
            keys.push(format!("{provider}|{name}"));
        }
        if !name.is_empty() {
            keys.push(format!("{kind}|{name}"));
        }

        keys.iter()
            .filter(|k| !k.is_empty())
            .find_map(|k| self.entries.get(k))
            .cloned()
            .unwrap_or_else(|| normalize_url(fallback_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "
# comment
acc_kb_salary = obank.kbstar.com/salary
card | 신한카드 | 생활혜택 플러스 = https://www.shinhancard.com/plus
broken line
=https://nowhere.example
";

    #[test]
    fn parses_lines_and_skips_noise() {
        let overrides = UrlOverrides::parse(FILE);
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn resolves_by_id_then_by_names() {
        let overrides = UrlOverrides::parse(FILE);
        assert_eq!(
            overrides.resolve("ACC_KB_SALARY", ProductType::Account, "KB국민은행", "급여우대", "x"),
            "https://obank.kbstar.com/salary"
        );
        assert_eq!(
            overrides.resolve("other", ProductType::Card, "신한카드", "생활혜택  플러스", "x"),
            "https://www.shinhancard.com/plus"
        );
        assert_eq!(
            overrides.resolve("other", ProductType::Card, "삼성카드", "트래블", "www.samsungcard.com"),
            "https://www.samsungcard.com"
        );
    }

    #[test]
    fn normalizes_scheme() {
        assert_eq!(normalize_url(" http://a.example "), "http://a.example");
        assert_eq!(normalize_url("a.example"), "https://a.example");
        assert_eq!(normalize_url("   "), "");
    }
}
