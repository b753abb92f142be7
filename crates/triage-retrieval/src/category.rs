//! Keyword-based playbook categorisation

use triage_model::Category;

/// Priority-ordered keyword table; the first category with any hit wins
pub const CATEGORY_KEYWORDS: [(Category, &[&str]); 7] = [
    (Category::Database, &["db", "database", "postgres", "mysql", "sql"]),
    (Category::ApiService, &["api", "service", "gateway", "rest", "http"]),
    (Category::Infrastructure, &["infra", "kubernetes", "k8s", "docker", "aws"]),
    (Category::Network, &["network", "dns", "firewall", "load balancer"]),
    (Category::Performance, &["performance", "latency", "slow", "timeout"]),
    (Category::DataPipeline, &["kafka", "pipeline", "stream", "queue", "consumer"]),
    (Category::Security, &["security", "auth", "ssl", "certificate"]),
];

/// Infer a category from a file stem and document text
///
/// Matching is case-insensitive substring search over both inputs.
/// Returns [`Category::General`] when no keyword matches.
#[must_use]
pub fn infer_category(stem: &str, content: &str) -> Category {
    let stem = stem.to_lowercase();
    let content = content.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|kw| stem.contains(kw) || content.contains(kw))
        })
        .map_or(Category::General, |(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_alone_can_decide() {
        assert_eq!(infer_category("postgres_failover", "nothing"), Category::Database);
        assert_eq!(infer_category("kafka_lag", ""), Category::DataPipeline);
    }

    #[test]
    fn priority_order_wins_over_later_matches() {
        // mentions both auth and database; database comes first
        let content = "Auth tokens are stored in the database";
        assert_eq!(infer_category("tokens", content), Category::Database);
    }

    #[test]
    fn content_is_case_insensitive() {
        assert_eq!(infer_category("x", "Kubernetes node pressure"), Category::Infrastructure);
    }

    #[test]
    fn no_match_is_general() {
        assert_eq!(infer_category("misc", "Write a note."), Category::General);
    }
}
