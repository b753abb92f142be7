//! Deterministic severity floor
//!
//! The classifier prompt states the escalation rules, but the model may
//! ignore them. [`SeverityPolicy`] re-derives a minimum severity from hard
//! signals in the alert and the final severity is never less severe than
//! that floor.
//!
//! Rules, in order:
//! 1. auth/payment/checkout service with an outage keyword or more than
//!    100 failed requests per minute: SEV1
//! 2. database connection errors: SEV2
//! 3. resource utilisation above 85%: SEV2
//! 4. more than one affected service escalates a floor by one level
//! 5. a generated SEV2 becomes SEV1 when the incident is customer-facing
//!    and shows an outage signal

use once_cell::sync::Lazy;
use regex::Regex;
use triage_model::{Classification, IncidentContext, Severity};

static OUTAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(down|unavailable|refused|outage|unreachable)\b").expect("static pattern")
});

static DATABASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(database|db|postgres(ql)?|mysql|sql|connection pool|db pool)\b")
        .expect("static pattern")
});

static CONNECTION_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(connection (error|refused|reset|timeout|timed out)|too many connections|pool (is )?exhausted|could not connect|connection errors?)",
    )
    .expect("static pattern")
});

// Keys whose value is a share of capacity, as a percentage or a fraction
static SHARE_METRIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(percent|pct|utili[sz]ation|ratio|saturation)").expect("static pattern"));

static RESOURCE_METRIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(cpu|memory|mem_|disk|pool|usage)").expect("static pattern"));

// Keys carrying an absolute quantity rather than a share
static ABSOLUTE_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(_[kmgt]i?b\b|bytes|size|count|total|max|min|limit|capacity|_ms\b|seconds|secs|connections)")
        .expect("static pattern")
});

static FAILED_REQUESTS_METRIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)fail.*(req|transaction)|(req|transaction).*fail").expect("static pattern")
});

/// Suffixes naming the capacity half of a used/capacity metric pair
const CAPACITY_SUFFIXES: [&str; 4] = ["_max_size", "_max", "_limit", "_capacity"];

/// Suffixes naming the used half of a used/capacity metric pair
const USED_SUFFIXES: [&str; 3] = ["_used", "_active", "_in_use"];

/// Signals that raised the floor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeverityAssessment {
    /// Minimum severity implied by hard signals
    pub floor: Option<Severity>,
    /// Human-readable justification per rule that fired
    pub reasons: Vec<String>,
    /// Incident is customer-facing with an outage signal
    pub customer_facing_outage: bool,
}

/// Hard-signal severity policy
#[derive(Debug, Clone)]
pub struct SeverityPolicy {
    critical_services: Vec<String>,
    customer_facing_tags: Vec<String>,
    failed_requests_per_min: f64,
    resource_percent: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            critical_services: vec!["auth".into(), "payment".into(), "checkout".into()],
            customer_facing_tags: vec![
                "customer-facing".into(),
                "customer_facing".into(),
                "external".into(),
                "public".into(),
            ],
            failed_requests_per_min: 100.0,
            resource_percent: 85.0,
        }
    }
}

impl SeverityPolicy {
    /// Create policy with default thresholds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the critical service keywords
    #[must_use]
    pub fn with_critical_services(mut self, services: Vec<String>) -> Self {
        self.critical_services = services.into_iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// Evaluate the hard signals of an incident
    #[must_use]
    pub fn assess(&self, ctx: &IncidentContext) -> SeverityAssessment {
        let alert = &ctx.alert;
        let text = [
            alert.alert_name.as_str(),
            alert.description.as_str(),
            ctx.logs.as_deref().unwrap_or_default(),
            ctx.additional_context.as_deref().unwrap_or_default(),
        ]
        .join("\n");

        let critical = self.critical_target(ctx);
        let outage = OUTAGE.is_match(&text);
        let failed_requests = alert
            .metrics
            .iter()
            .filter(|(k, _)| FAILED_REQUESTS_METRIC.is_match(k))
            .map(|(_, v)| *v)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

        let mut out = SeverityAssessment::default();

        if let Some(service) = &critical {
            if outage {
                out.raise(Severity::Sev1, format!("critical service '{service}' shows an outage signal"));
            }
            if let Some(n) = failed_requests.filter(|n| *n > self.failed_requests_per_min) {
                out.raise(
                    Severity::Sev1,
                    format!("critical service '{service}' has {n} failed requests/min"),
                );
            }
        }

        if DATABASE.is_match(&text) && CONNECTION_ERROR.is_match(&text) {
            out.raise(Severity::Sev2, "database connection errors present".to_string());
        }

        if let Some((name, pct)) = self.exhausted_resource(ctx) {
            out.raise(Severity::Sev2, format!("resource '{name}' at {pct:.0}%"));
        }

        if alert.affected_services.len() > 1 {
            if let Some(floor) = out.floor {
                let escalated = floor.escalate();
                if escalated != floor {
                    out.floor = Some(escalated);
                    out.reasons.push(format!(
                        "{} affected services escalate {floor} to {escalated}",
                        alert.affected_services.len()
                    ));
                }
            }
        }

        out.customer_facing_outage = outage && (critical.is_some() || self.tagged_customer_facing(ctx));
        out
    }

    /// Raise `classification` to the floor and apply the SEV1/SEV2 tie rule
    ///
    /// Each adjustment is recorded as a warning on the classification.
    pub fn enforce(&self, ctx: &IncidentContext, classification: &mut Classification) -> SeverityAssessment {
        let assessment = self.assess(ctx);
        let generated = classification.severity;

        if let Some(floor) = assessment.floor {
            if floor.is_more_severe_than(classification.severity) {
                classification.severity = floor;
                classification.warn(format!(
                    "severity raised from {generated} to {floor}: {}",
                    assessment.reasons.join("; ")
                ));
            }
        }

        if classification.severity == Severity::Sev2 && assessment.customer_facing_outage {
            classification.severity = Severity::Sev1;
            classification.warn("customer-facing outage: SEV2 resolved to SEV1".to_string());
        }

        if classification.severity != generated {
            tracing::warn!(%generated, final_severity = %classification.severity, "severity escalated by policy");
        }
        assessment
    }

    fn critical_target(&self, ctx: &IncidentContext) -> Option<String> {
        let alert = &ctx.alert;
        let mut candidates = alert
            .affected_services
            .iter()
            .chain(alert.tags.iter())
            .map(String::as_str)
            .chain(std::iter::once(alert.alert_name.as_str()));
        candidates.find_map(|c| {
            let lower = c.to_lowercase();
            self.critical_services
                .iter()
                .any(|k| lower.contains(k.as_str()))
                .then(|| c.to_string())
        })
    }

    fn tagged_customer_facing(&self, ctx: &IncidentContext) -> bool {
        ctx.alert.tags.iter().any(|t| {
            let lower = t.to_lowercase();
            self.customer_facing_tags.iter().any(|k| lower == *k)
        })
    }

    fn exhausted_resource(&self, ctx: &IncidentContext) -> Option<(String, f64)> {
        let metrics = &ctx.alert.metrics;
        let shares = metrics
            .iter()
            .filter_map(|(k, v)| utilisation_percent(k, *v).map(|pct| (k.clone(), pct)));

        // e.g. db_pool_active against db_pool_max_size
        let pairs = metrics.iter().filter_map(|(k, capacity)| {
            let prefix = CAPACITY_SUFFIXES.iter().find_map(|s| k.strip_suffix(s))?;
            if *capacity <= 0.0 {
                return None;
            }
            let used = USED_SUFFIXES
                .iter()
                .find_map(|s| metrics.get(&format!("{prefix}{s}")))?;
            Some((prefix.to_string(), used / capacity * 100.0))
        });

        shares
            .chain(pairs)
            .find(|(_, pct)| *pct > self.resource_percent && *pct <= 100.0)
    }
}

/// Percentage of capacity a single metric reports, if it reports one
///
/// Share keys (`percent`, `pct`, `utilization`, `ratio`, `saturation`) are
/// read as percentages, or as fractions when at most 1. Other resource keys
/// count only as fractions of 1 and only without an absolute unit.
fn utilisation_percent(name: &str, value: f64) -> Option<f64> {
    let fraction = (0.0..=1.0).contains(&value);
    if SHARE_METRIC.is_match(name) {
        return Some(if fraction { value * 100.0 } else { value });
    }
    if RESOURCE_METRIC.is_match(name) && !ABSOLUTE_UNIT.is_match(name) && fraction {
        return Some(value * 100.0);
    }
    None
}

impl SeverityAssessment {
    fn raise(&mut self, level: Severity, reason: String) {
        self.floor = Some(self.floor.map_or(level, |f| f.most_severe(level)));
        self.reasons.push(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_model::{Category, IncidentAlert};

    fn ctx(alert: IncidentAlert, logs: &str) -> IncidentContext {
        IncidentContext::new(alert).unwrap().with_logs(logs)
    }

    fn alert(name: &str, description: &str) -> IncidentAlert {
        IncidentAlert::new("INC-1", "2024-01-15T10:30:00Z", "prometheus", name, description)
    }

    #[test]
    fn auth_outage_floors_at_sev1() {
        let c = ctx(
            alert("Auth errors", "login failing").with_service("auth-service"),
            "ERROR redis: Connection refused",
        );
        let a = SeverityPolicy::new().assess(&c);
        assert_eq!(a.floor, Some(Severity::Sev1));
        assert!(a.customer_facing_outage);
    }

    #[test]
    fn failed_requests_threshold_floors_at_sev1() {
        let c = ctx(
            alert("Payment latency", "slow")
                .with_service("payment-api")
                .with_metric("failed_requests_per_min", 450.0),
            "",
        );
        assert_eq!(SeverityPolicy::new().assess(&c).floor, Some(Severity::Sev1));

        let quiet = ctx(
            alert("Payment latency", "slow")
                .with_service("payment-api")
                .with_metric("failed_requests_per_min", 40.0),
            "",
        );
        assert_eq!(SeverityPolicy::new().assess(&quiet).floor, None);
    }

    #[test]
    fn database_connection_errors_floor_at_sev2() {
        let c = ctx(
            alert("DB pool high", "postgres pool exhausted on orders"),
            "could not connect: too many connections",
        );
        assert_eq!(SeverityPolicy::new().assess(&c).floor, Some(Severity::Sev2));
    }

    #[test]
    fn resource_exhaustion_reads_fractions_and_percentages() {
        let pct = ctx(alert("CPU", "hot").with_metric("cpu_usage_percent", 92.0), "");
        assert_eq!(SeverityPolicy::new().assess(&pct).floor, Some(Severity::Sev2));
        let frac = ctx(alert("Mem", "hot").with_metric("memory_utilization", 0.9), "");
        assert_eq!(SeverityPolicy::new().assess(&frac).floor, Some(Severity::Sev2));
        let fine = ctx(alert("CPU", "ok").with_metric("cpu_usage_percent", 70.0), "");
        assert_eq!(SeverityPolicy::new().assess(&fine).floor, None);
    }

    #[test]
    fn absolute_quantities_are_not_utilisation() {
        let c = ctx(
            alert("Disk", "growing")
                .with_metric("disk_usage_gb", 90.0)
                .with_metric("db_pool_max_size", 100.0)
                .with_metric("memory_usage_bytes", 0.5)
                .with_metric("cpu_count", 96.0),
            "",
        );
        assert_eq!(SeverityPolicy::new().assess(&c).floor, None);
    }

    #[test]
    fn pool_usage_against_capacity_counts_as_utilisation() {
        let full = ctx(
            alert("DB pool", "busy")
                .with_metric("db_pool_active", 95.0)
                .with_metric("db_pool_max_size", 100.0),
            "",
        );
        let a = SeverityPolicy::new().assess(&full);
        assert_eq!(a.floor, Some(Severity::Sev2));
        assert_eq!(a.reasons, vec!["resource 'db_pool' at 95%".to_string()]);

        let roomy = ctx(
            alert("DB pool", "busy")
                .with_metric("db_pool_active", 40.0)
                .with_metric("db_pool_max_size", 100.0),
            "",
        );
        assert_eq!(SeverityPolicy::new().assess(&roomy).floor, None);
    }

    #[test]
    fn multiple_services_escalate_existing_floor_only() {
        let c = ctx(
            alert("CPU", "hot")
                .with_metric("cpu_usage_percent", 92.0)
                .with_service("orders")
                .with_service("inventory"),
            "",
        );
        assert_eq!(SeverityPolicy::new().assess(&c).floor, Some(Severity::Sev1));

        let none = ctx(alert("Note", "fyi").with_service("a").with_service("b"), "");
        assert_eq!(SeverityPolicy::new().assess(&none).floor, None);
    }

    #[test]
    fn enforce_never_lowers_and_records_warning() {
        let c = ctx(alert("Auth down", "auth unavailable").with_service("auth"), "");
        let mut cls = Classification::new(Severity::Sev3, Category::ApiService, 0.9, "model says sev3");
        SeverityPolicy::new().enforce(&c, &mut cls);
        assert_eq!(cls.severity, Severity::Sev1);
        assert_eq!(cls.warnings.len(), 1);

        let calm = ctx(alert("Note", "fyi"), "");
        let mut cls = Classification::new(Severity::Sev1, Category::ApiService, 0.9, "");
        SeverityPolicy::new().enforce(&calm, &mut cls);
        assert_eq!(cls.severity, Severity::Sev1);
        assert!(cls.warnings.is_empty());
    }

    #[test]
    fn tie_rule_promotes_customer_facing_sev2() {
        let c = ctx(
            alert("Search down", "search is unavailable").with_tag("customer-facing"),
            "",
        );
        let mut cls = Classification::new(Severity::Sev2, Category::ApiService, 0.7, "");
        SeverityPolicy::new().enforce(&c, &mut cls);
        assert_eq!(cls.severity, Severity::Sev1);

        let internal = ctx(alert("Wiki down", "wiki is unavailable").with_tag("internal"), "");
        let mut cls = Classification::new(Severity::Sev2, Category::ApiService, 0.7, "");
        SeverityPolicy::new().enforce(&internal, &mut cls);
        assert_eq!(cls.severity, Severity::Sev2);
    }
}
