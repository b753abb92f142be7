use proptest::prelude::*;
use triage_core::SeverityPolicy;
use triage_model::{Category, Classification, IncidentAlert, IncidentContext, Severity};

fn severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(vec![Severity::Sev1, Severity::Sev2, Severity::Sev3, Severity::Sev4])
}

fn service() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["auth-service", "payment-api", "orders", "reporting", "search"])
        .prop_map(str::to_string)
}

fn incident(description: &str, services: &[String], failed: f64, cpu: f64) -> IncidentContext {
    let mut alert = IncidentAlert::new("INC-P", "2024-01-01T00:00:00Z", "prometheus", "Alert", description)
        .with_metric("failed_requests_per_min", failed)
        .with_metric("cpu_utilization", cpu);
    for s in services {
        alert = alert.with_service(s.clone());
    }
    IncidentContext::new(alert).unwrap()
}

proptest! {
    #[test]
    fn prop_enforce_never_lowers_severity(
        generated in severity(),
        services in proptest::collection::vec(service(), 1..4),
        description in prop::sample::select(vec!["service down", "slow dashboard", "connection refused to postgres", "fine"]),
        failed in 0.0f64..500.0,
        cpu in 0.0f64..100.0,
    ) {
        let ctx = incident(description, &services, failed, cpu);
        let mut classification = Classification::new(generated, Category::Infrastructure, 0.5, "r");
        let assessment = SeverityPolicy::default().enforce(&ctx, &mut classification);

        prop_assert!(!generated.is_more_severe_than(classification.severity));
        if let Some(floor) = assessment.floor {
            prop_assert!(!floor.is_more_severe_than(classification.severity));
        }
    }

    #[test]
    fn prop_critical_outage_is_always_sev1(generated in severity(), extra in proptest::collection::vec(service(), 0..3)) {
        let mut services = vec!["payment-api".to_string()];
        services.extend(extra);
        let ctx = incident("payment api is down for all users", &services, 0.0, 10.0);
        let mut classification = Classification::new(generated, Category::ApiService, 0.9, "r");
        SeverityPolicy::default().enforce(&ctx, &mut classification);

        prop_assert_eq!(classification.severity, Severity::Sev1);
    }
}
