//! Testing utilities for the incident triage workspace
//!
//! Scripted backends, incident fixtures and a small playbook corpus.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use triage_index::{Embedder, EmbeddingError};
use triage_llm::{GenerationClient, GenerationError, GenerationRequest};
use triage_model::{IncidentAlert, IncidentContext};

enum Scripted {
    Reply(String),
    Unavailable(String),
}

/// Generation client replaying queued responses in call order
///
/// Every request is recorded. Once the queue is empty the default reply is
/// used, or an `InvalidResponse` error when there is none.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<GenerationRequest>>,
    default_reply: Option<String>,
    unhealthy: Option<String>,
    latency: Option<Duration>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGenerator {
    pub const MODEL: &'static str = "scripted";

    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            default_reply: None,
            unhealthy: None,
            latency: None,
        }
    }

    /// Queue a reply
    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.queue.lock().push_back(Scripted::Reply(text.into()));
        self
    }

    /// Queue an unreachable-backend failure
    #[must_use]
    pub fn with_unavailable(self, reason: impl Into<String>) -> Self {
        self.queue.lock().push_back(Scripted::Unavailable(reason.into()));
        self
    }

    /// Reply used once the queue is drained
    #[must_use]
    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    /// Fail health checks with `reason`
    #[must_use]
    pub fn unhealthy(mut self, reason: impl Into<String>) -> Self {
        self.unhealthy = Some(reason.into());
        self
    }

    /// Delay every `generate` call by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Replies still queued
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.requests.lock().push(request.clone());
        let next = self.queue.lock().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Unavailable(reason)) => Err(GenerationError::Unavailable {
                backend: Self::MODEL.to_string(),
                reason,
            }),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| GenerationError::InvalidResponse("script exhausted".to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        match &self.unhealthy {
            Some(reason) => Err(GenerationError::Unavailable {
                backend: Self::MODEL.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn model_name(&self) -> &str {
        Self::MODEL
    }
}

/// Embedder with one axis per keyword group
///
/// Each axis counts case-insensitive occurrences of its keywords, so
/// similarity is fully predictable from the text. Text matching no keyword
/// embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    axes: Vec<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn new(axes: &[&[&str]]) -> Self {
        Self {
            axes: axes
                .iter()
                .map(|group| group.iter().map(|k| k.to_lowercase()).collect())
                .collect(),
        }
    }

    /// Axes matching [`write_playbook_corpus`]: auth, database, streaming
    pub fn incident_axes() -> Self {
        Self::new(&[
            &["auth", "login", "redis", "refused"],
            &["database", "postgres", "pool", "pgbouncer"],
            &["kafka", "consumer", "lag", "partition"],
        ])
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        #[allow(clippy::cast_precision_loss)]
        let mut v: Vec<f32> = self
            .axes
            .iter()
            .map(|group| group.iter().map(|k| lower.matches(k.as_str()).count()).sum::<usize>() as f32)
            .collect();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.axes.len()
    }

    fn model_name(&self) -> &str {
        "keyword-axes"
    }
}

/// Embedder whose every call fails as unreachable
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableEmbedder;

#[async_trait]
impl Embedder for UnreachableEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable {
            backend: "unreachable".to_string(),
            reason: "connection refused".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "unreachable"
    }
}

/// Auth service outage: redis refusing connections, 1310 failed requests/min
pub fn auth_outage_incident() -> IncidentContext {
    let alert = IncidentAlert::new(
        "INC-AUTH-001",
        "2024-01-15T10:30:00Z",
        "prometheus",
        "Auth Service Errors",
        "auth-service returning 503 on login, redis connection refused",
    )
    .with_metric("error_rate", 8.5)
    .with_metric("failed_requests_per_min", 1310.0)
    .with_service("auth-service")
    .with_tag("customer-facing");
    IncidentContext::new(alert)
        .unwrap()
        .with_logs("2024-01-15 10:29:58 ERROR auth-service: redis 10.0.3.7:6379 Connection refused")
}

/// Orders database pool at 95/100 with connection timeouts
pub fn db_pool_incident() -> IncidentContext {
    let alert = IncidentAlert::new(
        "INC-DB-002",
        "2024-01-16T08:00:00Z",
        "datadog",
        "Database Pool Saturation",
        "postgres connection pool for orders at 95/100",
    )
    .with_metric("db_pool_utilization", 0.95)
    .with_metric("p99_latency_ms", 2400.0)
    .with_service("orders");
    IncidentContext::new(alert)
        .unwrap()
        .with_logs("WARN orders: could not connect to postgres: connection timeout after 30s")
}

pub const AUTH_PLAYBOOK: &str = "# Auth Service Outage

## Overview
The login API returns 503 when the session cache is unreachable.

## Root Causes
- Redis cache down or refusing connections
- Connection refused from auth-service to redis

## Immediate Mitigation
1. Restart the redis pod: `kubectl rollout restart statefulset/redis`
2. Point auth-service at the replica cache

## Escalation
Page the identity on-call.
";

pub const DB_POOL_PLAYBOOK: &str = "# Database Connection Pool Exhaustion

## Root Causes
- Connection leak in the orders code path
- Long-running queries holding postgres connections

## Immediate Mitigation
1. Kill idle-in-transaction sessions
2. Recycle pgbouncer

## Follow-up
Add pool saturation alerts.
";

pub const KAFKA_PLAYBOOK: &str = "# Kafka Consumer Lag

## Root Causes
- Consumer group rebalancing loop
- Partition skew on the hot topic

## Immediate Mitigation
1. Scale the consumer group
2. Pause producers of the hot topic
";

/// Write the three fixture playbooks into `dir`
///
/// Categories inferred from them: API/Service, Database, Data Pipeline.
pub fn write_playbook_corpus(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("auth_service_outage.md"), AUTH_PLAYBOOK)?;
    std::fs::write(dir.join("database_connection_pool.md"), DB_POOL_PLAYBOOK)?;
    std::fs::write(dir.join("kafka_consumer_lag.md"), KAFKA_PLAYBOOK)?;
    Ok(())
}

/// Classification reply
pub fn classification_json(severity: &str, category: &str, confidence: f64) -> String {
    serde_json::json!({
        "severity": severity,
        "category": category,
        "confidence": confidence,
        "reasoning": format!("{severity} because of fixture signals"),
    })
    .to_string()
}

/// Root-cause reply with `(cause, likelihood)` findings
pub fn root_cause_json(causes: &[(&str, f64)]) -> String {
    let findings: Vec<_> = causes
        .iter()
        .map(|(cause, likelihood)| {
            serde_json::json!({"cause": cause, "likelihood": likelihood, "evidence": "fixture"})
        })
        .collect();
    serde_json::json!({
        "root_causes": findings,
        "primary_cause": causes.first().map(|(c, _)| *c).unwrap_or_default(),
        "reasoning": "fixture analysis",
    })
    .to_string()
}

/// Mitigation reply with one cited action
pub fn mitigation_json(step: &str, citation: &str) -> String {
    serde_json::json!({
        "immediate_actions": [
            {"step": step, "command": "kubectl get pods", "expected_outcome": "service recovers", "citation": citation}
        ],
        "investigation_steps": [{"step": "Review recent deploys", "citation": null}],
        "escalation": {"when": "no recovery in 15 minutes", "who": "SRE on-call", "channel": "#incidents"},
        "summary": "fixture plan",
    })
    .to_string()
}
