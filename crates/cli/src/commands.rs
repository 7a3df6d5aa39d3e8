//! CLI commands

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use kycflow_core::{
    verify_chain, AlertStatus, AlertType, ComplianceAlert, Customer, CustomerIntake,
    CustomerRecord, CustomerStatus, Document, DocumentType, DocumentUpload, RiskAssessment,
    RiskLevel, Severity, WorkflowState,
};
use kycflow_engine::JobReport;
use kycflow_store::{AlertFilter, CustomerFilter, StoreStats};
use uuid::Uuid;

use crate::context::AppContext;

/// Register a customer from an intake JSON document
pub async fn intake(ctx: &AppContext, json: &str) -> Result<CustomerRecord, anyhow::Error> {
    let intake: CustomerIntake =
        serde_json::from_str(json).context("intake must be a customer JSON document")?;
    let record = ctx.service.create_customer(intake, &ctx.actor).await?;

    println!(
        "✅ Created customer {} ({})",
        record.customer.customer_reference,
        record.id()
    );
    Ok(record)
}

/// Document metadata accepted by `upload-document`
pub struct UploadArgs {
    pub document_type: DocumentType,
    pub name: String,
    pub file_hash: String,
    pub size: u64,
    pub number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

pub async fn upload_document(
    ctx: &AppContext,
    customer_id: Uuid,
    args: UploadArgs,
) -> Result<Document, anyhow::Error> {
    let upload = DocumentUpload {
        document_type: args.document_type,
        document_name: args.name,
        file_hash: args.file_hash,
        file_size: args.size,
        document_number: args.number,
        issue_date: args.issue_date,
        expiry_date: args.expiry_date,
    };
    let document = ctx
        .service
        .upload_document(customer_id, upload, &ctx.actor)
        .await?;

    println!(
        "✅ Uploaded {} '{}' (id: {})",
        document.document_type, document.document_name, document.id
    );
    Ok(document)
}

/// Verify (or with `reject`, reject) a pending document
pub async fn verify_document(
    ctx: &AppContext,
    customer_id: Uuid,
    document_id: Uuid,
    reject: bool,
    notes: &str,
) -> Result<CustomerRecord, anyhow::Error> {
    let record = if reject {
        ctx.service
            .reject_document(customer_id, document_id, &ctx.actor, notes)
            .await?
    } else {
        ctx.service
            .verify_document(customer_id, document_id, &ctx.actor, notes)
            .await?
    };

    let verb = if reject { "Rejected" } else { "Verified" };
    println!(
        "✅ {} document {} (workflow step: {})",
        verb, document_id, record.workflow.current_step
    );
    Ok(record)
}

/// Score a customer with the configured engine
pub async fn assess(ctx: &AppContext, customer_id: Uuid) -> Result<RiskAssessment, anyhow::Error> {
    let assessment = ctx
        .service
        .run_risk_assessment(customer_id, &ctx.actor)
        .await?;

    println!(
        "✅ Risk score {} ({})",
        assessment.overall_risk_score, assessment.risk_level
    );
    println!(
        "   country {} | customer {} | product {} | transaction {}",
        assessment.country_risk,
        assessment.customer_risk,
        assessment.product_risk,
        assessment.transaction_risk
    );
    Ok(assessment)
}

/// Apply a screening result, or ask the provider when none is given
pub async fn screen(
    ctx: &AppContext,
    customer_id: Uuid,
    result_json: Option<&str>,
) -> Result<WorkflowState, anyhow::Error> {
    let workflow = match result_json {
        Some(json) => {
            let payload: serde_json::Value =
                serde_json::from_str(json).context("screening result must be JSON")?;
            ctx.service
                .apply_screening_payload(customer_id, payload, &ctx.actor)
                .await?
        }
        None => ctx.service.screen_customer(customer_id, &ctx.actor).await?,
    };

    println!(
        "✅ Screening applied: sanctions {} | pep {} | adverse media {}",
        cleared(workflow.sanctions_cleared),
        cleared(workflow.pep_cleared),
        cleared(workflow.adverse_media_cleared)
    );
    println!("   Workflow step: {}", workflow.current_step);
    Ok(workflow)
}

fn cleared(flag: bool) -> &'static str {
    if flag {
        "cleared"
    } else {
        "HIT"
    }
}

/// Compliance decision taken from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    RequestInfo,
    Suspend,
}

pub async fn decide(
    ctx: &AppContext,
    customer_id: Uuid,
    decision: Decision,
    notes: &str,
) -> Result<Customer, anyhow::Error> {
    let service = &ctx.service;
    let customer = match decision {
        Decision::Approve => service.approve(customer_id, &ctx.actor, notes).await?,
        Decision::Reject => service.reject(customer_id, &ctx.actor, notes).await?,
        Decision::RequestInfo => {
            service
                .request_additional_info(customer_id, &ctx.actor, notes)
                .await?
        }
        Decision::Suspend => service.suspend(customer_id, &ctx.actor, notes).await?,
    };

    println!(
        "✅ {} is now {}",
        customer.customer_reference, customer.status
    );
    if let Some(next_review) = customer.next_review_date {
        println!("   Next review: {}", next_review.date_naive());
    }
    Ok(customer)
}

pub async fn assign_officer(
    ctx: &AppContext,
    customer_id: Uuid,
    officer_id: &str,
) -> Result<Customer, anyhow::Error> {
    let customer = ctx
        .service
        .assign_compliance_officer(customer_id, officer_id, &ctx.actor)
        .await?;
    println!(
        "✅ {} assigned to {}",
        customer.customer_reference, officer_id
    );
    Ok(customer)
}

/// Assign one officer to several customers
pub async fn bulk_assign(
    ctx: &AppContext,
    customer_ids: &[Uuid],
    officer_id: &str,
) -> Result<usize, anyhow::Error> {
    let assigned = ctx
        .service
        .bulk_assign_compliance_officer(customer_ids, officer_id, &ctx.actor)
        .await?;
    println!(
        "✅ Assigned {} of {} customers to {}",
        assigned,
        customer_ids.len(),
        officer_id
    );
    Ok(assigned)
}

/// List alerts matching a filter
pub async fn alerts(
    ctx: &AppContext,
    filter: &AlertFilter,
) -> Result<Vec<ComplianceAlert>, anyhow::Error> {
    let alerts = ctx.service.alerts(filter).await?;

    if alerts.is_empty() {
        println!("No alerts");
        return Ok(alerts);
    }

    println!(
        "{:<36}  {:<8}  {:<13}  {:<18}  TITLE",
        "ID", "SEVERITY", "STATUS", "TYPE"
    );
    for alert in &alerts {
        println!(
            "{:<36}  {:<8}  {:<13}  {:<18}  {}",
            alert.id, alert.severity, alert.status, alert.alert_type, alert.title
        );
    }
    Ok(alerts)
}

/// Alert filter built from CLI flags
pub fn alert_filter(
    customer_id: Option<Uuid>,
    status: Option<AlertStatus>,
    alert_type: Option<AlertType>,
    severity: Option<Severity>,
    limit: Option<usize>,
) -> AlertFilter {
    AlertFilter {
        customer_id,
        status,
        alert_type,
        severity,
        limit,
    }
}

pub async fn assign_alert(
    ctx: &AppContext,
    alert_id: Uuid,
    officer_id: &str,
) -> Result<ComplianceAlert, anyhow::Error> {
    let alert = ctx
        .service
        .assign_alert(alert_id, officer_id, &ctx.actor)
        .await?;
    println!("✅ Alert {} assigned to {} ({})", alert.id, officer_id, alert.status);
    Ok(alert)
}

pub async fn resolve_alert(
    ctx: &AppContext,
    alert_id: Uuid,
    false_positive: bool,
    notes: &str,
) -> Result<ComplianceAlert, anyhow::Error> {
    let alert = if false_positive {
        ctx.service
            .mark_false_positive(alert_id, &ctx.actor, notes)
            .await?
    } else {
        ctx.service.resolve_alert(alert_id, &ctx.actor, notes).await?
    };
    println!("✅ Alert {} closed as {}", alert.id, alert.status);
    Ok(alert)
}

pub async fn bulk_resolve(
    ctx: &AppContext,
    alert_ids: &[Uuid],
    notes: &str,
) -> Result<usize, anyhow::Error> {
    let resolved = ctx
        .service
        .bulk_resolve_alerts(alert_ids, &ctx.actor, notes)
        .await?;
    println!("✅ Resolved {} of {} alerts", resolved, alert_ids.len());
    Ok(resolved)
}

/// Run the document-expiry check and periodic review once
pub async fn jobs(ctx: &AppContext) -> Result<Vec<JobReport>, anyhow::Error> {
    let reports = ctx.service.run_scheduled_jobs(Utc::now()).await?;
    for report in &reports {
        println!(
            "✅ {}: examined {}, alerts {}, skipped {}, failed {}",
            report.job, report.examined, report.alerts_raised, report.skipped, report.failed
        );
    }
    Ok(reports)
}

/// Print a customer's aggregate as JSON
pub async fn show(ctx: &AppContext, customer_id: Uuid) -> Result<CustomerRecord, anyhow::Error> {
    let record = ctx.service.customer(customer_id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(record)
}

/// List customers
pub async fn customers(
    ctx: &AppContext,
    status: Option<CustomerStatus>,
    risk_level: Option<RiskLevel>,
    limit: Option<usize>,
) -> Result<Vec<CustomerRecord>, anyhow::Error> {
    let filter = CustomerFilter {
        status,
        risk_level,
        limit,
        ..CustomerFilter::default()
    };
    let records = ctx.service.customers(&filter).await?;
    for record in &records {
        let c = &record.customer;
        println!(
            "{}  {:<20}  {:<24}  {:<8}  {:>6}  {}",
            c.id, c.customer_reference, c.status, c.risk_level, c.aml_risk_score, c.name
        );
    }
    Ok(records)
}

/// Print and verify a customer's audit trail
pub async fn audit(ctx: &AppContext, customer_id: Uuid) -> Result<usize, anyhow::Error> {
    let entries = ctx.service.audit_trail(customer_id).await?;
    for entry in &entries {
        println!(
            "#{:<4} {}  {:<18}  {:<16}  {}",
            entry.sequence,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.actor.id,
            entry.description
        );
    }

    match verify_chain(&entries) {
        Ok(()) => {
            println!("✅ Hash chain verified ({} entries)", entries.len());
            Ok(entries.len())
        }
        Err(e) => {
            println!("❌ Hash chain broken: {}", e);
            Err(e.into())
        }
    }
}

pub async fn stats(ctx: &AppContext) -> Result<StoreStats, anyhow::Error> {
    let stats = ctx.service.dashboard_stats().await?;

    println!("Customers: {}", stats.total_customers);
    for (status, count) in &stats.customers_by_status {
        println!("   {:<24} {}", status, count);
    }
    println!("By risk level:");
    for (level, count) in &stats.customers_by_risk_level {
        println!("   {:<24} {}", level, count);
    }
    println!(
        "Alerts: {} open, {} investigating, {} critical open",
        stats.open_alerts, stats.investigating_alerts, stats.critical_open_alerts
    );
    Ok(stats)
}
