//! KycFlow CLI - Main entry point

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kycflow_cli::commands::{self, Decision, UploadArgs};
use kycflow_cli::AppContext;
use kycflow_core::{AlertStatus, AlertType, CustomerStatus, DocumentType, RiskLevel, Severity};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kycflow")]
#[command(about = "KycFlow - KYC/AML onboarding and compliance", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON config file (risk and compliance settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Operator id recorded on the audit trail
    #[arg(long, default_value = "operator")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a customer from an intake JSON document
    Intake {
        /// Intake JSON
        json: String,
    },

    /// Attach a document to a customer
    UploadDocument {
        customer_id: Uuid,
        /// passport, national_id, utility_bill, ...
        #[arg(long = "type")]
        document_type: DocumentType,
        #[arg(long)]
        name: String,
        /// Content hash of the stored file
        #[arg(long)]
        hash: String,
        #[arg(long, default_value = "0")]
        size: u64,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        issued: Option<NaiveDate>,
        #[arg(long)]
        expires: Option<NaiveDate>,
    },

    /// Verify a pending document
    VerifyDocument {
        customer_id: Uuid,
        document_id: Uuid,
        /// Reject instead of verify
        #[arg(long)]
        reject: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Run the risk assessment
    Assess { customer_id: Uuid },

    /// Screen a customer (provider call, or apply a pushed result)
    Screen {
        customer_id: Uuid,
        /// Screening result JSON; the provider is called when omitted
        #[arg(long)]
        result: Option<String>,
    },

    /// Approve a customer
    Approve {
        customer_id: Uuid,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Reject a customer
    Reject {
        customer_id: Uuid,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Ask the customer for more information
    RequestInfo {
        customer_id: Uuid,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Suspend an approved customer
    Suspend {
        customer_id: Uuid,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Assign a customer's compliance officer
    AssignOfficer { customer_id: Uuid, officer_id: String },

    /// Assign one compliance officer to several customers
    BulkAssign {
        officer_id: String,
        #[arg(required = true)]
        customer_ids: Vec<Uuid>,
    },

    /// List customers
    Customers {
        #[arg(long)]
        status: Option<CustomerStatus>,
        #[arg(long)]
        risk_level: Option<RiskLevel>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List compliance alerts
    Alerts {
        #[arg(long)]
        customer: Option<Uuid>,
        #[arg(long)]
        status: Option<AlertStatus>,
        #[arg(long = "type")]
        alert_type: Option<AlertType>,
        #[arg(long)]
        severity: Option<Severity>,
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Assign an alert to an officer
    AssignAlert { alert_id: Uuid, officer_id: String },

    /// Close an alert
    ResolveAlert {
        alert_id: Uuid,
        /// Close as a false positive
        #[arg(long)]
        false_positive: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Resolve every open alert among the given ids
    BulkResolve {
        #[arg(required = true)]
        alert_ids: Vec<Uuid>,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Run document-expiry check and periodic review once
    Jobs,

    /// Show a customer as JSON
    Show { customer_id: Uuid },

    /// Print and verify a customer's audit trail
    Audit { customer_id: Uuid },

    /// Dashboard statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(&cli.data, cli.config.as_deref(), &cli.actor).await?;

    match cli.command {
        Commands::Intake { json } => {
            commands::intake(&ctx, &json).await?;
        }

        Commands::UploadDocument {
            customer_id,
            document_type,
            name,
            hash,
            size,
            number,
            issued,
            expires,
        } => {
            let args = UploadArgs {
                document_type,
                name,
                file_hash: hash,
                size,
                number,
                issue_date: issued,
                expiry_date: expires,
            };
            commands::upload_document(&ctx, customer_id, args).await?;
        }

        Commands::VerifyDocument {
            customer_id,
            document_id,
            reject,
            notes,
        } => {
            commands::verify_document(&ctx, customer_id, document_id, reject, &notes).await?;
        }

        Commands::Assess { customer_id } => {
            commands::assess(&ctx, customer_id).await?;
        }

        Commands::Screen {
            customer_id,
            result,
        } => {
            commands::screen(&ctx, customer_id, result.as_deref()).await?;
        }

        Commands::Approve { customer_id, notes } => {
            commands::decide(&ctx, customer_id, Decision::Approve, &notes).await?;
        }

        Commands::Reject { customer_id, notes } => {
            commands::decide(&ctx, customer_id, Decision::Reject, &notes).await?;
        }

        Commands::RequestInfo { customer_id, notes } => {
            commands::decide(&ctx, customer_id, Decision::RequestInfo, &notes).await?;
        }

        Commands::Suspend { customer_id, notes } => {
            commands::decide(&ctx, customer_id, Decision::Suspend, &notes).await?;
        }

        Commands::AssignOfficer {
            customer_id,
            officer_id,
        } => {
            commands::assign_officer(&ctx, customer_id, &officer_id).await?;
        }

        Commands::BulkAssign {
            officer_id,
            customer_ids,
        } => {
            commands::bulk_assign(&ctx, &customer_ids, &officer_id).await?;
        }

        Commands::Customers {
            status,
            risk_level,
            limit,
        } => {
            commands::customers(&ctx, status, risk_level, limit).await?;
        }

        Commands::Alerts {
            customer,
            status,
            alert_type,
            severity,
            limit,
        } => {
            let filter = commands::alert_filter(customer, status, alert_type, severity, Some(limit));
            commands::alerts(&ctx, &filter).await?;
        }

        Commands::AssignAlert {
            alert_id,
            officer_id,
        } => {
            commands::assign_alert(&ctx, alert_id, &officer_id).await?;
        }

        Commands::ResolveAlert {
            alert_id,
            false_positive,
            notes,
        } => {
            commands::resolve_alert(&ctx, alert_id, false_positive, &notes).await?;
        }

        Commands::BulkResolve { alert_ids, notes } => {
            commands::bulk_resolve(&ctx, &alert_ids, &notes).await?;
        }

        Commands::Jobs => {
            commands::jobs(&ctx).await?;
        }

        Commands::Show { customer_id } => {
            commands::show(&ctx, customer_id).await?;
        }

        Commands::Audit { customer_id } => {
            commands::audit(&ctx, customer_id).await?;
        }

        Commands::Stats => {
            commands::stats(&ctx).await?;
        }
    }

    Ok(())
}
