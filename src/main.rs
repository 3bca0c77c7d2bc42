use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use school_results_analytics::config::Config;
use school_results_analytics::db::{self, PgStore};
use school_results_analytics::{report, AnalyticsEngine, ResultStore, TermScope};

#[derive(Parser)]
#[command(name = "school-analytics")]
#[command(about = "Student performance analytics over stored term results", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ScopeArgs {
    #[arg(long)]
    class: String,
    #[arg(long)]
    session: String,
    #[arg(long)]
    term: String,
}

impl From<&ScopeArgs> for TermScope {
    fn from(args: &ScopeArgs) -> Self {
        TermScope::new(args.class.as_str(), args.session.as_str(), args.term.as_str())
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ParentView {
    Children,
    Summary,
    Progress,
    Risk,
    Subjects,
    Attendance,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the read-model schema
    InitDb,
    /// Load a small demo school
    Seed,
    /// Class dashboard for one term
    Dashboard {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// School-wide rollup across every class
    School {
        #[arg(long)]
        school: String,
        #[arg(long)]
        session: String,
        #[arg(long)]
        term: String,
    },
    /// Risk score for a student's latest result
    Risk {
        #[arg(long)]
        student: String,
    },
    /// Risk ranking for every student in a class
    ClassRisk {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Statistics for one subject in a class
    Subject {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        subject: String,
    },
    /// Compare several classes for one term
    Compare {
        #[arg(long = "class", required = true, num_args = 1..)]
        classes: Vec<String>,
        #[arg(long)]
        session: String,
        #[arg(long)]
        term: String,
    },
    /// Attendance against performance for a class
    Attendance {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Multi-term progress for a student
    Progress {
        #[arg(long)]
        student: String,
    },
    /// Parent-scoped views
    Parent {
        #[arg(long)]
        parent: String,
        #[arg(long, required_if_eq_any([
            ("view", "summary"), ("view", "progress"), ("view", "risk"),
            ("view", "subjects"), ("view", "attendance"),
        ]))]
        student: Option<String>,
        #[arg(long, value_enum, default_value_t = ParentView::Children)]
        view: ParentView,
    },
    /// Generate a markdown class report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.config.log_filter)
                .unwrap_or_else(|_| EnvFilter::new("school_results_analytics=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(cli.config.max_connections)
        .connect(&cli.config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let engine = AnalyticsEngine::new(PgStore::new(pool.clone()));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Dashboard { scope } => {
            print_json(&engine.class_dashboard(&(&scope).into()).await?)?;
        }
        Commands::School {
            school,
            session,
            term,
        } => {
            print_json(&engine.school_dashboard(&school, &session, &term).await?)?;
        }
        Commands::Risk { student } => {
            print_json(&engine.student_risk(&student).await?)?;
        }
        Commands::ClassRisk { scope, limit } => {
            let scores = engine.class_risk(&(&scope).into()).await?;
            let top: Vec<_> = scores.into_iter().take(limit).collect();
            print_json(&top)?;
        }
        Commands::Subject { scope, subject } => {
            print_json(&engine.subject_analytics(&(&scope).into(), &subject).await?)?;
        }
        Commands::Compare {
            classes,
            session,
            term,
        } => {
            print_json(&engine.compare_classes(&classes, &session, &term).await?)?;
        }
        Commands::Attendance { scope } => {
            print_json(&engine.attendance_impact(&(&scope).into()).await?)?;
        }
        Commands::Progress { student } => {
            print_json(&engine.student_progress(&student).await?)?;
        }
        Commands::Parent {
            parent,
            student,
            view,
        } => {
            let portal = engine.for_parent(parent);
            let student = student.unwrap_or_default();
            match view {
                ParentView::Children => print_json(&portal.children().await?)?,
                ParentView::Summary => print_json(&portal.child_summary(&student).await?)?,
                ParentView::Progress => print_json(&portal.child_progress(&student).await?)?,
                ParentView::Risk => print_json(&portal.child_risk(&student).await?)?,
                ParentView::Subjects => print_json(&portal.child_subjects(&student).await?)?,
                ParentView::Attendance => print_json(&portal.child_attendance(&student).await?)?,
            }
        }
        Commands::Report { scope, limit, out } => {
            let scope: TermScope = (&scope).into();
            let class_name = engine
                .store()
                .class(&scope.class_id)
                .await?
                .map(|c| c.name)
                .unwrap_or_else(|| scope.class_id.clone());
            let dashboard = engine.class_dashboard(&scope).await?;
            let risks = engine.class_risk(&scope).await?;
            let report = report::build_report(&class_name, &scope, &dashboard, &risks, limit);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
