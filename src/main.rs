mod advisor;
mod db;
mod error;
mod models;
mod scheduler;

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand};

use advisor::HttpAdvisor;
use db::Database;
use models::{weekday_from_number, Capacity, JsonOutput, Priority, Strategy};
use scheduler::{RescheduleRequest, ScheduleRequest};

const DEFAULT_DB_NAME: &str = "leitner.db";

#[derive(Parser)]
#[command(name = "leitner")]
#[command(about = "A study scheduler CLI with spaced-repetition checkpoints")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Generate a day-by-day plan for a backlog of topics
    Schedule {
        /// Owner id
        #[arg(long, default_value = "local")]
        owner: String,

        /// Plan id
        #[arg(long)]
        plan: String,

        /// First study day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Ordering strategy: priority/alphabetical/custom
        #[arg(long, default_value = "priority")]
        strategy: String,

        /// Free-text directive for the custom strategy
        #[arg(long)]
        directive: Option<String>,

        /// Max topics per day
        #[arg(long, conflicts_with = "daily_hours")]
        topics_per_day: Option<u32>,

        /// Max study hours per day
        #[arg(long)]
        daily_hours: Option<f64>,

        /// Comma-separated off-day numbers, 0=Sunday..6=Saturday
        #[arg(long)]
        off_days: Option<String>,
    },

    /// Mutate the future plan with a natural-language directive
    Reschedule {
        /// Owner id
        #[arg(long, default_value = "local")]
        owner: String,

        /// Plan id
        #[arg(long)]
        plan: String,

        /// What to change, in plain words
        #[arg(long)]
        directive: String,
    },

    /// Remove all study and checkpoint dates from a plan
    Clear {
        /// Owner id
        #[arg(long, default_value = "local")]
        owner: String,

        /// Plan id
        #[arg(long)]
        plan: String,
    },
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Add a topic to a plan
    Add {
        /// Topic title
        title: String,

        /// Owner id
        #[arg(long, default_value = "local")]
        owner: String,

        /// Plan id
        #[arg(long)]
        plan: String,

        /// Subject label
        #[arg(long, short)]
        subject: Option<String>,

        /// Priority: high/moderate/low
        #[arg(long, short)]
        priority: Option<String>,

        /// Estimated study hours
        #[arg(long, default_value_t = 1.0)]
        hours: f64,
    },

    /// List topics in a plan
    List {
        /// Owner id
        #[arg(long, default_value = "local")]
        owner: String,

        /// Plan id
        #[arg(long)]
        plan: String,
    },

    /// Mark a topic complete
    Done {
        /// Topic ID
        id: i64,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("LEITNER_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leitner");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn parse_off_days(raw: Option<&str>) -> Result<HashSet<Weekday>, String> {
    let mut days = HashSet::new();
    let Some(raw) = raw else {
        return Ok(days);
    };
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: u8 = part
            .parse()
            .map_err(|_| format!("invalid off-day '{}': expected 0-6", part))?;
        let day = weekday_from_number(n)
            .ok_or_else(|| format!("invalid off-day '{}': expected 0-6", part))?;
        days.insert(day);
    }
    Ok(days)
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}': expected YYYY-MM-DD", s))
}

fn main() {
    let _logger = flexi_logger::Logger::try_with_env_or_str("warn")
        .and_then(|l| l.start())
        .ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Topic(topic_cmd) => match topic_cmd {
            TopicCommands::Add {
                title,
                owner,
                plan,
                subject,
                priority,
                hours,
            } => {
                let priority = match priority.as_deref() {
                    Some(p) => Some(
                        Priority::from_str(p)
                            .ok_or_else(|| format!("invalid priority '{}'", p))?,
                    ),
                    None => None,
                };
                let id = db.add_topic(&owner, &plan, &title, subject.as_deref(), priority, hours)?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "title": title
                        })))?
                    );
                } else {
                    println!("Added topic '{}' with ID: {}", title, id);
                }
            }

            TopicCommands::List { owner, plan } => {
                let topics = db.list_topics(&owner, &plan)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&topics))?);
                } else if topics.is_empty() {
                    println!("No topics found.");
                } else {
                    println!(
                        "{:<5} {:<32} {:<10} {:<12} STUDY DATE",
                        "ID", "TITLE", "PRIORITY", "SUBJECT"
                    );
                    println!("{}", "-".repeat(76));
                    for topic in topics {
                        let priority = topic
                            .priority
                            .map(|p| p.as_str().to_string())
                            .unwrap_or_else(|| "-".to_string());
                        let subject = topic.subject.as_deref().unwrap_or("-");
                        let study = topic
                            .study_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "unscheduled".to_string());
                        println!(
                            "{:<5} {:<32} {:<10} {:<12} {}{}",
                            topic.id,
                            truncate(&topic.title, 30),
                            priority,
                            truncate(subject, 10),
                            study,
                            if topic.completed { " (done)" } else { "" }
                        );
                    }
                }
            }

            TopicCommands::Done { id } => {
                if db.set_completed(id, true)? {
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Marked topic {} as complete.", id);
                    }
                } else if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::<()>::err("Topic not found"))?
                    );
                } else {
                    println!("Topic not found.");
                }
            }
        },

        Commands::Schedule {
            owner,
            plan,
            start,
            strategy,
            directive,
            topics_per_day,
            daily_hours,
            off_days,
        } => {
            let strategy = Strategy::from_str(&strategy)
                .ok_or_else(|| format!("invalid strategy '{}'", strategy))?;
            let capacity = match (topics_per_day, daily_hours) {
                (None, Some(h)) => Capacity::MaxHours(h),
                (Some(n), None) => Capacity::MaxTopics(n),
                (None, None) => Capacity::MaxTopics(3),
                (Some(_), Some(_)) => unreachable!("clap rejects conflicting capacity flags"),
            };
            let request = ScheduleRequest {
                owner_id: owner,
                plan_id: plan,
                start_date: parse_date(&start)?,
                strategy,
                directive,
                capacity,
                off_days: parse_off_days(off_days.as_deref())?,
            };

            let advisor = HttpAdvisor::from_env()?;
            let outcome = scheduler::generate_schedule(&db, &advisor, &request)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&outcome))?);
            } else if outcome.scheduled_count == 0 {
                println!("Nothing to schedule.");
            } else {
                println!("Scheduled {} topics.", outcome.scheduled_count);
                for err in &outcome.batch_errors {
                    eprintln!("Warning: {}", err);
                }
            }
        }

        Commands::Reschedule {
            owner,
            plan,
            directive,
        } => {
            let request = RescheduleRequest {
                owner_id: owner,
                plan_id: plan,
                directive,
                today: chrono::Local::now().date_naive(),
            };

            let advisor = HttpAdvisor::from_env()?;
            let outcome = scheduler::reschedule_plan(&db, &advisor, &request)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&outcome))?);
            } else if outcome.rescheduled_count == 0 {
                println!("No future topics to reschedule.");
            } else {
                println!("Rescheduled {} topics.", outcome.rescheduled_count);
                for err in &outcome.batch_errors {
                    eprintln!("Warning: {}", err);
                }
            }
        }

        Commands::Clear { owner, plan } => {
            let cleared = db.clear_schedule(&owner, &plan)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "cleared": cleared
                    })))?
                );
            } else {
                println!("Cleared schedule dates from {} topics.", cleared);
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
