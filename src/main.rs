use std::sync::Arc;

use clap::{Parser, Subcommand};
use lezioni::models::{LessonCandidate, LessonId, LessonTemplate, NaturalKey};
use lezioni::{
    ApiConfig, FailurePolicy, HttpLessonApi, LessonCalendar, LessonError, LessonService, Mode,
    Session, WeeklyRecurrence,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line access to the lessons API.
#[derive(Debug, Parser)]
#[command(name = "lezioni", about = "Manage tutoring lessons from the terminal", version)]
struct Cli {
    /// Act as an administrator (allows deleting lessons).
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a teacher's lessons.
    List {
        #[arg(long)]
        teacher: i64,
    },
    /// Show how many weekly lessons a range would create.
    Preview {
        #[arg(long)]
        from: String,
        #[arg(long)]
        until: String,
    },
    /// Create one lesson per week between two dates.
    CreateWeekly {
        #[arg(long)]
        teacher: i64,
        #[arg(long)]
        student: i64,
        #[arg(long)]
        from: String,
        #[arg(long)]
        until: String,
        #[arg(long, value_name = "HH:MM")]
        start: String,
        #[arg(long, value_name = "HH:MM")]
        end: String,
        #[arg(long)]
        room: String,
        /// Stop at the first failed lesson instead of skipping it.
        #[arg(long)]
        abort_on_error: bool,
    },
    /// Postpone a lesson.
    Postpone {
        #[arg(long)]
        teacher: i64,
        #[arg(long)]
        id: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Cancel a lesson.
    Cancel {
        #[arg(long)]
        teacher: i64,
        #[arg(long)]
        id: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Delete a lesson (admin only).
    Delete {
        #[arg(long)]
        teacher: i64,
        #[arg(long)]
        id: i64,
    },
}

fn session_from_env() -> Session {
    match (
        std::env::var("LEZIONI_TOKEN"),
        std::env::var("LEZIONI_USER_ID").ok().and_then(|v| v.parse().ok()),
    ) {
        (Ok(token), Some(user_id)) => Session::bearer(token, user_id),
        _ => {
            warn!("LEZIONI_TOKEN / LEZIONI_USER_ID not set, calling the API anonymously");
            Session::anonymous()
        }
    }
}

fn by_id(teacher: i64, id: i64) -> LessonCandidate {
    LessonCandidate {
        id: Some(LessonId(id)),
        teacher_id: Some(teacher),
        key: NaturalKey::default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lezioni=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Command::Preview { from, until } = &cli.command {
        let recurrence = WeeklyRecurrence::parse(from, until)?;
        println!("{}", recurrence.preview_text());
        for date in recurrence.dates() {
            println!("  {}", date);
        }
        return Ok(());
    }

    let mode = if cli.admin {
        Mode::Admin {
            can_delete: true,
            can_reassign: true,
        }
    } else {
        Mode::Teacher
    };
    let api = Arc::new(HttpLessonApi::new(ApiConfig::new_from_env()?)?);
    let mut service = LessonService::new(api, session_from_env(), mode);
    if let Command::CreateWeekly {
        abort_on_error: true,
        ..
    } = &cli.command
    {
        service = service.with_failure_policy(FailurePolicy::AbortOnError);
    }

    let result = run(&service, cli.command).await;
    if let Err(e) = &result {
        if e.is_auth_failure() {
            warn!("Session rejected by the server, log in again");
        }
    }
    Ok(result?)
}

async fn run(service: &LessonService, command: Command) -> Result<(), LessonError> {
    match command {
        Command::Preview { .. } => Ok(()),
        Command::List { teacher } => {
            let mut calendar = LessonCalendar::new(teacher);
            service.refresh(&mut calendar).await?;
            for lesson in calendar.lessons() {
                println!(
                    "{:>6} {} {}-{} allievo {} aula {} [{}]",
                    lesson.id.map(|id| id.to_string()).unwrap_or_default(),
                    lesson.date,
                    lesson.start_time.format("%H:%M"),
                    lesson.end_time.format("%H:%M"),
                    lesson.student_id,
                    lesson.room,
                    lesson.display_state()
                );
            }
            Ok(())
        }
        Command::CreateWeekly {
            teacher,
            student,
            from,
            until,
            start,
            end,
            room,
            ..
        } => {
            let recurrence = WeeklyRecurrence::parse(&from, &until)?;
            let template = LessonTemplate::parse(teacher, student, &start, &end, &room)?;
            let mut calendar = LessonCalendar::new(teacher);

            let outcome = service
                .create_weekly(&mut calendar, recurrence, template)
                .await?;

            info!("Batch {} done", outcome.batch_id);
            println!(
                "Create {} lezioni su {}",
                outcome.created.len(),
                outcome.requested
            );
            if outcome.shortfall() > 0 {
                println!("{} lezioni non create:", outcome.shortfall());
                for failure in &outcome.failures {
                    println!("  {}: {}", failure.date, failure.error);
                }
            }
            Ok(())
        }
        Command::Postpone {
            teacher,
            id,
            reason,
        } => {
            let mut calendar = LessonCalendar::new(teacher);
            let lesson = service
                .postpone(&mut calendar, &by_id(teacher, id), &reason)
                .await?;
            println!("Lezione {} {}", id, lesson.display_state());
            Ok(())
        }
        Command::Cancel {
            teacher,
            id,
            reason,
        } => {
            let mut calendar = LessonCalendar::new(teacher);
            let lesson = service
                .cancel(&mut calendar, &by_id(teacher, id), &reason)
                .await?;
            println!("Lezione {} {}", id, lesson.display_state());
            Ok(())
        }
        Command::Delete { teacher, id } => {
            let mut calendar = LessonCalendar::new(teacher);
            let deleted = service.delete(&mut calendar, &by_id(teacher, id)).await?;
            println!("Lezione {} eliminata", deleted);
            Ok(())
        }
    }
}
