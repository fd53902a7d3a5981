mod config;
mod terminal;

use gradeup_core::model::{Course, QuestionBank};
use services::{AppServices, Clock, Navigator, TestPlan};
use tracing_subscriber::EnvFilter;

use crate::config::{ArgsError, parse_course, parse_db_flag, parse_limit, require_value};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- subjects");
    eprintln!(
        "  cargo run -p app -- take --name <name> --course <NDA|CDS|AFCAT> --subject <subject> \
         [--chapter <chapter> | --mock] [--db <sqlite_url>]"
    );
    eprintln!("  cargo run -p app -- leaderboard [--limit <n>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- history --name <name> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- logout --name <name> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {}", config::DEFAULT_DB_URL);
    eprintln!();
    eprintln!("Environment:");
    eprintln!(
        "  {}, {}, {}, {}, {}, {}, RUST_LOG",
        config::ENV_DB_URL,
        config::ENV_MARKS_CORRECT,
        config::ENV_MARKS_WRONG,
        config::ENV_CHAPTER_LIMIT,
        config::ENV_CHAPTER_SECS,
        config::ENV_FULL_SECS,
    );
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Subjects,
    Take {
        name: String,
        course: Course,
        subject: String,
        chapter: Option<String>,
        mock: bool,
    },
    Leaderboard {
        limit: Option<u32>,
    },
    History {
        name: String,
    },
    Logout {
        name: String,
    },
}

struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(mut argv: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let Some(sub) = argv.next() else {
            return Ok(None);
        };
        if matches!(sub.as_str(), "--help" | "-h" | "help") {
            return Ok(None);
        }

        let mut db_url = config::db_url_from_env(|key| std::env::var(key).ok());
        let mut name = None;
        let mut course = None;
        let mut subject = None;
        let mut chapter = None;
        let mut mock = false;
        let mut limit = None;

        while let Some(arg) = argv.next() {
            match arg.as_str() {
                "--db" => db_url = parse_db_flag(&mut argv)?,
                "--name" => name = Some(require_value(&mut argv, "--name")?),
                "--course" => course = Some(parse_course(&require_value(&mut argv, "--course")?)?),
                "--subject" => subject = Some(require_value(&mut argv, "--subject")?),
                "--chapter" => chapter = Some(require_value(&mut argv, "--chapter")?),
                "--mock" => mock = true,
                "--limit" => limit = Some(parse_limit(require_value(&mut argv, "--limit")?)?),
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match sub.as_str() {
            "subjects" => Command::Subjects,
            "take" => {
                if mock && chapter.is_some() {
                    return Err(ArgsError::ConflictingFlags {
                        first: "--chapter",
                        second: "--mock",
                    });
                }
                Command::Take {
                    name: name.ok_or(ArgsError::MissingFlag { flag: "--name" })?,
                    course: course.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
                    subject: subject.ok_or(ArgsError::MissingFlag { flag: "--subject" })?,
                    chapter,
                    mock,
                }
            }
            "leaderboard" => Command::Leaderboard { limit },
            "history" => Command::History {
                name: name.ok_or(ArgsError::MissingFlag { flag: "--name" })?,
            },
            "logout" => Command::Logout {
                name: name.ok_or(ArgsError::MissingFlag { flag: "--name" })?,
            },
            _ => return Err(ArgsError::UnknownArg(sub)),
        };

        Ok(Some(Self { db_url, command }))
    }
}

/// Walk the screen flow for the requested test and return what to start.
fn plan_test(
    nav: &mut Navigator,
    bank: &QuestionBank,
    subject: &str,
    chapter: Option<&str>,
    mock: bool,
) -> Result<TestPlan, Box<dyn std::error::Error>> {
    nav.choose_subject(subject)?;
    if mock {
        return Ok(nav.choose_full_mock()?);
    }
    if let Some(plan) = nav.choose_chapter_practice()? {
        return Ok(plan);
    }
    match chapter {
        Some(chapter) => Ok(nav.choose_chapter(chapter)?),
        None => {
            eprintln!("Pick a chapter with --chapter:");
            for chapter in bank.list_chapters(subject)? {
                eprintln!("  {chapter}");
            }
            Err(ArgsError::MissingFlag { flag: "--chapter" }.into())
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Some(parsed) = parsed else {
        print_usage();
        return Ok(());
    };

    if parsed.command == Command::Subjects {
        terminal::print_subjects(QuestionBank::builtin()?);
        return Ok(());
    }

    let settings = config::settings_from_env(|key| std::env::var(key).ok())?;
    config::prepare_sqlite_dir(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system(), settings).await?;

    match parsed.command {
        Command::Subjects => {}
        Command::Take {
            name,
            course,
            subject,
            chapter,
            mock,
        } => {
            let user = app.users().register(&name, course).await?;
            let mut nav = app.navigator();
            nav.sign_in(user.name())?;
            let bank = app.bank();
            let plan = plan_test(&mut nav, &bank, &subject, chapter.as_deref(), mock)?;

            let test_loop = app.test_loop();
            let mut test = test_loop.start_test(&plan.subject, plan.chapter.as_deref(), plan.mode)?;
            println!(
                "{} | {}",
                plan.subject,
                plan.chapter.as_deref().unwrap_or("Full mock")
            );
            let outcome = terminal::run_test(&test_loop, user.name(), &mut test).await?;
            nav.finish_test()?;

            terminal::print_result(&outcome.result);
            terminal::print_review(test.session());
        }
        Command::Leaderboard { limit } => {
            let items = app.results().leaderboard(limit).await?;
            terminal::print_leaderboard(&items);
        }
        Command::History { name } => {
            let results = app.results();
            let rows = results.history(name.trim()).await?;
            let stats = results.dashboard(name.trim()).await?;
            terminal::print_history(name.trim(), &rows, &stats);
        }
        Command::Logout { name } => {
            if app.users().forget(&name).await? {
                println!("Signed out {}.", name.trim());
            } else {
                println!("No user named {}.", name.trim());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn take_requires_name_course_and_subject() {
        let parsed = parse(&[
            "take", "--name", "Asha", "--course", "cds", "--subject", "History", "--mock",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(
            parsed.command,
            Command::Take {
                name: "Asha".into(),
                course: Course::Cds,
                subject: "History".into(),
                chapter: None,
                mock: true,
            }
        );

        assert!(matches!(
            parse(&["take", "--name", "Asha", "--subject", "History"]),
            Err(ArgsError::MissingFlag { flag: "--course" })
        ));
    }

    #[test]
    fn chapter_and_mock_conflict() {
        let err = parse(&[
            "take", "--name", "A", "--course", "NDA", "--subject", "Maths", "--mock", "--chapter",
            "Algebra",
        ])
        .err();
        assert!(matches!(err, Some(ArgsError::ConflictingFlags { .. })));
    }

    #[test]
    fn leaderboard_limit_and_db_flag() {
        let parsed = parse(&["leaderboard", "--limit", "5", "--db", "sqlite::memory:"])
            .unwrap()
            .unwrap();
        assert_eq!(parsed.command, Command::Leaderboard { limit: Some(5) });
        assert_eq!(parsed.db_url, "sqlite::memory:");
    }

    #[test]
    fn help_and_unknown() {
        assert!(parse(&[]).unwrap().is_none());
        assert!(parse(&["--help"]).unwrap().is_none());
        assert!(matches!(parse(&["grade"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            parse(&["history", "--bogus"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }
}
