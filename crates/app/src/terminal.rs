//! Plain-text rendering and the interactive test prompt.

use std::io::{self, Write};

use gradeup_core::model::{QuestionBank, QuestionOutcome, TestResult, TestSession};
use services::{
    ActiveTest, DashboardStats, LeaderboardItem, TestLoopService, TestOutcome,
};
use storage::repository::ResultRow;

const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

fn clock_face(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.max(0.0).ceil() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn elapsed_face(seconds: u64) -> String {
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

pub fn print_subjects(bank: &QuestionBank) {
    for subject in bank.list_subjects() {
        let count = bank.question_count(subject).unwrap_or(0);
        println!("{subject} ({count} questions)");
        if let Ok(chapters) = bank.list_chapters(subject) {
            for chapter in chapters {
                let n = bank
                    .chapter_questions(subject, chapter)
                    .map_or(0, <[_]>::len);
                println!("  - {chapter} ({n})");
            }
        }
    }
}

pub fn print_leaderboard(items: &[LeaderboardItem]) {
    if items.is_empty() {
        println!("No results yet.");
        return;
    }
    println!("{:>4}  {:<20} {:<28} {:>7} {:>8} {:>9}", "#", "Name", "Test", "Score", "%", "Time");
    for item in items {
        let test = match &item.chapter {
            Some(chapter) => format!("{} / {chapter}", item.subject),
            None => format!("{} (mock)", item.subject),
        };
        println!(
            "{:>4}  {:<20} {:<28} {:>7.2} {:>7.1}% {:>9}",
            item.rank,
            item.user,
            test,
            item.raw_score,
            item.percentage,
            elapsed_face(item.elapsed_seconds)
        );
    }
}

pub fn print_history(user: &str, rows: &[ResultRow], stats: &DashboardStats) {
    if rows.is_empty() {
        println!("{user} has not taken any tests yet.");
        return;
    }
    for row in rows {
        let record = &row.record;
        let result = &record.result;
        println!(
            "{}  {:<18} {:<32} {:>6.1}%  {}C / {}W / {}U  {}",
            result.completed_at().format("%Y-%m-%d %H:%M"),
            record.subject,
            record.chapter.as_deref().unwrap_or("Full mock"),
            result.percentage(),
            result.correct_count(),
            result.wrong_count(),
            result.unattempted_count(),
            elapsed_face(result.elapsed_seconds()),
        );
    }
    println!();
    println!("Tests taken:   {}", stats.tests_taken);
    println!("Average:       {:.1}%", stats.average_percentage);
    if let Some(best) = &stats.best_subject {
        println!(
            "Best subject:  {} ({:.1}% over {} tests)",
            best.subject, best.average_percentage, best.tests_taken
        );
    }
    println!(
        "Total correct: {}  Total wrong: {}",
        stats.total_correct, stats.total_wrong
    );
}

fn print_question(session: &TestSession, index: usize, remaining: f64) {
    let progress = session.progress();
    let question = &session.questions()[index];
    println!();
    println!(
        "[{}] Question {}/{}  answered {}/{}  ({})",
        clock_face(remaining),
        index + 1,
        progress.total,
        progress.answered,
        progress.total,
        question.difficulty().as_str(),
    );
    if let Some(year) = question.year() {
        println!("({year})");
    }
    println!("{}", question.text());
    let chosen = session.answer(index);
    for (label, option) in OPTION_LABELS.iter().zip(question.options()) {
        let mark = if chosen == Some(option.as_str()) { '*' } else { ' ' };
        println!(" {mark}{label}. {option}");
    }
}

enum Input {
    Choose(usize),
    Clear,
    Next,
    Previous,
    Submit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "n" => Input::Next,
        "p" => Input::Previous,
        "c" => Input::Clear,
        "s" => Input::Submit,
        "1" => Input::Choose(0),
        "2" => Input::Choose(1),
        "3" => Input::Choose(2),
        "4" => Input::Choose(3),
        _ => Input::Unknown,
    }
}

/// Run the prompt until the user submits, input ends, or time runs out.
pub async fn run_test(
    test_loop: &TestLoopService,
    user: &str,
    test: &mut ActiveTest,
) -> Result<TestOutcome, Box<dyn std::error::Error>> {
    let total = test.session().questions().len();
    let mut current = 0_usize;

    println!(
        "{} questions, {} to finish. Keys: 1-4 answer, Enter/n next, p previous, c clear, s submit.",
        total,
        clock_face(f64::from(test.session().duration_limit_secs()))
    );

    loop {
        if let Some(outcome) = test_loop.tick(user, test).await? {
            println!("\nTime is up. Your answers were submitted.");
            return Ok(outcome);
        }

        print_question(test.session(), current, test_loop.remaining_seconds(test));
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(test_loop.submit(user, test).await?);
        }

        // An answer typed after the deadline does not count.
        if let Some(outcome) = test_loop.tick(user, test).await? {
            println!("\nTime is up. Your answers were submitted.");
            return Ok(outcome);
        }

        match parse_input(&line) {
            Input::Choose(slot) => {
                let option = test.session().questions()[current]
                    .options()
                    .get(slot)
                    .cloned();
                if let Some(option) = option {
                    test_loop.answer(test, current, Some(option.as_str()))?;
                    if current + 1 < total {
                        current += 1;
                    }
                }
            }
            Input::Clear => test_loop.answer(test, current, None)?,
            Input::Next => {
                if current + 1 < total {
                    current += 1;
                } else {
                    println!("Last question. Type s to submit or p to go back.");
                }
            }
            Input::Previous => current = current.saturating_sub(1),
            Input::Submit => return Ok(test_loop.submit(user, test).await?),
            Input::Unknown => println!("Type 1-4, n, p, c or s."),
        }
    }
}

pub fn print_result(result: &TestResult) {
    println!();
    println!(
        "Score: {:.2} / {:.0}  ({:.1}%)",
        result.raw_score(),
        result.total_possible_marks(),
        result.percentage()
    );
    println!(
        "Correct {}  Wrong {}  Unattempted {}  Time {}",
        result.correct_count(),
        result.wrong_count(),
        result.unattempted_count(),
        elapsed_face(result.elapsed_seconds())
    );
}

pub fn print_review(session: &TestSession) {
    println!();
    for row in session.review() {
        let tag = match row.outcome {
            QuestionOutcome::Correct => "correct",
            QuestionOutcome::Wrong => "wrong",
            QuestionOutcome::Unattempted => "skipped",
        };
        println!("{}. [{tag}] {}", row.index + 1, row.question.text());
        if row.outcome != QuestionOutcome::Correct {
            if let Some(chosen) = row.chosen {
                println!("   your answer: {chosen}");
            }
            println!("   correct:     {}", row.question.correct_option());
        }
        if let Some(explanation) = row.question.explanation() {
            println!("   {explanation}");
        }
    }
}
