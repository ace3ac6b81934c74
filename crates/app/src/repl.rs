use std::collections::BTreeSet;
use std::io::{self, Write};

use chrono::FixedOffset;
use quiz_core::grading::OptionMark;
use quiz_core::model::SectionPhase;
use services::{QuestionView, QuizServices, Route, SectionTotal, SectionView};

use crate::command::Command;

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Terminal presentation over one page lifecycle of the quiz.
pub struct Repl {
    services: QuizServices,
    offset: FixedOffset,
}

impl Repl {
    /// `offset` decides which calendar date an attempt falls on in `history`.
    #[must_use]
    pub fn new(services: QuizServices, offset: FixedOffset) -> Self {
        Self { services, offset }
    }

    /// Page load: opens the section named by `fragment`, or shows the menu.
    pub async fn start(&self, fragment: &str, out: &mut impl Write) -> io::Result<()> {
        match self.services.navigator().page_loaded(fragment).await {
            Ok(Some(view)) => write_section(out, &view),
            Ok(None) => self.write_menu(out, None),
            Err(err) => writeln!(out, "error: {err}"),
        }
    }

    pub async fn execute(&self, command: Command, out: &mut impl Write) -> io::Result<Flow> {
        match command {
            Command::Sections => self.write_menu(out, None)?,
            Command::Open(target) => self.open(&target, out).await?,
            Command::Select { question, options } => {
                self.select(question, options.into_iter().collect(), out)
                    .await?;
            }
            Command::Submit(question) => self.submit(question, out).await?,
            Command::Total => self.total(out).await?,
            Command::Menu => self.menu(out).await?,
            Command::History => self.history(out)?,
            Command::Help => write_help(out)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn current_section(&self) -> Option<String> {
        match self.services.navigator().current() {
            Route::Section(id) => Some(id.as_str().to_owned()),
            Route::Menu => None,
        }
    }

    fn write_menu(&self, out: &mut impl Write, cursor: Option<u32>) -> io::Result<()> {
        writeln!(out, "Sections:")?;
        for (position, item) in self.services.sections().list_sections().iter().enumerate() {
            let marker = if cursor.is_some_and(|c| c as usize == position) {
                '>'
            } else {
                ' '
            };
            let status = match item.phase {
                SectionPhase::Fresh | SectionPhase::Unfrozen => "",
                SectionPhase::InProgress => " [in progress]",
                SectionPhase::Completed => " [completed]",
            };
            writeln!(
                out,
                "{marker} {}. {} ({}, {} questions){status}",
                position + 1,
                item.title,
                item.id,
                item.question_count
            )?;
        }
        Ok(())
    }

    async fn open(&self, target: &str, out: &mut impl Write) -> io::Result<()> {
        let catalog = self.services.catalog();
        let position = match target.parse::<usize>() {
            Ok(n) if n > 0 => Some(n - 1),
            _ => catalog.sections().iter().position(|s| s.id().as_str() == target),
        };
        let Some((position, section)) =
            position.and_then(|p| catalog.sections().get(p).map(|s| (p, s)))
        else {
            return writeln!(out, "error: unknown section: {target}");
        };

        let scroll = u32::try_from(position).unwrap_or(u32::MAX);
        match self
            .services
            .navigator()
            .open_section(section.id().as_str(), scroll)
            .await
        {
            Ok(view) => write_section(out, &view),
            Err(err) => writeln!(out, "error: {err}"),
        }
    }

    async fn select(
        &self,
        question: usize,
        options: BTreeSet<usize>,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let Some(section) = self.current_section() else {
            return writeln!(out, "open a section first");
        };
        let sections = self.services.sections();
        if let Err(err) = sections
            .record_selection_change(&section, question, options)
            .await
        {
            return writeln!(out, "error: {err}");
        }
        match sections.render_section(&section).await {
            Ok(view) => match view.questions.get(question) {
                Some(q) => write_question(out, q),
                None => Ok(()),
            },
            Err(err) => writeln!(out, "error: {err}"),
        }
    }

    async fn submit(&self, question: usize, out: &mut impl Write) -> io::Result<()> {
        let Some(section) = self.current_section() else {
            return writeln!(out, "open a section first");
        };
        let sections = self.services.sections();
        match sections.submit_question(&section, question).await {
            Ok(outcome) => {
                let verdict = if outcome.is_correct() {
                    "Correct!"
                } else {
                    "Not quite."
                };
                writeln!(out, "{verdict}")?;
            }
            Err(err) => return writeln!(out, "error: {err}"),
        }
        match sections.render_section(&section).await {
            Ok(view) => match view.questions.get(question) {
                Some(q) => write_question(out, q),
                None => Ok(()),
            },
            Err(err) => writeln!(out, "error: {err}"),
        }
    }

    async fn total(&self, out: &mut impl Write) -> io::Result<()> {
        let Some(section) = self.current_section() else {
            return writeln!(out, "open a section first");
        };
        match self.services.sections().request_section_total(&section).await {
            Ok(SectionTotal::Missing { questions }) => {
                let numbers: Vec<String> = questions.iter().map(ToString::to_string).collect();
                writeln!(out, "Answer these questions first: {}", numbers.join(", "))
            }
            Ok(SectionTotal::Completed { score, total }) => {
                writeln!(out, "You scored {score} out of {total}.")
            }
            Err(err) => writeln!(out, "error: {err}"),
        }
    }

    async fn menu(&self, out: &mut impl Write) -> io::Result<()> {
        match self.services.navigator().return_to_menu().await {
            Ok(back) => {
                if back.cleared {
                    writeln!(out, "Section finished; your next visit starts a new attempt.")?;
                }
                self.write_menu(out, back.scroll_offset)
            }
            Err(err) => writeln!(out, "error: {err}"),
        }
    }

    fn history(&self, out: &mut impl Write) -> io::Result<()> {
        let days = self.services.history().grouped(self.offset);
        if days.is_empty() {
            return writeln!(out, "No completed attempts yet.");
        }
        for day in days {
            writeln!(out, "{}", day.date.format("%Y-%m-%d"))?;
            for entry in day.entries {
                writeln!(
                    out,
                    "  {}  {}/{}",
                    entry.section_title(),
                    entry.score(),
                    entry.total()
                )?;
            }
        }
        Ok(())
    }
}

fn write_section(out: &mut impl Write, view: &SectionView) -> io::Result<()> {
    writeln!(out, "== {} ==", view.title)?;
    for question in &view.questions {
        write_question(out, question)?;
    }
    if view.phase == SectionPhase::Completed {
        writeln!(
            out,
            "Completed: {}/{}. Type `menu` to leave.",
            view.score_so_far(),
            view.questions.len()
        )?;
    }
    Ok(())
}

fn write_question(out: &mut impl Write, question: &QuestionView) -> io::Result<()> {
    let hint = if question.allows_multiple {
        " (select all that apply)"
    } else {
        ""
    };
    let verdict = match question.correct {
        Some(true) => "  [correct]",
        Some(false) => "  [incorrect]",
        None => "",
    };
    writeln!(out, "{}. {}{hint}{verdict}", question.number, question.prompt)?;
    for option in &question.options {
        let tick = if option.selected { 'x' } else { ' ' };
        let mark = match option.mark {
            Some(OptionMark::SelectedCorrect) => "  <- right",
            Some(OptionMark::MissedCorrect) => "  <- missed",
            Some(OptionMark::SelectedIncorrect) => "  <- wrong",
            Some(OptionMark::Neutral) | None => "",
        };
        writeln!(
            out,
            "   [{tick}] {}. {}{mark}",
            option.display_index + 1,
            option.text
        )?;
    }
    Ok(())
}

fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  sections                 list sections")?;
    writeln!(out, "  open <id|number>         open a section")?;
    writeln!(out, "  select <q> [<opt>...]    choose options for question q")?;
    writeln!(out, "  submit <q>               check question q")?;
    writeln!(out, "  total                    score the open section")?;
    writeln!(out, "  menu                     back to the section list")?;
    writeln!(out, "  history                  completed attempts by day")?;
    writeln!(out, "  quit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuizCatalog;
    use quiz_core::time::fixed_now;
    use services::Clock;

    const CATALOG: &str = r#"{
        "sections": [{
            "id": "art",
            "questions": [
                { "prompt": "Painted Guernica?", "options": ["Dali", "Picasso"], "correct": [1] },
                { "prompt": "Primary colours?", "options": ["Red", "Green", "Blue"], "correct": [0, 2], "multiple": true }
            ]
        }]
    }"#;

    async fn repl() -> Repl {
        let catalog = QuizCatalog::from_json_str(CATALOG).unwrap();
        let services = QuizServices::in_memory(Clock::fixed(fixed_now()), catalog).await;
        Repl::new(services, FixedOffset::east_opt(0).unwrap())
    }

    async fn run(repl: &Repl, line: &str) -> String {
        let mut out = Vec::new();
        let command = Command::parse(line).unwrap();
        repl.execute(command, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    /// 1-based display numbers of the correct options for `question`.
    fn correct_numbers(repl: &Repl, question: usize) -> String {
        let q = repl.services.catalog().sections()[0]
            .question(question)
            .unwrap()
            .clone();
        let permutation = repl
            .services
            .store()
            .section(&"art".parse().unwrap())
            .and_then(|s| s.permutation(question).cloned())
            .unwrap();
        q.correct()
            .iter()
            .map(|&c| (permutation.display_of(c).unwrap() + 1).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[tokio::test]
    async fn start_without_fragment_shows_menu() {
        let repl = repl().await;
        let mut out = Vec::new();
        repl.start("", &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1. Art (art, 2 questions)"), "{text}");
    }

    #[tokio::test]
    async fn commands_need_an_open_section() {
        let repl = repl().await;
        assert_eq!(run(&repl, "total").await, "open a section first\n");
        assert!(run(&repl, "open 9").await.starts_with("error: unknown section"));
    }

    #[tokio::test]
    async fn full_attempt_then_history() {
        let repl = repl().await;
        assert!(run(&repl, "open art").await.contains("== Art =="));

        let missing = run(&repl, "total").await;
        assert_eq!(missing, "Answer these questions first: 1, 2\n");

        // The first selection froze the order, so correct answers can be looked up.
        run(&repl, "select 1").await;
        let first = correct_numbers(&repl, 0);
        let shown = run(&repl, &format!("select 1 {first}")).await;
        assert!(shown.contains("[x]"), "{shown}");
        assert!(run(&repl, "submit 1").await.starts_with("Correct!"));

        let second = correct_numbers(&repl, 1);
        run(&repl, &format!("select 2 {second}")).await;
        assert_eq!(run(&repl, "total").await, "You scored 2 out of 2.\n");

        let menu = run(&repl, "menu").await;
        assert!(menu.contains("next visit starts a new attempt"), "{menu}");
        assert!(menu.contains("> 1. Art"), "{menu}");

        let history = run(&repl, "history").await;
        assert_eq!(history, "2023-11-14\n  Art  2/2\n");
    }

    #[tokio::test]
    async fn validation_errors_are_reported_inline() {
        let repl = repl().await;
        run(&repl, "open 1").await;
        let out = run(&repl, "select 1 1 2").await;
        assert_eq!(out, "error: only one option may be selected for this question\n");
        let out = run(&repl, "submit 1").await;
        assert_eq!(out, "error: select at least one option before answering\n");
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let repl = repl().await;
        let mut out = Vec::new();
        let flow = repl.execute(Command::Quit, &mut out).await.unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
