use std::collections::BTreeSet;

use chrono::FixedOffset;
use quiz_core::model::{QuizCatalog, SectionPhase};
use quiz_core::time::fixed_now;
use services::{Clock, QuizServices, SectionTotal};

const CATALOG: &str = r#"{
    "sections": [
        {
            "id": "geografia",
            "title": "Geografía",
            "questions": [
                { "prompt": "Capital of Peru?", "options": ["Lima", "Quito", "La Paz"], "correct": [0] },
                { "prompt": "Andean countries?", "options": ["Chile", "Spain", "Bolivia", "Egypt"], "correct": [0, 2], "multiple": true }
            ]
        },
        {
            "id": "arte",
            "questions": [
                { "prompt": "Painted Guernica?", "options": ["Dalí", "Picasso"], "correct": [1] }
            ]
        }
    ]
}"#;

fn catalog() -> QuizCatalog {
    QuizCatalog::from_json_str(CATALOG).unwrap()
}

/// Answers every question of `section` correctly in display space.
async fn answer_all(services: &QuizServices, section: &str) {
    let sections = services.sections();
    let count = services.catalog().section(section).unwrap().question_count();
    for index in 0..count {
        let view = sections.render_section(section).await.unwrap();
        let question = services.catalog().section(section).unwrap().question(index).unwrap().clone();
        let picks: BTreeSet<usize> = view.questions[index]
            .options
            .iter()
            .filter(|o| question.is_correct_option(o.canonical_index))
            .map(|o| o.display_index)
            .collect();
        sections
            .record_selection_change(section, index, picks)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn full_attempt_round_trips_through_sqlite() {
    let url = "sqlite:file:memdb_quiz_flow?mode=memory&cache=shared";
    let services = QuizServices::new_sqlite(url, Clock::fixed(fixed_now()), catalog())
        .await
        .expect("services");

    let nav = services.navigator();
    nav.open_section("geografia", 55).await.unwrap();
    answer_all(&services, "geografia").await;

    let total = services
        .sections()
        .request_section_total("geografia")
        .await
        .unwrap();
    assert_eq!(total, SectionTotal::Completed { score: 2, total: 2 });

    // Same database, new page load.
    let reloaded = QuizServices::new_sqlite(url, Clock::fixed(fixed_now()), catalog())
        .await
        .expect("services");
    assert_eq!(
        reloaded.sections().phase("geografia").unwrap(),
        SectionPhase::Completed
    );
    let history = reloaded.history().list();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].section_title(), "Geografía");
    assert_eq!((history[0].score(), history[0].total()), (2, 2));
}

#[tokio::test]
async fn menu_reflects_each_section_phase() {
    let services = QuizServices::in_memory(Clock::fixed(fixed_now()), catalog()).await;
    let sections = services.sections();

    sections.render_section("arte").await.unwrap();
    sections
        .record_selection_change("geografia", 0, BTreeSet::from([1]))
        .await
        .unwrap();

    let menu = sections.list_sections();
    let phases: Vec<_> = menu.iter().map(|s| (s.id.as_str(), s.phase)).collect();
    assert_eq!(
        phases,
        [
            ("geografia", SectionPhase::InProgress),
            ("arte", SectionPhase::Unfrozen)
        ]
    );
    assert_eq!(menu[1].title, "Arte");
}

#[tokio::test]
async fn second_attempt_after_reset_is_recorded_separately() {
    let services = QuizServices::in_memory(Clock::fixed(fixed_now()), catalog()).await;
    let nav = services.navigator();

    for _ in 0..2 {
        nav.open_section("arte", 0).await.unwrap();
        answer_all(&services, "arte").await;
        assert!(
            services
                .sections()
                .request_section_total("arte")
                .await
                .unwrap()
                .is_completed()
        );
        assert!(nav.return_to_menu().await.unwrap().cleared);
    }

    let days = services.history().grouped(FixedOffset::east_opt(0).unwrap());
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].entries.len(), 2);
}
