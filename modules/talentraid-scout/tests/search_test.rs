use std::sync::{Arc, Mutex};

use serde_json::json;

use talentraid_common::{Platform, ScrapingFilter};
use talentraid_scout::dedup::DedupIndex;
use talentraid_scout::platforms::adapter_for;
use talentraid_scout::search::SearchService;
use talentraid_scout::testing::{candidate, fiverr_item, nameless_fiverr_item, ScriptedRunner};

fn flutter_filter(max_results: usize) -> ScrapingFilter {
    ScrapingFilter::builder()
        .keyword("Flutter")
        .min_hourly_rate(40.0)
        .min_job_success_rate(85.0)
        .max_results(max_results)
        .platforms(vec![Platform::Fiverr])
        .build()
}

fn shared_index() -> Arc<Mutex<DedupIndex>> {
    Arc::new(Mutex::new(DedupIndex::new()))
}

#[tokio::test]
async fn buffer_fills_across_rounds_until_target() {
    let dedup = shared_index();
    dedup.lock().unwrap().register_candidate(&candidate(
        "Lucía Gómez",
        Platform::Fiverr,
        "https://www.fiverr.com/luciagomez",
    ));

    let top_rated = json!({
        "name": "Mateo Fernández",
        "username": "mateofdz",
        "url": "https://www.fiverr.com/mateofdz",
        "price": "$55",
        "rating": 5,
    });
    let runner = Arc::new(
        ScriptedRunner::new()
            .on_round(
                Platform::Fiverr,
                vec![
                    nameless_fiverr_item("ghost"),
                    fiverr_item("Lucía Gómez", "luciagomez"),
                    fiverr_item("Valentina Rojas", "valerojas"),
                ],
            )
            .on_round(Platform::Fiverr, vec![top_rated])
            .on_round(Platform::Fiverr, vec![fiverr_item("Never Reached", "neverreached")]),
    );

    let search = SearchService::new(runner.clone(), dedup.clone());
    let outcome = search.scrape(Platform::Fiverr, &flutter_filter(2), 10).await;

    assert_eq!(runner.rounds_for(Platform::Fiverr), 2);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.failed_rounds, 0);

    let names: Vec<&str> = outcome.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Mateo Fernández", "Valentina Rojas"]);
    assert!(outcome.candidates[0].talent_score > outcome.candidates[1].talent_score);

    // Survivors were registered into the shared index.
    assert_eq!(dedup.lock().unwrap().stats().urls, 3);
}

#[tokio::test]
async fn rounds_never_exceed_max_attempts() {
    let runner = Arc::new(ScriptedRunner::new());
    let search = SearchService::new(runner.clone(), shared_index());

    let outcome = search.scrape(Platform::Fiverr, &flutter_filter(5), 3).await;

    assert_eq!(runner.rounds_for(Platform::Fiverr), 3);
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.candidates.is_empty());
    assert!(outcome.had_successful_round());
}

#[tokio::test]
async fn failed_rounds_are_absorbed() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on_failure(Platform::Fiverr, "run ABORTED")
            .on_round(Platform::Fiverr, vec![fiverr_item("Valentina Rojas", "valerojas")]),
    );
    let search = SearchService::new(runner.clone(), shared_index());

    let outcome = search.scrape(Platform::Fiverr, &flutter_filter(1), 5).await;

    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.failed_rounds, 1);
    assert_eq!(outcome.candidates.len(), 1);
}

#[tokio::test]
async fn every_round_failing_is_reported() {
    let search = SearchService::new(Arc::new(ScriptedRunner::failing()), shared_index());

    let outcome = search.scrape(Platform::Upwork, &flutter_filter(5), 4).await;

    assert_eq!(outcome.attempts, 4);
    assert_eq!(outcome.failed_rounds, 4);
    assert!(!outcome.had_successful_round());
    assert!(outcome.candidates.is_empty());
}

#[tokio::test]
async fn each_attempt_uses_the_next_query_variation() {
    let runner = Arc::new(ScriptedRunner::new());
    let search = SearchService::new(runner.clone(), shared_index());

    search.scrape(Platform::LinkedIn, &flutter_filter(3), 7).await;

    let adapter = adapter_for(Platform::LinkedIn);
    let variations = adapter.query_variations("Flutter");
    let queries: Vec<String> = runner.jobs().into_iter().map(|j| j.query).collect();
    assert_eq!(queries.len(), 7);
    assert_eq!(&queries[..5], &variations[..]);
    assert_eq!(queries[5], variations[4]);
    assert_eq!(queries[6], variations[4]);
}

#[tokio::test]
async fn result_hint_tracks_remaining_need() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on_round(Platform::Fiverr, vec![fiverr_item("Valentina Rojas", "valerojas")])
            .on_round(Platform::Fiverr, vec![fiverr_item("Mateo Fernández", "mateofdz")]),
    );
    let search = SearchService::new(runner.clone(), shared_index());

    search.scrape(Platform::Fiverr, &flutter_filter(3), 2).await;

    let hints: Vec<usize> = runner.jobs().iter().map(|j| j.result_hint).collect();
    assert_eq!(hints, vec![6, 4]);
}

#[tokio::test]
async fn shared_index_suppresses_the_same_person_across_platforms() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on_round(Platform::Fiverr, vec![fiverr_item("Valentina Rojas", "valerojas")])
            .on_round(
                Platform::LinkedIn,
                vec![json!({
                    "name": "Valentina Rojas",
                    "url": "https://www.linkedin.com/in/valentina-rojas-dev",
                    "headline": "Flutter Engineer"
                })],
            ),
    );
    let search = SearchService::new(runner.clone(), shared_index());

    let fiverr = search.scrape(Platform::Fiverr, &flutter_filter(1), 1).await;
    let linkedin = search.scrape(Platform::LinkedIn, &flutter_filter(1), 1).await;

    assert_eq!(fiverr.candidates.len(), 1);
    assert!(linkedin.candidates.is_empty());
}
