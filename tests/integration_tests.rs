// Integration tests for Career Match

use career_match::config::SeedSettings;
use career_match::models::{NamedSkillExperience, Proficiency, ProfileStatus};
use career_match::services::{load_seeds, Engine};
use career_match::EngineError;
use std::path::Path;

fn named(name: &str, years: f64, proficiency: Proficiency) -> NamedSkillExperience {
    NamedSkillExperience {
        name: name.to_string(),
        experience_years: years,
        proficiency,
    }
}

async fn seeded_engine() -> Engine {
    let engine = Engine::with_defaults();
    let seed_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/seed");
    let settings = SeedSettings {
        builtin_vocabulary: true,
        skills_path: Some(seed_dir.join("skills.json")),
        postings_path: Some(seed_dir.join("postings.json")),
    };
    load_seeds(&engine, &settings).await.unwrap();
    engine
}

fn junior_full_stack() -> Vec<NamedSkillExperience> {
    vec![
        named("TypeScript", 1.0, Proficiency::Intermediate),
        named("react.js", 1.0, Proficiency::Intermediate),
        named("node", 0.5, Proficiency::Beginner),
    ]
}

#[tokio::test]
async fn test_integration_end_to_end_matching() {
    let engine = seeded_engine().await;
    let profile = engine.ingest_resume_named(junior_full_stack()).await.unwrap();

    let matches = engine.get_matches(&profile.id, 20, 0).await.unwrap();

    assert_eq!(matches.len(), 8);
    assert_eq!(matches[0].job_posting_id, "1");
    assert_eq!(matches[0].match_score, 90.0);
    assert!(matches[0]
        .reasoning
        .starts_with("Strong required-skill overlap: covers 3 of 3 required skills."));
    assert_eq!(matches[1].job_posting_id, "4");
    assert_eq!(matches[1].match_score, 45.0);

    for m in &matches {
        assert!(m.matched_skills.is_disjoint(&m.missing_skills));
        assert!((0.0..=100.0).contains(&m.match_score));
    }
    for pair in matches.windows(2) {
        assert!(pair[0].match_score >= pair[1].match_score);
    }
}

#[tokio::test]
async fn test_profile_derivation_against_catalog() {
    let engine = seeded_engine().await;
    let profile = engine
        .ingest_resume_named(vec![
            named("React", 3.0, Proficiency::Advanced),
            named("CSS", 2.0, Proficiency::Expert),
            named("Docker", 0.5, Proficiency::Beginner),
        ])
        .await
        .unwrap();

    assert_eq!(profile.total_experience_years, 3.0);
    assert_eq!(profile.strengths, vec!["react", "css"]);
    assert!(!profile.improvement_areas.is_empty());
    assert!(!profile
        .improvement_areas
        .contains(&career_match::SkillCategory::Frontend));
    assert!(profile.career_summary.starts_with("3.0 years of experience"));
}

#[tokio::test]
async fn test_matches_are_reproducible() {
    let engine = seeded_engine().await;
    let profile = engine.ingest_resume_named(junior_full_stack()).await.unwrap();

    let first = engine.get_matches(&profile.id, 20, 0).await.unwrap();
    let second = engine.get_matches(&profile.id, 20, 0).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Fresh);
}

#[tokio::test]
async fn test_profile_update_rescoring() {
    let engine = seeded_engine().await;
    let profile = engine
        .ingest_resume_named(vec![named("Python", 1.0, Proficiency::Intermediate)])
        .await
        .unwrap();

    let before = engine.get_matches(&profile.id, 1, 0).await.unwrap();
    assert_eq!(before[0].job_posting_id, "8");

    engine
        .update_profile_named(
            &profile.id,
            vec![
                named("Python", 1.0, Proficiency::Intermediate),
                named("pandas", 1.0, Proficiency::Intermediate),
                named("sklearn", 1.0, Proficiency::Beginner),
            ],
        )
        .await
        .unwrap();

    let after = engine.get_matches(&profile.id, 1, 0).await.unwrap();
    assert_eq!(after[0].job_posting_id, "8");
    assert!(after[0].match_score > before[0].match_score);
    assert!(after[0].missing_skills.is_empty());
}

#[tokio::test]
async fn test_removed_posting_is_gone() {
    let engine = seeded_engine().await;
    let profile = engine.ingest_resume_named(junior_full_stack()).await.unwrap();
    engine.get_matches(&profile.id, 20, 0).await.unwrap();

    engine.remove_posting("1").await.unwrap();

    let matches = engine.get_matches(&profile.id, 20, 0).await.unwrap();
    assert_eq!(matches.len(), 7);
    assert!(matches.iter().all(|m| m.job_posting_id != "1"));
    assert!(matches!(
        engine.get_posting("1").await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_profile() {
    let engine = seeded_engine().await;
    let result = engine.get_matches("missing", 10, 0).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_readers_and_writers() {
    let engine = std::sync::Arc::new(seeded_engine().await);
    let profile = engine.ingest_resume_named(junior_full_stack()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let profile_id = profile.id.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine
                    .update_profile_named(&profile_id, junior_full_stack())
                    .await
                    .map(|_| ())
            } else {
                engine.get_matches(&profile_id, 20, 0).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) | Err(EngineError::ScoringConflict(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let matches = engine.get_matches(&profile.id, 20, 0).await.unwrap();
    assert_eq!(matches[0].match_score, 90.0);
}
