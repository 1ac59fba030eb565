use refiner_core::{Action, BatchReport, Category, RecordResult};

const REPORT: &str = r#"
{
    "results": [
        {
            "status": "refined",
            "id": "asset_1a2b3c",
            "text": "Great job",
            "category": "Excellent work",
            "confidence": 1.0,
            "baseline_rating": 9,
            "refined_rating": 8,
            "action": "decrease",
            "reward": -1.0,
            "timestamp": "2024-05-01T10:00:00Z"
        },
        {
            "status": "failed",
            "id": "line 2",
            "stage": "parse",
            "error": "Malformed record: missing field `text`"
        }
    ],
    "summary": {
        "average_reward": -1.0,
        "q_table": {
            "Excellent work": {"decrease": -0.1, "hold": 0.0, "increase": 0.0}
        },
        "refined": 1,
        "failed": 1
    }
}
"#;

#[test]
fn test_deserialize_report_fixture() {
    let report: BatchReport = serde_json::from_str(REPORT).expect("Failed to deserialize report");

    assert_eq!(report.results.len(), 2);
    let refined = report.refined().next().expect("one refined record");
    assert_eq!(refined.category, Category::Excellent);
    assert_eq!(refined.action, Action::Decrease);
    assert!(matches!(&report.results[1], RecordResult::Failed(f) if f.stage == "parse"));

    let entry = report
        .summary
        .q_table
        .get(Category::Excellent)
        .expect("policy entry");
    assert!((entry.decrease + 0.1).abs() < 1e-12);
}

#[test]
fn test_report_survives_reserialization() {
    let report: BatchReport = serde_json::from_str(REPORT).expect("Failed to deserialize report");
    let again: BatchReport =
        serde_json::from_str(&serde_json::to_string(&report).expect("serialize"))
            .expect("Failed to deserialize report");
    assert_eq!(report, again);
}
