//! End-to-end scenarios for the alert integrity pipeline: submission,
//! security rejections, scoring, vouching and snapshot metadata.

use cec_alerts::engine::{AlertEngine, RejectReason};
use cec_alerts::models::alert::{AlertKind, Category, TrustLevel};
use cec_alerts::models::report::{IncomingReport, Provenance};
use cec_alerts::sessions::SessionTracker;
use std::sync::Arc;

const HUMAN_UA: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 Mobile Safari";

fn engine_with_population(n: usize) -> AlertEngine {
    let sessions = Arc::new(SessionTracker::new(300_000));
    for i in 0..n {
        sessions.touch(&format!("10.0.1.{i}"), 0);
    }
    AlertEngine::new(sessions)
}

fn prov(addr: &str) -> Provenance {
    Provenance {
        source_addr: addr.to_string(),
        user_agent: HUMAN_UA.to_string(),
    }
}

fn need_help(message: &str) -> IncomingReport {
    IncomingReport {
        kind: Some("NEED_HELP".to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

#[test]
fn weak_signals_score_zero_and_stay_unverified() {
    let engine = engine_with_population(2);
    let report = IncomingReport {
        gps_accuracy: Some(200.0),
        signal_dbm: Some(-80.0),
        ..need_help("stuck under rubble")
    };

    let alert = engine.submit_at(report, &prov("10.0.1.0"), 1_000).unwrap();
    assert_eq!(alert.kind, AlertKind::NeedHelp);
    assert_eq!(alert.category, Category::Trapped);
    assert_eq!(alert.trust_score, 0);
    assert_eq!(alert.trust, TrustLevel::Unverified);
    assert!(alert.first_aid.unwrap().contains("Tap on pipes"));
}

#[test]
fn corroborated_report_verifies_at_any_population() {
    let engine = engine_with_population(10);
    let report = IncomingReport {
        gps_accuracy: Some(20.0),
        signal_dbm: Some(-50.0),
        photo_data: Some("aGVsbG8gd29ybGQ=".to_string()),
        ..need_help("stuck under rubble")
    };

    let alert = engine.submit_at(report, &prov("10.0.1.0"), 1_000).unwrap();
    assert_eq!(alert.trust_score, 70);
    assert_eq!(alert.trust, TrustLevel::Verified);
    assert!(alert.has_photo);
}

#[test]
fn missing_fields_reject_before_anything_else() {
    let engine = engine_with_population(2);

    let no_message = IncomingReport {
        kind: Some("NEED_HELP".to_string()),
        ..Default::default()
    };
    assert_eq!(
        engine.submit_at(no_message, &prov("10.0.1.0"), 0),
        Err(RejectReason::MissingFields)
    );

    let no_kind = IncomingReport {
        message: Some("help".to_string()),
        ..Default::default()
    };
    assert_eq!(
        engine.submit_at(no_kind, &prov("10.0.1.0"), 0),
        Err(RejectReason::MissingFields)
    );
}

#[test]
fn curl_from_public_address_is_rejected() {
    let engine = engine_with_population(2);
    let prov = Provenance {
        source_addr: "44.204.32.23".to_string(),
        user_agent: "curl/7.81.0".to_string(),
    };

    assert_eq!(
        engine.submit_at(need_help("please help"), &prov, 0),
        Err(RejectReason::BotSuspected("UA: curl".to_string()))
    );
}

#[test]
fn local_address_bypasses_the_bot_check() {
    let engine = engine_with_population(2);
    let prov = Provenance {
        source_addr: "192.168.1.9".to_string(),
        user_agent: "curl/7.81.0".to_string(),
    };

    assert!(engine.submit_at(need_help("please help"), &prov, 0).is_ok());
}

#[test]
fn sixteenth_submission_in_a_minute_is_rate_limited() {
    let engine = engine_with_population(3);
    let prov = prov("10.0.5.5");

    for i in 0..15i64 {
        // Distinct battery levels keep the fingerprints apart so only the
        // rate limiter is in play.
        let report = IncomingReport {
            battery_level: Some(i as f64 / 100.0),
            ..need_help("need water supply")
        };
        assert!(
            engine.submit_at(report, &prov, i * 100).is_ok(),
            "submission {} should pass",
            i + 1
        );
    }

    let report = IncomingReport {
        battery_level: Some(0.99),
        ..need_help("need water supply")
    };
    assert_eq!(
        engine.submit_at(report, &prov, 1_600),
        Err(RejectReason::RateLimited)
    );
}

#[test]
fn identical_fingerprints_cluster_on_the_sixth_report() {
    let engine = engine_with_population(3);

    for i in 0..5u64 {
        let report = IncomingReport {
            battery_level: Some(0.5),
            ..need_help("fire near the lab")
        };
        let p = prov(&format!("10.0.2.{i}"));
        assert!(
            engine.submit_at(report, &p, (i as i64) * 10_000).is_ok(),
            "observation {} should be accepted",
            i + 1
        );
    }

    let report = IncomingReport {
        battery_level: Some(0.5),
        ..need_help("fire near the lab")
    };
    assert_eq!(
        engine.submit_at(report, &prov("10.0.2.9"), 50_000),
        Err(RejectReason::BotCluster)
    );
}

#[test]
fn fourth_clustered_report_gets_the_ambush_flag() {
    let engine = engine_with_population(3);

    let clustered = |battery: f64| IncomingReport {
        lat: Some(30.3535),
        lng: Some(76.3595),
        battery_level: Some(battery),
        ..need_help("building collapse near gate")
    };

    for i in 0..3u64 {
        let alert = engine
            .submit_at(clustered(i as f64 / 10.0), &prov(&format!("10.0.3.{i}")), 1_000 + i as i64)
            .unwrap();
        assert!(!alert.ambush_flag, "report {} precedes the cluster", i + 1);
    }

    let fourth = engine
        .submit_at(clustered(0.4), &prov("10.0.3.4"), 2_000)
        .unwrap();
    assert!(fourth.ambush_flag, "fourth report inside 15s/50m is flagged");

    // 100+ meters away: outside the radius.
    let far = IncomingReport {
        lat: Some(30.3545),
        lng: Some(76.3595),
        battery_level: Some(0.5),
        ..need_help("building collapse near gate")
    };
    let far = engine.submit_at(far, &prov("10.0.3.5"), 2_500).unwrap();
    assert!(!far.ambush_flag);

    // Same spot, but the burst has aged past 15 seconds.
    let late = engine
        .submit_at(clustered(0.6), &prov("10.0.3.6"), 30_000)
        .unwrap();
    assert!(!late.ambush_flag);

    // Snapshot metadata: active while recent, inactive after 120s, but the
    // flag on the alert itself never clears.
    let (_, meta) = engine.snapshot_at(10_000);
    assert!(meta.ambush_active_flag);
    let (alerts, meta) = engine.snapshot_at(200_000);
    assert!(!meta.ambush_active_flag);
    assert!(alerts.iter().any(|a| a.ambush_flag));
}

#[test]
fn vouches_accumulate_and_recompute_the_full_formula() {
    let engine = engine_with_population(2);
    let report = IncomingReport {
        photo_data: Some("aGVsbG8=".to_string()),
        ..need_help("bleeding from leg")
    };
    let alert = engine.submit_at(report, &prov("10.0.1.0"), 1_000).unwrap();
    assert_eq!(alert.category, Category::Medical);
    assert_eq!(alert.trust_score, 30);
    assert_eq!(alert.vouches, 0);

    let first = engine.vouch_at(alert.id, 2).unwrap();
    assert_eq!(first.vouches, 1);
    assert_eq!(first.trust_score, 45);
    assert_eq!(first.trust, TrustLevel::Verified);

    let second = engine.vouch_at(alert.id, 2).unwrap();
    assert_eq!(second.vouches, 2);
    assert_eq!(second.trust_score, 60);

    // Vouch contribution caps at 30; the score settles instead of drifting.
    let third = engine.vouch_at(alert.id, 2).unwrap();
    assert_eq!(third.vouches, 3);
    assert_eq!(third.trust_score, 60);

    assert!(engine.vouch_at(9_999, 2).is_none());
}

#[test]
fn medical_wins_over_trapped_in_rule_order() {
    let engine = engine_with_population(2);
    let alert = engine
        .submit_at(need_help("bleeding and trapped under debris"), &prov("10.0.1.0"), 0)
        .unwrap();
    assert_eq!(alert.category, Category::Medical);
}

#[test]
fn snapshot_is_sorted_by_time_descending() {
    let engine = engine_with_population(2);
    for (i, t) in [1_000i64, 3_000, 2_000].iter().enumerate() {
        let report = IncomingReport {
            battery_level: Some(i as f64 / 10.0),
            ..need_help("reached the assembly point")
        };
        engine
            .submit_at(report, &prov(&format!("10.0.4.{i}")), *t)
            .unwrap();
    }

    let (alerts, meta) = engine.snapshot_at(5_000);
    let times: Vec<i64> = alerts.iter().map(|a| a.time).collect();
    assert_eq!(times, vec![3_000, 2_000, 1_000]);
    assert_eq!(meta.connected_devices, 2);
    assert!(meta.rural_mode);
}

#[test]
fn oversized_photos_are_dropped_not_rejected() {
    let engine = engine_with_population(2);
    let report = IncomingReport {
        photo_data: Some("A".repeat(900_000)),
        ..need_help("smoke in the corridor")
    };
    let alert = engine.submit_at(report, &prov("10.0.1.0"), 0).unwrap();
    assert!(!alert.has_photo);
    assert!(engine.photo(alert.id).is_none());

    let report = IncomingReport {
        battery_level: Some(0.3),
        photo_data: Some("aGVsbG8=".to_string()),
        ..need_help("smoke in the corridor")
    };
    let alert = engine.submit_at(report, &prov("10.0.1.0"), 100).unwrap();
    assert!(alert.has_photo);
    assert_eq!(engine.photo(alert.id).as_deref(), Some("aGVsbG8="));
}

#[test]
fn clear_all_resets_ids() {
    let engine = engine_with_population(2);
    engine
        .submit_at(need_help("okay now"), &prov("10.0.1.0"), 0)
        .unwrap();
    engine.clear_all();

    let (alerts, next_id) = engine.persistable();
    assert!(alerts.is_empty());
    assert_eq!(next_id, 1);

    let report = IncomingReport {
        battery_level: Some(0.7),
        ..need_help("okay now")
    };
    let alert = engine.submit_at(report, &prov("10.0.1.0"), 100).unwrap();
    assert_eq!(alert.id, 1);
}

#[test]
fn ids_are_unique_and_increase() {
    let engine = engine_with_population(2);
    let mut last = 0;
    for i in 0..5u64 {
        let report = IncomingReport {
            battery_level: Some(i as f64 / 10.0),
            ..need_help("we are safe at the shelter")
        };
        let alert = engine
            .submit_at(report, &prov(&format!("10.0.6.{i}")), i as i64 * 100)
            .unwrap();
        assert!(alert.id > last);
        last = alert.id;
    }
}
