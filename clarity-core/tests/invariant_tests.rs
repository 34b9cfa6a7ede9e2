//! Invariant Tests
//!
//! These tests explicitly validate the cross-cutting properties that must
//! always hold, over hand-picked and generated inputs.

use clarity_core::breakdown::BreakdownBuilder;
use clarity_core::ramble::{analyze_ramble, RambleResult, RambleThresholds};
use clarity_core::risk::{
    clarity_score, clarity_tier, compute_risk, default_tiers, should_flag, FlagPolicy,
};
use clarity_core::severity::{
    concept_spike_severity, grounding_gap_severity, structure_order_severity, tmb_severity,
    SpikeThresholds,
};
use clarity_core::timeline::{MAX_PEAKS, PEAK_THRESHOLD};
use clarity_core::{
    build_timeline, compute_signal_breakdown, BreakdownMode, Segment, Severity, SeverityMap,
    Signal, WeightTable,
};

/// Small deterministic generator so property checks are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    fn unit(&mut self) -> f64 {
        self.below(10_000) as f64 / 10_000.0
    }
}

const SIGNAL_POOL: &[&str] = &[
    "concept_spike",
    "grounding_gap",
    "tmb",
    "visual_mismatch",
    "structure_order",
    "ramble_ratio",
    "pace",
    "jargon",
];

fn random_segments(rng: &mut Lcg, count: usize) -> Vec<Segment> {
    let mut start = 0.0;
    (0..count)
        .map(|i| {
            let offset = rng.unit() * 4.0;
            let length = 0.5 + rng.unit() * 12.0;
            let seg_start = (start - offset).max(0.0);
            start += length;
            // risks stray outside [0, 10] on purpose
            let risk = rng.unit() * 16.0 - 3.0;
            let signals = (0..rng.below(5))
                .map(|_| Signal::from(SIGNAL_POOL[rng.below(SIGNAL_POOL.len() as u64) as usize]))
                .collect();
            Segment::new(format!("s{}", i), seg_start, start, risk, signals).unwrap()
        })
        .collect()
}

fn random_severity(rng: &mut Lcg) -> Severity {
    Severity::try_from(rng.below(3) as u8).unwrap()
}

#[test]
fn test_evaluators_stay_in_range() {
    let mut rng = Lcg(7);
    let spike = SpikeThresholds::default();
    for _ in 0..500 {
        let terms = rng.below(20) as usize;
        let avg = rng.unit() * 6.0;
        let claims = vec!["x"; rng.below(5) as usize];
        let evidence = vec!["y"; rng.below(5) as usize];
        let ungrounded = vec!["z"; rng.below(4) as usize];

        for severity in [
            concept_spike_severity(terms, avg, &spike),
            grounding_gap_severity(&ungrounded[..]),
            tmb_severity(&claims[..], &evidence[..]),
        ] {
            assert!(severity.value() <= 2);
        }
    }
}

#[test]
fn test_concept_spike_boundary() {
    let spike = SpikeThresholds::default();
    assert_eq!(concept_spike_severity(5, 2.0, &spike), Severity::Moderate);
}

#[test]
fn test_tmb_rules() {
    let none: [&str; 0] = [];
    assert_eq!(tmb_severity(&none, &["graph"]), Severity::None);
    assert_eq!(tmb_severity(&["faster"], &none), Severity::High);
    assert_eq!(tmb_severity(&["faster", "secure"], &["chart"]), Severity::Moderate);
    assert_eq!(tmb_severity(&["faster"], &["chart", "demo"]), Severity::None);
}

#[test]
fn test_ramble_threshold_is_inclusive() {
    // 3 fillers in 100 unique tokens: ratio exactly 0.03
    let mut words: Vec<String> = (0..97).map(|i| format!("w{}", i)).collect();
    words.insert(10, "um".to_string());
    words.insert(40, "uh".to_string());
    words.insert(70, "basically".to_string());
    let result = analyze_ramble(&words.join(" "), RambleThresholds::default());
    assert_eq!(result.total_words, 100);
    assert_eq!(result.filler_count, 3);
    assert!(result.repeated_phrases.is_empty());
    assert_eq!(result.severity, Severity::Moderate);
}

#[test]
fn test_ramble_empty_text() {
    let result = analyze_ramble("   ", RambleThresholds::default());
    assert_eq!(result, RambleResult::default());
    assert_eq!(result.filler_ratio, 0.0);
    assert_eq!(result.severity, Severity::None);
}

#[test]
fn test_risk_is_linear_in_weights() {
    let mut rng = Lcg(11);
    let base = WeightTable::default();
    for _ in 0..200 {
        let pace = random_severity(&mut rng);
        let severities: SeverityMap = Signal::KNOWN
            .iter()
            .map(|s| (s.clone(), random_severity(&mut rng)))
            .chain(std::iter::once((Signal::from("pace"), pace)))
            .collect();

        let k = 0.5 + rng.unit() * 3.0;
        let scaled: WeightTable = Signal::KNOWN
            .iter()
            .chain(std::iter::once(&Signal::from("pace")))
            .map(|s| (s.clone(), base.weight(s) * k))
            .collect();

        let risk = compute_risk(&severities, &base);
        let scaled_risk = compute_risk(&severities, &scaled);
        assert!((scaled_risk - risk * k).abs() < 1e-9);

        let manual: f64 = severities
            .iter()
            .map(|(s, sev)| base.weight(s) * f64::from(sev.value()))
            .sum();
        assert!((risk - manual).abs() < 1e-12);
    }
}

#[test]
fn test_unknown_signal_weight_is_one() {
    let severities = SeverityMap::new().with(Signal::from("pace"), Severity::High);
    assert_eq!(compute_risk(&severities, &WeightTable::default()), 2.0);
}

#[test]
fn test_clarity_reference_values() {
    let score = clarity_score(25.0, 5, 8.0);
    assert_eq!(score, 60);
    assert_eq!(clarity_tier(score, &default_tiers()), "Wait...what are we building?");

    assert_eq!(clarity_score(0.0, 0, 8.0), 50);
    assert_eq!(clarity_score(1_000.0, 0, 8.0), 50);
    assert_eq!(clarity_score(1_000.0, 1, 8.0), 0);
    assert_eq!(clarity_score(0.0, 3, 8.0), 100);
}

#[test]
fn test_flag_conditions_are_independent() {
    let policy = FlagPolicy::default();
    let two_active = SeverityMap::new()
        .with(Signal::Tmb, Severity::Moderate)
        .with(Signal::RambleRatio, Severity::Moderate);
    assert!(should_flag(3.99, &two_active, &policy));
    assert!(should_flag(4.0, &SeverityMap::new(), &policy));

    let one_active = SeverityMap::new().with(Signal::Tmb, Severity::High);
    assert!(!should_flag(3.99, &one_active, &policy));
}

#[test]
fn test_structure_order_reference_sequence() {
    let check = structure_order_severity(&[(0, "demo"), (1, "solution"), (2, "problem")]);
    let messages = check.messages();
    assert!(messages.contains(&"Solution presented before problem"));
    assert!(messages.contains(&"Demo shown before problem explained"));
    assert!(messages.iter().any(|m| m.starts_with("CRITICAL")));
    assert_eq!(check.severity, Severity::High);
}

#[test]
fn test_breakdown_percent_sums_to_100() {
    let mut rng = Lcg(23);
    for round in 0..200 {
        let segments = random_segments(&mut rng, 1 + round % 17);
        for mode in ["weighted", "count"] {
            let breakdown = compute_signal_breakdown(&segments, mode);
            if breakdown.items.is_empty() {
                assert_eq!(breakdown.total_weight, 0.0);
            } else {
                let sum: f64 = breakdown.items.iter().map(|i| i.percent).sum();
                assert!((sum - 100.0).abs() <= 0.01 + 1e-9, "sum {} in {}", sum, mode);
            }
        }
    }
}

#[test]
fn test_breakdown_keeps_zero_rows_internally() {
    let segments = vec![Segment::new("a", 0.0, 1.0, 3.0, vec![Signal::Tmb]).unwrap()];
    let tally = BreakdownBuilder::default().tally(&segments, BreakdownMode::Weighted);
    assert_eq!(tally.len(), 6);
    assert_eq!(tally.iter().filter(|r| r.weight == 0.0).count(), 5);

    let breakdown = compute_signal_breakdown(&segments, "weighted");
    assert_eq!(breakdown.items.len(), 1);
    assert_eq!(breakdown.items[0].percent, 100.0);
}

#[test]
fn test_breakdown_deduplicates_within_segment() {
    let segments = vec![Segment::new(
        "a",
        0.0,
        1.0,
        5.0,
        vec![Signal::Tmb, Signal::Tmb],
    )
    .unwrap()];
    let breakdown = compute_signal_breakdown(&segments, "weighted");
    assert_eq!(breakdown.items[0].weight, 5.0);
    assert_eq!(breakdown.items[0].segments, 1);
}

#[test]
fn test_empty_segments_have_empty_breakdown() {
    let breakdown = compute_signal_breakdown(&[], "weighted");
    assert_eq!(breakdown.total_weight, 0.0);
    assert!(breakdown.items.is_empty());
}

#[test]
fn test_timeline_invariants() {
    let mut rng = Lcg(31);
    for round in 0..200 {
        let segments = random_segments(&mut rng, round % 23);
        let bin_size = [0.5, 1.0, 2.5, 10.0][round % 4];
        let timeline = build_timeline(&segments, None, bin_size);

        assert!(timeline
            .values
            .iter()
            .all(|&v| (0.0..=1.0).contains(&v)));
        assert!(timeline.peaks.len() <= MAX_PEAKS);
        assert!(timeline.peaks.iter().all(|p| p.value > PEAK_THRESHOLD));
        for pair in timeline.peaks.windows(2) {
            assert!(pair[0].value >= pair[1].value);
        }
        for peak in &timeline.peaks {
            let time = peak.t as f64 * bin_size;
            let owner = segments.iter().find(|s| s.contains(time)).unwrap();
            assert_eq!(owner.segment_id, peak.segment_id);
        }
    }
}

#[test]
fn test_timeline_overlap_never_sums() {
    let segments = vec![
        Segment::new("a", 0.0, 3.0, 10.0, vec![]).unwrap(),
        Segment::new("b", 0.0, 3.0, 10.0, vec![]).unwrap(),
    ];
    let timeline = build_timeline(&segments, None, 1.0);
    assert_eq!(timeline.values, vec![1.0, 1.0, 1.0]);
}

#[test]
fn test_identical_input_identical_output() {
    let mut rng = Lcg(5);
    let segments = random_segments(&mut rng, 12);
    let a = serde_json::to_string(&build_timeline(&segments, None, 1.0)).unwrap();
    let b = serde_json::to_string(&build_timeline(&segments, None, 1.0)).unwrap();
    assert_eq!(a, b);
}
