use std::collections::BTreeSet;

use resp_server_rs::datastruct::sortedset::SortedSet;

/// Reference ordering for a workload: a BTreeSet over (score-bits, member)
/// with scores kept to exact halves so the bit ordering matches the float
/// ordering.
fn reference(pairs: &[(String, f64)]) -> Vec<String> {
    let mut last: std::collections::HashMap<&str, f64> = Default::default();
    for (m, s) in pairs {
        last.insert(m, *s);
    }
    let ordered: BTreeSet<(i64, &str)> =
        last.iter().map(|(m, s)| ((s * 2.0) as i64, *m)).collect();
    ordered.into_iter().map(|(_, m)| m.to_string()).collect()
}

fn workload() -> Vec<(String, f64)> {
    // deterministic, collision-heavy: members re-added with new scores
    (0..600)
        .map(|i| (format!("m{}", i % 97), f64::from(i % 13) / 2.0))
        .collect()
}

#[test]
fn skiplist_matches_reference_ordering_under_rescoring() {
    let pairs = workload();
    let mut set = SortedSet::new();
    for (m, s) in &pairs {
        set.add(m, *s);
    }

    let expected = reference(&pairs);
    assert_eq!(set.len() as usize, expected.len());

    let mut walked = Vec::new();
    set.for_each(|e| {
        walked.push(e.member.clone());
        true
    });
    assert_eq!(walked, expected);
}

#[test]
fn rank_and_random_access_agree_after_mixed_operations() {
    let mut set = SortedSet::new();
    for (m, s) in workload() {
        set.add(&m, s);
    }
    for i in (0..97).step_by(5) {
        set.remove(&format!("m{i}"));
    }

    for rank in 0..set.len() {
        let forward = set.get_by_rank(rank, false).expect("forward rank");
        assert_eq!(set.get_rank(&forward.member, false), Some(rank));

        let reverse = set.get_by_rank(rank, true).expect("reverse rank");
        assert_eq!(set.get_rank(&reverse.member, true), Some(rank));
    }
    assert!(set.get_by_rank(set.len(), false).is_none());
    assert!(set.get_by_rank(-1, false).is_none());
}

#[test]
fn removal_leaves_no_trace() {
    let mut set = SortedSet::new();
    for (m, s) in workload() {
        set.add(&m, s);
    }
    let before = set.len();
    assert!(set.remove("m42"));
    assert_eq!(set.len(), before - 1);
    assert!(!set.exists("m42"));
    assert_eq!(set.get_score("m42"), None);
    assert_eq!(set.get_rank("m42", false), None);

    let mut seen = false;
    set.for_each(|e| {
        seen |= e.member == "m42";
        true
    });
    assert!(!seen);
}

#[test]
fn score_range_pagination_is_stable() {
    let mut set = SortedSet::new();
    for i in 0..50 {
        set.add(&format!("m{i:02}"), 1.0);
    }
    let mut collected = Vec::new();
    let mut offset = 0;
    loop {
        let page = set.get_by_score_range(1.0, 1.0, offset, 7, false);
        if page.is_empty() {
            break;
        }
        offset += page.len() as i64;
        collected.extend(page.into_iter().map(|e| e.member));
    }
    assert_eq!(collected.len(), 50);
    let mut sorted = collected.clone();
    sorted.sort();
    assert_eq!(collected, sorted);
}
