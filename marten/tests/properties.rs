//! Invariant checks over generated documents and change sets.
//!
//! A small deterministic generator stands in for a fuzzer: the same seeds
//! produce the same cases on every run.

use marten::{ChangeSet, ChangeSpec, Range, RangeSet, RangeValue, Text, Touches, UpdateSpec};

struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Lcg {
        Lcg(seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493))
    }

    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n.max(1) as u64) as usize
    }
}

fn random_line(rng: &mut Lcg) -> String {
    let alphabet = ['a', 'b', 'c', ' ', 'x', '\u{e9}', '\u{4e16}'];
    (0..rng.below(12))
        .map(|_| alphabet[rng.below(alphabet.len())])
        .collect()
}

fn random_doc(rng: &mut Lcg, max_lines: usize) -> Text {
    let lines = 1 + rng.below(max_lines);
    Text::of((0..lines).map(|_| random_line(rng)))
}

/// Non-overlapping, in-order changes; overlap within one batch is
/// unspecified, so the generator never produces it.
fn random_changes(rng: &mut Lcg, len: usize) -> ChangeSet {
    let mut specs = Vec::new();
    let mut pos = 0;
    for _ in 0..1 + rng.below(4) {
        if pos > len {
            break;
        }
        let from = pos + rng.below(len - pos + 1);
        let to = (from + rng.below(9)).min(len);
        let insert: String = (0..rng.below(6))
            .map(|_| ['x', 'y', '\n'][rng.below(3)])
            .collect();
        specs.push(ChangeSpec::replace(from, to, insert));
        pos = to + 1;
    }
    if specs.is_empty() {
        specs.push(ChangeSpec::insert(rng.below(len + 1), "x"));
    }
    ChangeSet::of(specs, len, None).unwrap()
}

#[test]
fn document_length_counts_lines_and_breaks() {
    let mut rng = Lcg::new(1);
    for _ in 0..50 {
        let lines: Vec<String> = (0..1 + rng.below(80)).map(|_| random_line(&mut rng)).collect();
        let doc = Text::of(lines.clone());
        let content: usize = lines
            .iter()
            .map(|l| l.chars().map(char::len_utf16).sum::<usize>())
            .sum();
        assert_eq!(doc.len(), content + lines.len() - 1);
        assert_eq!(doc.lines(), lines.len());
    }
}

#[test]
fn slices_round_trip() {
    let mut rng = Lcg::new(2);
    for _ in 0..30 {
        let doc = random_doc(&mut rng, 60);
        assert_eq!(doc.slice(0, doc.len()), doc);
        let a = rng.below(doc.len() + 1);
        let b = a + rng.below(doc.len() - a + 1);
        let slice = doc.slice(a, b);
        assert_eq!(slice.len(), b - a);
        assert_eq!(
            slice.to_string(),
            doc.slice_string(a, b, "\n"),
            "slice disagrees with slice_string over {a}..{b}"
        );
    }
}

#[test]
fn replace_composes_from_delete_and_insert() {
    let mut rng = Lcg::new(3);
    for _ in 0..30 {
        let doc = random_doc(&mut rng, 40);
        let insert = random_doc(&mut rng, 4);
        let a = rng.below(doc.len() + 1);
        let b = a + rng.below(doc.len() - a + 1);
        let replaced = doc.replace(a, b, &insert).unwrap();
        let spliced = doc
            .replace(a, b, &Text::of([""]))
            .unwrap()
            .replace(a, a, &insert)
            .unwrap();
        assert_eq!(replaced, spliced);
    }
}

#[test]
fn line_lookup_brackets_every_position() {
    let mut rng = Lcg::new(4);
    let doc = random_doc(&mut rng, 120);
    let mut last_number = 1;
    for pos in 0..=doc.len() {
        let line = doc.line_at(pos).unwrap();
        assert!(line.from <= pos && pos <= line.to);
        assert_eq!(line.text.chars().map(char::len_utf16).sum::<usize>(), line.len());
        assert!(line.number >= last_number);
        last_number = line.number;
        assert_eq!(doc.line(line.number).unwrap(), line);
    }
    assert_eq!(last_number, doc.lines());
}

#[test]
fn inverted_changes_restore_the_document() {
    let mut rng = Lcg::new(5);
    for _ in 0..40 {
        let doc = random_doc(&mut rng, 30);
        let changes = random_changes(&mut rng, doc.len());
        let applied = changes.apply(&doc).unwrap();
        assert_eq!(applied.len(), changes.new_len());
        let inverted = changes.invert(&doc).unwrap();
        assert_eq!(inverted.apply(&applied).unwrap(), doc);
    }
}

#[test]
fn concurrent_changes_converge_when_rebased() {
    let mut rng = Lcg::new(6);
    for case in 0..60 {
        let doc = random_doc(&mut rng, 25);
        let a = random_changes(&mut rng, doc.len());
        let b = random_changes(&mut rng, doc.len());
        let via_a = a.compose(&b.map(&a, false).unwrap()).unwrap();
        let via_b = b.compose(&a.map(&b, true).unwrap()).unwrap();
        assert_eq!(
            via_a.apply(&doc).unwrap(),
            via_b.apply(&doc).unwrap(),
            "case {case}: rebasing a={a:?} over b={b:?} diverged"
        );
    }
}

#[test]
fn description_composition_is_associative() {
    let mut rng = Lcg::new(7);
    for _ in 0..40 {
        let doc = random_doc(&mut rng, 20);
        let a = random_changes(&mut rng, doc.len());
        let b = random_changes(&mut rng, a.new_len());
        let c = random_changes(&mut rng, b.new_len());
        let left = a
            .compose_desc(&b)
            .unwrap()
            .compose_desc(&c)
            .unwrap();
        let right = a
            .compose_desc(&b.compose_desc(&c).unwrap())
            .unwrap();
        assert_eq!(left, right);
    }
}

#[test]
fn position_mapping_is_monotone() {
    let mut rng = Lcg::new(8);
    for _ in 0..40 {
        let doc = random_doc(&mut rng, 25);
        let changes = random_changes(&mut rng, doc.len());
        let mut last = 0;
        for pos in 0..=doc.len() {
            let mapped = changes.map_pos(pos, -1);
            assert!(mapped >= last, "mapping went backwards at {pos}");
            assert!(mapped <= changes.new_len());
            last = mapped;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag(usize);

impl RangeValue for Tag {}

#[test]
fn range_sets_iterate_in_sorted_order() {
    let mut rng = Lcg::new(9);
    for _ in 0..20 {
        let ranges: Vec<Range<Tag>> = (0..rng.below(40))
            .map(|i| {
                let from = rng.below(500);
                Range {
                    from,
                    to: from + rng.below(30),
                    value: Tag(i),
                }
            })
            .collect();
        let count = ranges.len();
        let set = RangeSet::of(ranges, true);
        assert_eq!(set.size(), count);
        let mut last_from = 0;
        let mut seen = 0;
        for (from, to, _) in set.iter(0) {
            assert!(from >= last_from, "iteration went backwards");
            assert!(to >= from);
            last_from = from;
            seen += 1;
        }
        assert_eq!(seen, count);
    }
}

#[test]
fn untouched_ranges_survive_mapping_with_shifted_positions() {
    let mut rng = Lcg::new(10);
    for _ in 0..20 {
        let doc_len = 400;
        let ranges: Vec<Range<Tag>> = (0..20)
            .map(|i| {
                let from = rng.below(doc_len - 20);
                Range {
                    from,
                    to: from + 1 + rng.below(10),
                    value: Tag(i),
                }
            })
            .collect();
        let set = RangeSet::of(ranges.clone(), true);
        let changes = random_changes(&mut rng, doc_len);
        let mapped = set.map(&changes);
        let survivors: Vec<(usize, usize, Tag)> = mapped
            .iter(0)
            .map(|(from, to, v)| (from, to, v.clone()))
            .collect();
        for range in &ranges {
            if changes.touches_range(range.from, range.to) == Touches::No {
                let expected = (
                    changes.map_pos(range.from, -1),
                    changes.map_pos(range.to, -1),
                    range.value.clone(),
                );
                assert!(
                    survivors.contains(&expected),
                    "untouched range {range:?} did not map to {expected:?}"
                );
            }
        }
    }
}

#[test]
fn empty_update_returns_the_identical_set() {
    let set = RangeSet::of(
        vec![Range {
            from: 2,
            to: 6,
            value: Tag(0),
        }],
        false,
    );
    assert!(set.update(UpdateSpec::default()).same(&set));
}

#[test]
fn compare_reports_wherever_eq_detects_a_difference() {
    let mut rng = Lcg::new(11);

    struct Collector {
        changed: Vec<(usize, usize)>,
    }

    impl marten::RangeComparator<Tag> for Collector {
        fn compare_range(&mut self, from: usize, to: usize, _: &[&Tag], _: &[&Tag]) {
            self.changed.push((from, to));
        }

        fn compare_point(
            &mut self,
            from: usize,
            to: usize,
            _: Option<&Tag>,
            _: Option<&Tag>,
        ) {
            self.changed.push((from, to));
        }
    }

    for _ in 0..20 {
        let old_ranges: Vec<Range<Tag>> = (0..5 + rng.below(10))
            .map(|i| {
                let from = rng.below(200);
                Range {
                    from,
                    to: from + rng.below(20),
                    value: Tag(i),
                }
            })
            .collect();
        let old = RangeSet::of(old_ranges, true);
        let new = old.update(UpdateSpec {
            filter: Some(Box::new(|from, _, _| from % 3 != 0)),
            ..UpdateSpec::default()
        });
        let diff = ChangeSet::empty(300).desc();
        let mut collector = Collector { changed: Vec::new() };
        RangeSet::compare(&[old.clone()], &[new.clone()], &diff, &mut collector, -1);
        let equal = RangeSet::eq_sets(&[old], &[new], 0, Some(300));
        assert_eq!(
            equal,
            collector.changed.is_empty(),
            "compare and eq disagree: changed regions {:?}",
            collector.changed
        );
    }
}
