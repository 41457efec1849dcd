//! Removal of matches nested inside a neighbouring match.

use std::cmp::Ordering;

use super::LineMatch;

/// Orders by line and start column; on ties a containing match comes first.
fn compare(a: &LineMatch, b: &LineMatch) -> Ordering {
    let (la, lb) = (&a.location, &b.location);
    la.line()
        .cmp(&lb.line())
        .then(la.start_column().cmp(&lb.start_column()))
        .then_with(|| {
            if la == lb {
                Ordering::Equal
            } else if lb.is_inside(la) {
                Ordering::Less
            } else if la.is_inside(lb) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
}

/// Sorts matches and drops each one nested inside its predecessor.
///
/// The sort is stable, so matches comparing equal keep their input order.
pub fn filter_overlapping(mut matches: Vec<LineMatch>) -> Vec<LineMatch> {
    if matches.len() <= 1 {
        return matches;
    }
    matches.sort_by(compare);

    let mut out = Vec::with_capacity(matches.len());
    let mut iter = matches.into_iter();
    let Some(mut prev) = iter.next() else {
        return out;
    };
    for curr in iter {
        if curr.location.is_inside(&prev.location) {
            continue;
        }
        out.push(prev);
        prev = curr;
    }
    out.push(prev);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    fn m(line: usize, start: usize, end: usize) -> LineMatch {
        LineMatch {
            location: Location::new(line, start, end).unwrap(),
            line: format!("line {line}"),
        }
    }

    #[test]
    fn nested_match_is_dropped_in_any_order() {
        let a = m(1, 1, 10);
        let b = m(1, 3, 5);
        assert_eq!(filter_overlapping(vec![a.clone(), b.clone()]), vec![a.clone()]);
        assert_eq!(filter_overlapping(vec![b, a.clone()]), vec![a]);
    }

    #[test]
    fn disjoint_matches_are_sorted() {
        let a = m(1, 1, 3);
        let c = m(2, 1, 3);
        assert_eq!(
            filter_overlapping(vec![c.clone(), a.clone()]),
            vec![a, c]
        );
    }

    #[test]
    fn same_start_keeps_container() {
        let short = m(3, 4, 6);
        let long = m(3, 4, 12);
        assert_eq!(filter_overlapping(vec![short, long.clone()]), vec![long]);
    }

    #[test]
    fn duplicates_collapse() {
        let a = m(1, 2, 4);
        assert_eq!(filter_overlapping(vec![a.clone(), a.clone()]), vec![a]);
    }

    #[test]
    fn partial_overlap_is_kept() {
        let a = m(1, 1, 5);
        let b = m(1, 4, 8);
        assert_eq!(
            filter_overlapping(vec![b.clone(), a.clone()]),
            vec![a, b]
        );
    }

    #[test]
    fn small_inputs_unchanged() {
        assert!(filter_overlapping(Vec::new()).is_empty());
        let one = vec![m(5, 1, 1)];
        assert_eq!(filter_overlapping(one.clone()), one);
    }
}
