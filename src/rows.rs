//! Grouping positioned OCR elements into rows.

use std::collections::HashMap;

use crate::ocr::OcrElement;

/// Default maximum vertical gap, in pixels, between neighbors in one row.
pub const DEFAULT_ROW_THRESHOLD: u32 = 5;

/// Cluster elements into rows by vertical proximity.
///
/// Elements are stably sorted by `y`, then split wherever two *neighboring*
/// elements are more than `threshold` apart. A row may therefore span more
/// than `threshold` pixels in total, as long as each step within it is small.
/// Rows come back top to bottom; ties on `y` keep their input order.
///
/// Empty input produces no rows.
pub fn cluster_rows_by_y(elements: &[OcrElement], threshold: u32) -> Vec<Vec<&OcrElement>> {
    let mut sorted = elements.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|element| element.y);

    let mut rows = vec![];
    let mut sorted = sorted.into_iter();
    let Some(first) = sorted.next() else {
        return rows;
    };

    let mut previous_y = first.y;
    let mut current = vec![first];
    for element in sorted {
        if element.y.abs_diff(previous_y) > threshold {
            rows.push(std::mem::take(&mut current));
        }
        previous_y = element.y;
        current.push(element);
    }
    rows.push(current);
    rows
}

/// Group elements that share exactly the same `y`.
///
/// Groups appear in the order their `y` value was first seen, and elements
/// keep their input order within a group.
pub fn group_rows_by_exact_y(elements: &[OcrElement]) -> Vec<Vec<&OcrElement>> {
    let mut group_for_y = HashMap::new();
    let mut groups: Vec<Vec<&OcrElement>> = vec![];
    for element in elements {
        let idx = *group_for_y.entry(element.y).or_insert_with(|| {
            groups.push(vec![]);
            groups.len() - 1
        });
        groups[idx].push(element);
    }
    groups
}
