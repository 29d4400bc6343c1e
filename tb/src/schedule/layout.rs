//! Side-by-side layout for overlapping calendar events

use tracing::trace;

/// Column placement for one interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Zero-based column within the overlap cluster
    pub column: usize,
    /// Number of columns the cluster needs
    pub columns: usize,
}

/// Assign columns to half-open `[start, end)` intervals
///
/// Intervals that transitively overlap form a cluster that shares one column
/// count. Inside a cluster each interval takes the lowest column that is free
/// at its start. The result is indexed like the input.
pub fn layout_overlaps<T: Ord + Copy>(intervals: &[(T, T)]) -> Vec<Slot> {
    trace!(count = intervals.len(), "layout_overlaps: called");
    let mut order: Vec<usize> = (0..intervals.len()).collect();
    order.sort_by_key(|&i| intervals[i]);

    let mut slots = vec![Slot { column: 0, columns: 1 }; intervals.len()];
    let mut cluster: Vec<usize> = Vec::new();
    let mut column_ends: Vec<T> = Vec::new();
    let mut cluster_end: Option<T> = None;

    for i in order {
        let (start, end) = intervals[i];

        if cluster_end.is_some_and(|cluster_end| start >= cluster_end) {
            close_cluster(&mut slots, &cluster, column_ends.len());
            cluster.clear();
            column_ends.clear();
            cluster_end = None;
        }

        let column = match column_ends.iter().position(|&col_end| col_end <= start) {
            Some(free) => {
                column_ends[free] = end;
                free
            }
            None => {
                column_ends.push(end);
                column_ends.len() - 1
            }
        };
        slots[i].column = column;
        cluster.push(i);
        cluster_end = Some(cluster_end.map_or(end, |current| current.max(end)));
    }
    close_cluster(&mut slots, &cluster, column_ends.len());

    slots
}

fn close_cluster(slots: &mut [Slot], cluster: &[usize], columns: usize) {
    for &i in cluster {
        slots[i].columns = columns.max(1);
    }
}
