use core::{fmt::Display, time::Duration};
use hashbrown::HashMap;

/// Launch durations of the kernels run since the last summary, keyed by entry name.
///
/// Every configuration of a kernel shares its entry name, so a row aggregates all the
/// configurations measured for that kernel.
#[derive(Debug, Default)]
pub(crate) struct LaunchSummary {
    kernels: HashMap<String, KernelLaunches>,
}

#[derive(Debug, Clone, Copy)]
struct KernelLaunches {
    count: usize,
    total: Duration,
    fastest: Duration,
}

/// How much of the profiling output is shown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProfileLevel {
    /// Only the summary at the end of a tuning session.
    Basic,
    /// The summary and the duration of every launch.
    Medium,
    /// Same as medium, for every launch and profiling pass.
    Full,
}

impl LaunchSummary {
    /// If no launch was recorded.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Record the duration of a launch. Only the first line of the name is kept.
    pub fn update(&mut self, name: &str, duration: Duration) {
        let name = name.lines().next().unwrap_or(name);
        self.kernels
            .entry_ref(name)
            .and_modify(|launches| {
                launches.count += 1;
                launches.total += duration;
                launches.fastest = launches.fastest.min(duration);
            })
            .or_insert(KernelLaunches {
                count: 1,
                total: duration,
                fastest: duration,
            });
    }

    fn rows(&self) -> (Vec<[String; 5]>, [String; 5]) {
        let total: Duration = self.kernels.values().map(|launches| launches.total).sum();
        let count: usize = self.kernels.values().map(|launches| launches.count).sum();

        let mut kernels: Vec<(&String, &KernelLaunches)> = self.kernels.iter().collect();
        kernels.sort_by(|(name_a, a), (name_b, b)| b.total.cmp(&a.total).then(name_a.cmp(name_b)));

        let rows = kernels
            .into_iter()
            .map(|(name, launches)| {
                let share = match total.as_nanos() {
                    0 => 0,
                    total => 100 * launches.total.as_nanos() / total,
                };
                [
                    name.clone(),
                    launches.count.to_string(),
                    format!("{:?}", launches.total),
                    format!("{:?}", launches.fastest),
                    format!("{share} %"),
                ]
            })
            .collect();
        let footer = [
            "Total".to_string(),
            count.to_string(),
            format!("{total:?}"),
            String::new(),
            "100 %".to_string(),
        ];

        (rows, footer)
    }
}

impl Display for LaunchSummary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let header = ["Kernel", "Launches", "Total", "Fastest", "Share"].map(str::to_string);
        let (rows, footer) = self.rows();

        let mut widths = [0; 5];
        for row in core::iter::once(&header).chain(&rows).chain(core::iter::once(&footer)) {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let rule = "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len() + 1);

        let write_row = |f: &mut core::fmt::Formatter<'_>, row: &[String; 5]| {
            for (cell, width) in row.iter().zip(widths) {
                write!(f, "| {cell:<width$} ")?;
            }
            writeln!(f, "|")
        };

        writeln!(f, "{rule}")?;
        write_row(f, &header)?;
        writeln!(f, "{rule}")?;
        for row in rows.iter() {
            write_row(f, row)?;
        }
        writeln!(f, "{rule}")?;
        write_row(f, &footer)?;
        writeln!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_orders_kernels_by_total_duration() {
        let mut summary = LaunchSummary::default();
        summary.update("gemm", Duration::from_millis(4));
        summary.update("gemm", Duration::from_millis(2));
        summary.update("reduce\nTILE=4", Duration::from_millis(2));

        let table = summary.to_string();
        let gemm = table.find("| gemm").unwrap();
        let reduce = table.find("| reduce").unwrap();

        assert!(gemm < reduce);
        assert!(table.contains("75 %"));
        assert!(table.contains("| Total"));
        assert!(!table.contains("TILE=4"));
    }

    #[test]
    fn fastest_launch_is_kept_per_kernel() {
        let mut summary = LaunchSummary::default();
        summary.update("copy", Duration::from_micros(30));
        summary.update("copy", Duration::from_micros(10));

        let launches = summary.kernels["copy"];

        assert_eq!(launches.count, 2);
        assert_eq!(launches.fastest, Duration::from_micros(10));
        assert_eq!(launches.total, Duration::from_micros(40));
    }

    #[test]
    fn empty_summary_has_zero_total() {
        let summary = LaunchSummary::default();

        assert!(summary.is_empty());
        assert!(summary.to_string().contains("| Total  | 0 "));
    }
}
