use crate::deviation::Deviation;
use std::fmt;

/// Two-row table: "partition 1..n" headers over the per-bin counts.
pub struct HistogramTable<'a> {
    counts: &'a [u32],
}

impl<'a> HistogramTable<'a> {
    pub fn new(counts: &'a [u32]) -> Self {
        HistogramTable { counts }
    }
}

impl fmt::Display for HistogramTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<String> = (1..=self.counts.len()).map(|i| format!("partition {i}")).collect();
        let cells: Vec<String> = self.counts.iter().map(u32::to_string).collect();
        let widths: Vec<usize> = headers.iter().zip(&cells).map(|(h, c)| h.len().max(c.len())).collect();

        for (row_idx, row) in [&headers, &cells].into_iter().enumerate() {
            if row_idx > 0 {
                writeln!(f)?;
            }
            write!(f, "|")?;
            for (cell, width) in row.iter().zip(widths.iter().copied()) {
                write!(f, " {cell:>width$} |")?;
            }
        }
        Ok(())
    }
}

/// Deviation line shown under the table.
pub struct DeviationReadout(pub Deviation);

impl fmt::Display for DeviationReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deviation (χ²): {}", self.0)
    }
}

/// Running count of spawned particles.
pub struct SpawnCounter(pub u32);

impl fmt::Display for SpawnCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spawned particles = {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::deviation;

    #[test]
    fn table_has_header_and_count_rows() {
        let table = HistogramTable::new(&[3, 12, 5]).to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "| partition 1 | partition 2 | partition 3 |");
        assert_eq!(lines[1], "|           3 |          12 |           5 |");
    }

    #[test]
    fn readouts_format_values() {
        let d = deviation(&[0, 0, 0]).unwrap();
        assert_eq!(DeviationReadout(d).to_string(), "deviation (χ²): 0.00");
        assert_eq!(SpawnCounter(17).to_string(), "spawned particles = 17");
    }
}
