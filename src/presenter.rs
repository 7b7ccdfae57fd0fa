use std::io::Write;

use crossterm::style::Stylize;
use heap_walker::{Chunk, WalkReport};
use num_format::{Locale, ToFormattedString};

const HEADERS: [&str; 3] = ["Block Address", "User Data Start", "Total Size (bytes)"];
const LOCALE: &Locale = &Locale::en;

#[derive(Copy, Clone, Debug, Default)]
pub struct Style {
    pub color: bool,
}

fn cells(chunk: &Chunk) -> [String; 3] {
    [
        chunk.address.to_string(),
        chunk
            .user_data
            .map(|a| a.to_string())
            .unwrap_or_else(|| "FREE".to_string()),
        chunk.size.to_string(),
    ]
}

/// Renders the chunk table, one row per chunk in address order
pub fn render_table(report: &WalkReport, style: Style) -> String {
    let rows: Vec<[String; 3]> = report.chunks().iter().map(cells).collect();
    let widths = rows.iter().fold(HEADERS.map(str::len), |mut acc, row| {
        for (width, cell) in acc.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
        acc
    });

    let separator = format!(
        "+{}+\n",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut table = String::new();
    table.push_str(&separator);
    let header: Vec<String> = HEADERS
        .iter()
        .zip(&widths)
        .map(|(h, &w)| {
            let cell = format!("{:<w$}", h);
            if style.color {
                cell.bold().cyan().to_string()
            } else {
                cell
            }
        })
        .collect();
    table.push_str(&format!("| {} |\n", header.join(" | ")));
    table.push_str(&separator);

    for (row, chunk) in rows.iter().zip(report.chunks()) {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(column, (cell, &w))| {
                // Sizes read best right-aligned, addresses left-aligned
                let padded = if column == 2 {
                    format!("{:>w$}", cell)
                } else {
                    format!("{:<w$}", cell)
                };
                if style.color && chunk.is_free() {
                    padded.yellow().to_string()
                } else {
                    padded
                }
            })
            .collect();
        table.push_str(&format!("| {} |\n", line.join(" | ")));
    }
    table.push_str(&separator);
    table
}

pub fn summary_line(report: &WalkReport) -> String {
    format!(
        "{} blocks: {}/{} bytes free",
        report.block_count(),
        report.free_bytes(),
        report.total_bytes()
    )
}

pub fn write_report(out: &mut dyn Write, report: &WalkReport, style: Style) -> std::io::Result<()> {
    out.write_all(render_table(report, style).as_bytes())?;
    writeln!(out, "{}", summary_line(report))
}

/// Rows walked before a failure, flagged so nobody mistakes them for the whole heap
pub fn write_partial(out: &mut dyn Write, report: &WalkReport, style: Style) -> std::io::Result<()> {
    let notice = "walk did not finish, partial results follow";
    if style.color {
        writeln!(out, "{}", notice.red())?;
    } else {
        writeln!(out, "{}", notice)?;
    }
    write_report(out, report, style)
}

pub fn write_stats(out: &mut dyn Write, report: &WalkReport) -> std::io::Result<()> {
    let bytes = |n: u64| n.to_formatted_string(LOCALE);
    writeln!(out, "{}", summary_line(report))?;
    writeln!(
        out,
        "in use: {} bytes in {} chunks",
        bytes(report.in_use_bytes()),
        report.block_count() - report.free_chunk_count()
    )?;
    match report.largest_free_chunk() {
        Some(largest) => writeln!(
            out,
            "free: {} bytes in {} chunks, largest {} bytes at {}",
            bytes(report.free_bytes()),
            report.free_chunk_count(),
            bytes(largest.size),
            largest.address
        )?,
        None => writeln!(out, "free: none")?,
    }
    writeln!(out, "fragmentation: {:.2}%", report.fragmentation() * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heap_walker::{
        Address, HeapGeometry, HeapWalker, image::SyntheticHeap, layout::ChunkLayout,
    };

    fn scenario(sizes: &[(u64, bool)]) -> WalkReport {
        let mut heap = SyntheticHeap::new(Address::new(0x1000), 4);
        for &(size, in_use) in sizes {
            heap = heap.chunk(size, in_use);
        }
        let image = heap.build();
        HeapWalker::new(&image, ChunkLayout::newlib(4), HeapGeometry::default())
            .walk(heap.region())
            .unwrap()
    }

    #[test]
    fn renders_the_three_chunk_scenario() {
        let report = scenario(&[(16, true), (32, false), (24, true)]);
        let mut out = Vec::new();
        write_report(&mut out, &report, Style::default()).unwrap();
        let expected = "\
+---------------+-----------------+--------------------+
| Block Address | User Data Start | Total Size (bytes) |
+---------------+-----------------+--------------------+
| 0x1000        | 0x1008          |                 16 |
| 0x1010        | FREE            |                 32 |
| 0x1030        | 0x1038          |                 24 |
+---------------+-----------------+--------------------+
3 blocks: 32/72 bytes free
";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn color_keeps_the_cell_text() {
        let report = scenario(&[(16, false), (16, true)]);
        let colored = render_table(&report, Style { color: true });
        assert!(colored.contains("\u{1b}["));
        assert!(colored.contains("FREE"));
        assert!(colored.contains("Block Address"));
    }

    #[test]
    fn stats_use_thousands_separators() {
        let report = scenario(&[(4096, true), (8192, false), (16, false), (2048, true)]);
        let mut out = Vec::new();
        write_stats(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "\
4 blocks: 8208/14352 bytes free
in use: 6,144 bytes in 2 chunks
free: 8,208 bytes in 2 chunks, largest 8,192 bytes at 0x2000
fragmentation: 57.19%
"
        );
    }

    #[test]
    fn partial_output_is_flagged() {
        let report = scenario(&[(16, true)]);
        let mut out = Vec::new();
        write_partial(&mut out, &report, Style::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("walk did not finish"));
        assert!(text.ends_with("1 blocks: 0/16 bytes free\n"));
    }
}
