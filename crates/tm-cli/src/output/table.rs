/// Render a simple aligned table for string rows, fitted to `max_width`.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>], max_width: Option<usize>) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    fit_widths(&mut widths, headers, max_width);

    let line = |cells: &mut dyn Iterator<Item = String>| {
        cells
            .zip(widths.iter())
            .map(|(cell, width)| {
                let text = truncate_text(&cell, *width);
                if looks_numeric(&text) {
                    format!("{text:>width$}")
                } else {
                    format!("{text:<width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_line = line(&mut headers.iter().map(|h| (*h).to_string()));
    let divider = "-".repeat(header_line.chars().count());
    let mut lines = vec![header_line, divider];
    for row in rows {
        let mut cells = (0..widths.len()).map(|i| row.get(i).cloned().unwrap_or_else(|| "-".to_string()));
        lines.push(line(&mut cells));
    }
    lines.join("\n")
}

fn fit_widths(widths: &mut [usize], headers: &[&str], max_width: Option<usize>) {
    let Some(max_width) = max_width else {
        return;
    };
    let separators = widths.len().saturating_sub(1) * 2;
    while widths.iter().sum::<usize>() + separators > max_width {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(idx, width)| **width > headers[*idx].len().max(6))
            .max_by_key(|(_, width)| **width)
            .map(|(idx, _)| idx);
        let Some(idx) = widest else {
            break;
        };
        widths[idx] -= 1;
    }
}

fn truncate_text(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 1 {
        return "…".to_string();
    }
    let mut out: String = value.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn looks_numeric(value: &str) -> bool {
    !value.is_empty() && value.parse::<f64>().is_ok()
}
