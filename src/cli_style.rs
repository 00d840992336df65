use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use unicode_segmentation::UnicodeSegmentation;

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
    let good = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)));
    let bad = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(good)
        .valid(good)
        .invalid(bad)
        .error(bad)
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

/// Counts grapheme clusters so emoji take one column.
fn display_width(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Plain text table with `|`-separated, left aligned columns.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| display_width(h)).collect(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(display_width(cell));
            }
        }
        self.rows.push(row);
    }

    fn render_row(&self, cells: &[String]) -> String {
        cells
            .iter()
            .zip(&self.col_widths)
            .map(|(cell, width)| {
                let padding = width.saturating_sub(display_width(cell));
                format!("{}{}", cell, " ".repeat(padding))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn render(&self) -> String {
        let mut lines = vec![self.render_row(&self.headers)];
        lines.push(
            self.col_widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &self.rows {
            lines.push(self.render_row(row));
        }
        lines.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}
