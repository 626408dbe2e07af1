//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mailroster.
//
// Mailroster is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public  License as published by the Free
// Software Foundation, either version  3 of the License, or (at  your option)
// any later version.
//
// Mailroster is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License
// for more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailroster. If not, see <http://www.gnu.org/licenses/>.


/// A plain-text table with left-aligned columns.
#[derive(Debug)]
pub(super) struct Table {
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(super) fn new(header: Vec<&'static str>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(self.header.len(), row.len());
        self.rows.push(row);
    }

    /// Render the header, a rule under it, then one line per row.
    pub(super) fn render(&self) -> String {
        let mut widths = self
            .header
            .iter()
            .map(|h| h.chars().count())
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header: Vec<String> =
            self.header.iter().map(|h| (*h).to_owned()).collect();
        render_line(&mut out, &widths, &header);
        let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        render_line(&mut out, &widths, &rule);
        for row in &self.rows {
            render_line(&mut out, &widths, row);
        }
        out
    }
}

fn render_line(out: &mut String, widths: &[usize], cells: &[String]) {
    let start = out.len();
    for (ix, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if ix > 0 {
            out.push_str("  ");
        }
        out.push_str(cell);
        for _ in cell.chars().count()..width {
            out.push(' ');
        }
    }

    let trimmed = out[start..].trim_end().len();
    out.truncate(start + trimmed);
    out.push('\n');
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn columns_are_aligned() {
        let mut table = Table::new(vec!["Name", "Active", "Note"]);
        table.push(vec!["example.com".to_owned(), "yes".to_owned(), String::new()]);
        table.push(vec!["bücher.de".to_owned(), "no".to_owned(), "x".to_owned()]);

        assert_eq!(
            "Name         Active  Note\n\
             -----------  ------  ----\n\
             example.com  yes\n\
             bücher.de    no      x\n",
            table.render()
        );
    }

    #[test]
    fn empty_table_has_header() {
        let table = Table::new(vec!["A", "Bee"]);
        assert_eq!("A  Bee\n-  ---\n", table.render());
    }
}
