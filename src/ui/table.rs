use tabled::{settings::Style, Table, Tabled};

use crate::record::FileRecord;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct FileRow {
    #[tabled(rename = "Member")]
    pub member: String,
    #[tabled(rename = "Modified")]
    pub modified: String,
    #[tabled(rename = "Comment")]
    pub comment: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// One row per stored dataset member
pub fn files_table(files: &[(String, FileRecord)]) -> String {
    if files.is_empty() {
        return String::new();
    }

    let rows: Vec<FileRow> = files
        .iter()
        .map(|(member, file)| FileRow {
            member: member.clone(),
            modified: file.modified_text(),
            comment: file.comment.clone(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
