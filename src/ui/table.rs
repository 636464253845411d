use tabled::{settings::Style, Table, Tabled};

use crate::rules::RenameRule;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Extension")]
    extension: String,
    #[tabled(rename = "Current mimetype")]
    current: String,
    #[tabled(rename = "Canonical mimetype")]
    canonical: String,
}

#[derive(Default)]
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

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// The rename table; `*` marks a rule that accepts any non-canonical mimetype
pub fn rules_table(rules: &[RenameRule]) -> String {
    let rows: Vec<RuleRow> = rules
        .iter()
        .map(|rule| RuleRow {
            extension: format!(".{}", rule.extension),
            current: rule.precondition.to_string(),
            canonical: rule.canonical.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RULES;

    #[test]
    fn test_empty_builder() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_rules_table_lists_every_rule() {
        let table = rules_table(RULES);
        assert!(table.contains(".apk"));
        assert!(table.contains("application/font-sfnt"));
        assert!(table.contains("Canonical mimetype"));
    }
}
