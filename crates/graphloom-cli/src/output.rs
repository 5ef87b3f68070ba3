//! Table rendering for reports

use comfy_table::{presets::UTF8_FULL, Table};
use graphloom_core::{LoadReport, SchemaRegistry, SkipLog};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn status(blocked: bool) -> &'static str {
    if blocked {
        "blocked"
    } else {
        "loaded"
    }
}

/// Per-type counts of a finished load
pub fn load_report_tables(report: &LoadReport) -> Vec<Table> {
    let mut nodes = table(vec!["Node type", "Status", "Read", "Created", "Updated", "Skipped"]);
    for node in &report.nodes {
        nodes.add_row(vec![
            node.label.clone(),
            status(node.blocked).to_string(),
            node.records_read.to_string(),
            node.created.to_string(),
            node.updated.to_string(),
            node.skipped.count.to_string(),
        ]);
    }

    let mut relationships = table(vec![
        "Relationship",
        "Status",
        "Read",
        "Created",
        "Existing",
        "Unresolved",
        "Skipped",
    ]);
    for rel in &report.relationships {
        relationships.add_row(vec![
            rel.rel_type.clone(),
            status(rel.blocked).to_string(),
            rel.records_read.to_string(),
            rel.created.to_string(),
            rel.existing.to_string(),
            rel.unresolved.to_string(),
            rel.skipped.count.to_string(),
        ]);
    }

    let mut tables = vec![nodes, relationships];

    let conflicts: Vec<_> = report.conflicts().collect();
    if !conflicts.is_empty() {
        let mut table = table(vec!["Constraint", "Conflict"]);
        for constraint in conflicts {
            table.add_row(vec![
                format!("{}.{}", constraint.label, constraint.property),
                constraint.conflict.clone().unwrap_or_default(),
            ]);
        }
        tables.push(table);
    }

    let skipped = report
        .nodes
        .iter()
        .map(|n| (n.label.as_str(), &n.skipped))
        .chain(report.relationships.iter().map(|r| (r.rel_type.as_str(), &r.skipped)))
        .filter(|(_, log)| !log.is_empty())
        .collect::<Vec<(&str, &SkipLog)>>();
    if !skipped.is_empty() {
        let mut table = table(vec!["Type", "Line", "Reason"]);
        for (owner, log) in skipped {
            for sample in &log.samples {
                table.add_row(vec![owner.to_string(), sample.line.to_string(), sample.reason.clone()]);
            }
            let hidden = log.count.saturating_sub(log.samples.len() as u64);
            if hidden > 0 {
                table.add_row(vec![owner.to_string(), String::new(), format!("... and {} more", hidden)]);
            }
        }
        tables.push(table);
    }

    tables
}

/// Node and relationship declarations
pub fn schema_tables(registry: &SchemaRegistry) -> Vec<Table> {
    let mut nodes = table(vec!["Node type", "Source", "Identity", "Properties"]);
    for node_type in registry.node_types() {
        let identity = node_type.identity();
        let properties = node_type
            .properties()
            .iter()
            .map(|p| format!("{} <- {} ({})", p.target, p.source_field, p.coercion))
            .collect::<Vec<_>>()
            .join("\n");
        nodes.add_row(vec![
            node_type.label().to_string(),
            node_type.source().to_string(),
            format!("{} <- {} ({})", identity.target, identity.source_field, identity.coercion),
            properties,
        ]);
    }

    let mut relationships = table(vec!["Relationship", "Source", "From", "To"]);
    for rel in registry.relationship_types() {
        relationships.add_row(vec![
            rel.name().to_string(),
            rel.source().to_string(),
            format!("{}[{}]", rel.from().label, rel.from().join_field),
            format!("{}[{}]", rel.to().label, rel.to().join_field),
        ]);
    }

    vec![nodes, relationships]
}

/// Counts per type, as gathered by the stats command
pub fn stats_table(kind: &str, counts: &[(String, u64)]) -> Table {
    let mut table = table(vec![kind, "Count"]);
    for (name, count) in counts {
        table.add_row(vec![name.clone(), count.to_string()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphloom_core::{NodeLoadReport, RelationshipLoadReport};

    #[test]
    fn test_skip_samples_listed_with_overflow() {
        let mut orders = NodeLoadReport::new("Order");
        for line in 2..15 {
            orders.skipped.record(line, "bad date");
        }
        let report = LoadReport {
            attempts: 1,
            constraints: Vec::new(),
            nodes: vec![orders],
            relationships: vec![RelationshipLoadReport::blocked("WRITES")],
        };

        let tables = load_report_tables(&report);
        assert_eq!(tables.len(), 3);

        let rendered = tables[2].to_string();
        assert!(rendered.contains("bad date"));
        assert!(rendered.contains("and 3 more"));
        assert!(tables[1].to_string().contains("blocked"));
    }

    #[test]
    fn test_schema_tables_list_catalog() {
        let registry = SchemaRegistry::northwind().unwrap();
        let tables = schema_tables(&registry);
        let nodes = tables[0].to_string();
        assert!(nodes.contains("Customer"));
        assert!(nodes.contains("order_date <- orderDate (date)"));
        assert!(tables[1].to_string().contains("Supplier[supplierID]"));
    }
}
